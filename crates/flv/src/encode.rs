use std::io;

use crate::framing::{HEADER_BLOCK_SIZE, PREV_TAG_SIZE_FIELD_SIZE, TAG_HEADER_SIZE};
use crate::header::FlvHeader;
use crate::tag::FlvTagType;

const MAX_TAG_DATA_SIZE: usize = 0xFF_FFFF;

/// Encodes the signature block followed by `PreviousTagSize0`.
pub fn encode_header_block(header: &FlvHeader) -> [u8; HEADER_BLOCK_SIZE] {
    let mut out = [0u8; HEADER_BLOCK_SIZE];
    out[..9].copy_from_slice(&header.to_bytes());
    // PreviousTagSize0 is always zero
    out
}

pub fn encode_tag_header_bytes(
    tag_type: FlvTagType,
    data_size: usize,
    timestamp_ms: u32,
) -> io::Result<[u8; TAG_HEADER_SIZE]> {
    if data_size > MAX_TAG_DATA_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("FLV tag data size ({data_size}) exceeds 24-bit limit ({MAX_TAG_DATA_SIZE})"),
        ));
    }

    let mut out = [0u8; TAG_HEADER_SIZE];
    out[0] = u8::from(tag_type);
    out[1..4].copy_from_slice(&(data_size as u32).to_be_bytes()[1..]);

    // Timestamp: lower 24 bits + extended 8 bits.
    let ts = timestamp_ms.to_be_bytes();
    out[4..7].copy_from_slice(&ts[1..]);
    out[7] = ts[0];

    // StreamID stays zero
    Ok(out)
}

/// Encodes a complete tag: header, payload and trailing tag size.
pub fn encode_tag(tag_type: FlvTagType, timestamp_ms: u32, payload: &[u8]) -> io::Result<Vec<u8>> {
    let header = encode_tag_header_bytes(tag_type, payload.len(), timestamp_ms)?;
    let tag_size = (TAG_HEADER_SIZE + payload.len()) as u32;

    let mut out = Vec::with_capacity(TAG_HEADER_SIZE + payload.len() + PREV_TAG_SIZE_FIELD_SIZE);
    out.extend_from_slice(&header);
    out.extend_from_slice(payload);
    out.extend_from_slice(&tag_size.to_be_bytes());
    Ok(out)
}
