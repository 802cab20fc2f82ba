use crate::tag::FlvTagType;

pub const FLV_HEADER_SIZE: usize = 9;
pub const PREV_TAG_SIZE_FIELD_SIZE: usize = 4;
pub const TAG_HEADER_SIZE: usize = 11;

/// Header block forwarded ahead of the first tag: the signature block plus
/// `PreviousTagSize0`.
pub const HEADER_BLOCK_SIZE: usize = FLV_HEADER_SIZE + PREV_TAG_SIZE_FIELD_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTagHeader {
    pub tag_type: FlvTagType,
    pub is_filtered: bool,
    pub data_size: u32,
    pub timestamp_ms: u32,
    pub stream_id: u32,
}

impl ParsedTagHeader {
    /// Tag header plus payload, the value a well-formed trailing size carries.
    pub fn tag_size(&self) -> u32 {
        TAG_HEADER_SIZE as u32 + self.data_size
    }
}

pub fn parse_prev_tag_size(bytes: [u8; PREV_TAG_SIZE_FIELD_SIZE]) -> u32 {
    u32::from_be_bytes(bytes)
}

pub fn parse_tag_header_bytes(bytes: [u8; TAG_HEADER_SIZE]) -> ParsedTagHeader {
    let tag_type = FlvTagType::from(bytes[0] & 0x1F);
    let is_filtered = (bytes[0] & 0x20) != 0;

    let data_size = u32::from_be_bytes([0, bytes[1], bytes[2], bytes[3]]);

    // lower 24 bits followed by the extended high byte
    let timestamp_ms = u32::from_be_bytes([bytes[7], bytes[4], bytes[5], bytes[6]]);

    let stream_id = u32::from_be_bytes([0, bytes[8], bytes[9], bytes[10]]);

    ParsedTagHeader {
        tag_type,
        is_filtered,
        data_size,
        timestamp_ms,
        stream_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_header() {
        let bytes = [0x09, 0x00, 0x01, 0x02, 0x12, 0x34, 0x56, 0x01, 0x00, 0x00, 0x00];
        let header = parse_tag_header_bytes(bytes);

        assert_eq!(header.tag_type, FlvTagType::Video);
        assert!(!header.is_filtered);
        assert_eq!(header.data_size, 0x0102);
        assert_eq!(header.timestamp_ms, 0x0112_3456);
        assert_eq!(header.stream_id, 0);
        assert_eq!(header.tag_size(), 11 + 0x0102);
    }

    #[test]
    fn test_filter_bit_is_not_part_of_type() {
        let bytes = [0x28, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0];
        let header = parse_tag_header_bytes(bytes);

        assert_eq!(header.tag_type, FlvTagType::Audio);
        assert!(header.is_filtered);
    }

    #[test]
    fn test_parse_prev_tag_size() {
        assert_eq!(parse_prev_tag_size([0, 0, 0x01, 0x0B]), 267);
    }
}
