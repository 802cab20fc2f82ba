use std::fmt::Display;
use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{FlvError, Result};
use crate::framing::FLV_HEADER_SIZE;

/// "FLV" as a big-endian 24-bit value.
pub const FLV_SIGNATURE: u32 = 0x464C56;
pub const FLV_VERSION: u8 = 0x01;

const FLAG_AUDIO: u8 = 0b0000_0001;
const FLAG_VIDEO: u8 = 0b0000_0100;

// Struct representing the FLV header, 9 bytes in total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlvHeader {
    pub signature: u32, // The signature of the FLV file, 3 bytes, always 'FLV'
    // The version of the FLV file format, 1 byte, always 0x01
    pub version: u8,
    // Whether the stream announces an audio track
    pub has_audio: bool,
    // Whether the stream announces a video track
    pub has_video: bool,
    // Total size of the header, 4 bytes, always 0x09
    pub data_offset: u32,
}

impl Display for FlvHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FLV v{} (audio: {}, video: {}, offset: {})",
            self.version, self.has_audio, self.has_video, self.data_offset
        )
    }
}

impl FlvHeader {
    /// Creates a new `FlvHeader` with the specified audio and video flags.
    pub fn new(has_audio: bool, has_video: bool) -> Self {
        FlvHeader {
            signature: FLV_SIGNATURE,
            version: FLV_VERSION,
            has_audio,
            has_video,
            data_offset: FLV_HEADER_SIZE as u32,
        }
    }

    /// Validates and decodes the 9-byte signature block of a live stream.
    ///
    /// Only the canonical layout is accepted: signature `FLV`, version 1 and a
    /// data offset of exactly 9. Anything else means the remote is not sending
    /// FLV (an error page, a different container) or the stream is corrupt, and
    /// is reported as [`FlvError::NotSupportedStream`].
    pub fn parse(bytes: &[u8; FLV_HEADER_SIZE]) -> Result<Self> {
        let mut reader = Cursor::new(&bytes[..]);

        let signature = reader.read_u24::<BigEndian>()?;
        if signature != FLV_SIGNATURE {
            return Err(FlvError::NotSupportedStream(format!(
                "invalid signature {:02X?}",
                &bytes[..3]
            )));
        }

        let version = reader.read_u8()?;
        if version != FLV_VERSION {
            return Err(FlvError::NotSupportedStream(format!(
                "unsupported version {version}"
            )));
        }

        let flags = reader.read_u8()?;
        let has_audio = flags & FLAG_AUDIO != 0;
        let has_video = flags & FLAG_VIDEO != 0;

        let data_offset = reader.read_u32::<BigEndian>()?;
        if data_offset != FLV_HEADER_SIZE as u32 {
            return Err(FlvError::NotSupportedStream(format!(
                "unexpected header size {data_offset}"
            )));
        }

        Ok(FlvHeader {
            signature,
            version,
            has_audio,
            has_video,
            data_offset,
        })
    }

    /// Encodes the header back into its 9-byte wire form.
    pub fn to_bytes(&self) -> [u8; FLV_HEADER_SIZE] {
        let mut out = [0u8; FLV_HEADER_SIZE];
        out[..3].copy_from_slice(&self.signature.to_be_bytes()[1..]);
        out[3] = self.version;

        let mut flags = 0u8;
        if self.has_audio {
            flags |= FLAG_AUDIO;
        }
        if self.has_video {
            flags |= FLAG_VIDEO;
        }
        out[4] = flags;
        out[5..9].copy_from_slice(&self.data_offset.to_be_bytes());
        out
    }
}
