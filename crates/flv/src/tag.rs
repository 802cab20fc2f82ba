use std::fmt;

/// Sound format id of AAC in the audio tag header.
const SOUND_FORMAT_AAC: u8 = 10;
/// Legacy video codec ids carrying an AVCPacketType byte.
const VIDEO_CODEC_AVC: u8 = 7;
const VIDEO_CODEC_LEGACY_HEVC: u8 = 12;
/// Enhanced RTMP `PacketTypeSequenceStart`.
const ENHANCED_SEQUENCE_START: u8 = 0;

/// FLV Tag Type
///
/// Defined by video_file_format_spec_v10.pdf (Chapter 1 - The FLV File Format - FLV tags).
///
/// The 3 types that are supported are:
/// - Audio(8)
/// - Video(9)
/// - ScriptData(18)
///
/// Anything else is carried as `Unknown` so callers can report the raw byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlvTagType {
    Audio = 8,
    Video = 9,
    ScriptData = 18,
    Unknown(u8),
}

impl From<u8> for FlvTagType {
    fn from(value: u8) -> Self {
        match value {
            8 => FlvTagType::Audio,
            9 => FlvTagType::Video,
            18 => FlvTagType::ScriptData,
            _ => FlvTagType::Unknown(value),
        }
    }
}

impl From<FlvTagType> for u8 {
    fn from(value: FlvTagType) -> Self {
        match value {
            FlvTagType::Audio => 8,
            FlvTagType::Video => 9,
            FlvTagType::ScriptData => 18,
            FlvTagType::Unknown(val) => val,
        }
    }
}

impl fmt::Display for FlvTagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlvTagType::Audio => write!(f, "Audio"),
            FlvTagType::Video => write!(f, "Video"),
            FlvTagType::ScriptData => write!(f, "Script"),
            FlvTagType::Unknown(value) => write!(f, "Unknown({value})"),
        }
    }
}

/// Determines if a video payload is a decoder configuration record.
///
/// Legacy AVC/HEVC tags carry the packet type in the second byte (0 = sequence
/// header). Enhanced tags set the high bit of the first byte and carry the
/// packet type in its low nibble.
pub fn is_video_sequence_header(payload: &[u8]) -> bool {
    let Some(&first_byte) = payload.first() else {
        return false;
    };

    let enhanced = (first_byte & 0b1000_0000) != 0;
    if enhanced {
        return first_byte & 0x0F == ENHANCED_SEQUENCE_START;
    }

    let codec_id = first_byte & 0x0F;
    if codec_id != VIDEO_CODEC_AVC && codec_id != VIDEO_CODEC_LEGACY_HEVC {
        return false;
    }
    payload.get(1) == Some(&0)
}

/// Determines if an audio payload is an AAC AudioSpecificConfig.
pub fn is_audio_sequence_header(payload: &[u8]) -> bool {
    if payload.len() < 2 {
        return false;
    }

    let sound_format = (payload[0] >> 4) & 0xF;
    sound_format == SOUND_FORMAT_AAC && payload[1] == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_type_from_byte() {
        assert_eq!(FlvTagType::from(8), FlvTagType::Audio);
        assert_eq!(FlvTagType::from(9), FlvTagType::Video);
        assert_eq!(FlvTagType::from(18), FlvTagType::ScriptData);
        assert_eq!(FlvTagType::from(7), FlvTagType::Unknown(7));
        assert_eq!(u8::from(FlvTagType::Unknown(31)), 31);
    }

    #[test]
    fn test_avc_sequence_header() {
        // keyframe + AVC, packet type 0
        assert!(is_video_sequence_header(&[0x17, 0x00, 0x00, 0x00, 0x00]));
        // keyframe + AVC, NALU
        assert!(!is_video_sequence_header(&[0x17, 0x01, 0x00, 0x00, 0x00]));
        // sorenson h263 has no packet type
        assert!(!is_video_sequence_header(&[0x12, 0x00]));
        assert!(!is_video_sequence_header(&[]));
    }

    #[test]
    fn test_enhanced_sequence_start() {
        assert!(is_video_sequence_header(&[0x90, b'h', b'v', b'c', b'1']));
        assert!(!is_video_sequence_header(&[0x91, b'h', b'v', b'c', b'1']));
    }

    #[test]
    fn test_aac_sequence_header() {
        assert!(is_audio_sequence_header(&[0xAF, 0x00, 0x12, 0x10]));
        assert!(!is_audio_sequence_header(&[0xAF, 0x01, 0x21]));
        // mp3
        assert!(!is_audio_sequence_header(&[0x2F, 0x00]));
        assert!(!is_audio_sequence_header(&[0xAF]));
    }
}
