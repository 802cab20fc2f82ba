//! Tag-by-tag FLV remuxer.
//!
//! Reads a live FLV byte stream and forwards it to a writer without decoding
//! any payload. Every byte read is either written out as part of a complete
//! tag or rejected together with the attempt; the output therefore always ends
//! on a tag boundary and stays playable.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{FlvError, Result};
use crate::framing::{
    self, FLV_HEADER_SIZE, HEADER_BLOCK_SIZE, PREV_TAG_SIZE_FIELD_SIZE, TAG_HEADER_SIZE,
};
use crate::header::FlvHeader;
use crate::tag::{self, FlvTagType};

const INITIAL_TAG_BUFFER: usize = 64 * 1024;

/// How a remux run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemuxOutcome {
    /// The input ended cleanly on a tag boundary.
    Finished,
    /// The cancellation token was observed between tags.
    Stopped,
}

/// Facts gathered while forwarding a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlvMetadata {
    pub has_audio: bool,
    pub has_video: bool,
    pub audio_tags: u64,
    pub video_tags: u64,
    pub script_tags: u64,
    pub audio_sequence_headers: u32,
    pub video_sequence_headers: u32,
    pub bytes_written: u64,
}

impl FlvMetadata {
    pub fn tag_count(&self) -> u64 {
        self.audio_tags + self.video_tags + self.script_tags
    }
}

enum TagStep {
    Copied,
    EndOfStream,
    Stopped,
}

/// Forwards an FLV stream from `reader` to `writer`, one complete tag at a time.
pub struct FlvRemuxer<R, W> {
    reader: R,
    writer: W,
    metadata: FlvMetadata,
    tag_buffer: BytesMut,
}

impl<R, W> FlvRemuxer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            metadata: FlvMetadata::default(),
            tag_buffer: BytesMut::with_capacity(INITIAL_TAG_BUFFER),
        }
    }

    pub fn metadata(&self) -> &FlvMetadata {
        &self.metadata
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Runs until the input ends, the token is cancelled, or the stream is
    /// found to be malformed. The writer is flushed in every case.
    pub async fn run(&mut self, token: &CancellationToken) -> Result<RemuxOutcome> {
        let result = self.remux(token).await;
        let flushed = self.writer.flush().await;

        let outcome = result?;
        flushed?;
        debug!(
            outcome = ?outcome,
            tags = self.metadata.tag_count(),
            bytes = self.metadata.bytes_written,
            "FLV remux ended"
        );
        Ok(outcome)
    }

    async fn remux(&mut self, token: &CancellationToken) -> Result<RemuxOutcome> {
        if !self.copy_header(token).await? {
            return Ok(RemuxOutcome::Stopped);
        }

        loop {
            if token.is_cancelled() {
                return Ok(RemuxOutcome::Stopped);
            }

            match self.copy_tag(token).await? {
                TagStep::Copied => {}
                TagStep::EndOfStream => return Ok(RemuxOutcome::Finished),
                TagStep::Stopped => return Ok(RemuxOutcome::Stopped),
            }
        }
    }

    /// Validates the header and forwards it together with `PreviousTagSize0`.
    /// Returns `false` if stopped while waiting for the header.
    async fn copy_header(&mut self, token: &CancellationToken) -> Result<bool> {
        let mut block = [0u8; HEADER_BLOCK_SIZE];

        let filled = tokio::select! {
            biased;
            filled = read_full(&mut self.reader, &mut block) => filled?,
            _ = token.cancelled() => return Ok(false),
        };
        if filled < HEADER_BLOCK_SIZE {
            return Err(unexpected_eof("flv header"));
        }

        let mut signature = [0u8; FLV_HEADER_SIZE];
        signature.copy_from_slice(&block[..FLV_HEADER_SIZE]);
        let header = FlvHeader::parse(&signature)?;
        debug!(%header, "FLV header accepted");

        self.metadata.has_audio = header.has_audio;
        self.metadata.has_video = header.has_video;

        self.writer.write_all(&block).await?;
        self.metadata.bytes_written += HEADER_BLOCK_SIZE as u64;
        Ok(true)
    }

    async fn copy_tag(&mut self, token: &CancellationToken) -> Result<TagStep> {
        let mut header_bytes = [0u8; TAG_HEADER_SIZE];

        // Waiting for the next tag to begin is a safe point to stop: nothing
        // of this tag has been written yet.
        let filled = tokio::select! {
            biased;
            filled = read_full(&mut self.reader, &mut header_bytes) => filled?,
            _ = token.cancelled() => return Ok(TagStep::Stopped),
        };
        match filled {
            0 => return Ok(TagStep::EndOfStream),
            TAG_HEADER_SIZE => {}
            _ => return Err(unexpected_eof("tag header")),
        }

        let header = framing::parse_tag_header_bytes(header_bytes);
        if let FlvTagType::Unknown(tag_type) = header.tag_type {
            return Err(FlvError::UnknownTag(tag_type));
        }

        let data_size = header.data_size as usize;
        let total = TAG_HEADER_SIZE + data_size + PREV_TAG_SIZE_FIELD_SIZE;
        self.tag_buffer.clear();
        self.tag_buffer.resize(total, 0);
        self.tag_buffer[..TAG_HEADER_SIZE].copy_from_slice(&header_bytes);
        self.reader
            .read_exact(&mut self.tag_buffer[TAG_HEADER_SIZE..])
            .await?;

        let payload = &self.tag_buffer[TAG_HEADER_SIZE..TAG_HEADER_SIZE + data_size];
        match header.tag_type {
            FlvTagType::Audio => {
                self.metadata.audio_tags += 1;
                if !header.is_filtered && tag::is_audio_sequence_header(payload) {
                    self.metadata.audio_sequence_headers += 1;
                    debug!(timestamp = header.timestamp_ms, "Audio sequence header");
                }
            }
            FlvTagType::Video => {
                self.metadata.video_tags += 1;
                if !header.is_filtered && tag::is_video_sequence_header(payload) {
                    self.metadata.video_sequence_headers += 1;
                    debug!(timestamp = header.timestamp_ms, "Video sequence header");
                }
            }
            FlvTagType::ScriptData => self.metadata.script_tags += 1,
            FlvTagType::Unknown(_) => {}
        }

        let mut trailing = [0u8; PREV_TAG_SIZE_FIELD_SIZE];
        trailing.copy_from_slice(&self.tag_buffer[total - PREV_TAG_SIZE_FIELD_SIZE..]);
        let trailing = framing::parse_prev_tag_size(trailing);
        if trailing != header.tag_size() {
            debug!(
                expected = header.tag_size(),
                got = trailing,
                tag_type = %header.tag_type,
                "PreviousTagSize mismatch"
            );
        }

        self.writer.write_all(&self.tag_buffer).await?;
        self.metadata.bytes_written += total as u64;
        trace!(
            tag_type = %header.tag_type,
            size = header.data_size,
            timestamp = header.timestamp_ms,
            "Tag forwarded"
        );
        Ok(TagStep::Copied)
    }
}

/// Reads until `buf` is full or the input ends; returns the number of bytes read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn unexpected_eof(what: &str) -> FlvError {
    FlvError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("stream ended inside {what}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode_header_block, encode_tag};

    fn sample_stream() -> Vec<u8> {
        let mut stream = encode_header_block(&FlvHeader::new(true, true)).to_vec();
        stream.extend(encode_tag(FlvTagType::ScriptData, 0, &[0x02, 0x00, 0x0A]).unwrap());
        stream.extend(encode_tag(FlvTagType::Video, 0, &[0x17, 0x00, 0x00, 0x00, 0x00]).unwrap());
        stream.extend(encode_tag(FlvTagType::Audio, 23, &[0xAF, 0x00, 0x12, 0x10]).unwrap());
        stream
    }

    async fn remux_bytes(input: &[u8], token: &CancellationToken) -> (Result<RemuxOutcome>, Vec<u8>, FlvMetadata) {
        let mut remuxer = FlvRemuxer::new(input, Vec::new());
        let result = remuxer.run(token).await;
        let metadata = remuxer.metadata().clone();
        let (_, output) = remuxer.into_inner();
        (result, output, metadata)
    }

    #[tokio::test]
    async fn test_remux_is_byte_identical() {
        let input = sample_stream();
        let (result, output, metadata) = remux_bytes(&input, &CancellationToken::new()).await;

        assert_eq!(result.unwrap(), RemuxOutcome::Finished);
        assert_eq!(output, input);
        assert!(metadata.has_audio);
        assert!(metadata.has_video);
        assert_eq!(metadata.script_tags, 1);
        assert_eq!(metadata.video_tags, 1);
        assert_eq!(metadata.audio_tags, 1);
        assert_eq!(metadata.video_sequence_headers, 1);
        assert_eq!(metadata.audio_sequence_headers, 1);
        assert_eq!(metadata.bytes_written, input.len() as u64);
    }

    #[tokio::test]
    async fn test_altered_magic_is_not_supported() {
        let mut input = sample_stream();
        input[0] = b'X';
        let (result, output, _) = remux_bytes(&input, &CancellationToken::new()).await;

        assert!(matches!(result, Err(FlvError::NotSupportedStream(_))));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tag_fails_attempt() {
        let mut input = sample_stream();
        input.extend(encode_tag(FlvTagType::Unknown(15), 40, &[1, 2, 3]).unwrap());
        let (result, output, _) = remux_bytes(&input, &CancellationToken::new()).await;

        assert!(matches!(result, Err(FlvError::UnknownTag(15))));
        // everything before the bad tag was forwarded
        assert_eq!(output, sample_stream());
    }

    #[tokio::test]
    async fn test_stop_before_first_tag_writes_only_header() {
        let input = sample_stream();
        let token = CancellationToken::new();
        token.cancel();
        let (result, output, metadata) = remux_bytes(&input, &token).await;

        assert_eq!(result.unwrap(), RemuxOutcome::Stopped);
        assert_eq!(output, &input[..HEADER_BLOCK_SIZE]);
        assert_eq!(metadata.tag_count(), 0);
    }

    #[tokio::test]
    async fn test_truncated_tag_is_unexpected_eof() {
        let input = sample_stream();
        let truncated = &input[..input.len() - 2];
        let (result, output, _) = remux_bytes(truncated, &CancellationToken::new()).await;

        assert!(result.is_err_and(|e| e.is_unexpected_eof()));
        // the partial audio tag is never written
        assert_eq!(output.len(), input.len() - 4 - 11 - 4);
    }

    #[tokio::test]
    async fn test_truncated_header_is_unexpected_eof() {
        let input = sample_stream();
        let (result, output, _) = remux_bytes(&input[..5], &CancellationToken::new()).await;

        assert!(result.is_err_and(|e| e.is_unexpected_eof()));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_header_only_stream_finishes() {
        let input = encode_header_block(&FlvHeader::new(false, true));
        let (result, output, metadata) = remux_bytes(&input, &CancellationToken::new()).await;

        assert_eq!(result.unwrap(), RemuxOutcome::Finished);
        assert_eq!(output, input);
        assert!(!metadata.has_audio);
        assert!(metadata.has_video);
    }

    #[tokio::test]
    async fn test_trailing_size_mismatch_is_forwarded() {
        let mut input = sample_stream();
        let len = input.len();
        input[len - 1] ^= 0xFF;
        let (result, output, _) = remux_bytes(&input, &CancellationToken::new()).await;

        assert_eq!(result.unwrap(), RemuxOutcome::Finished);
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_stop_while_waiting_for_next_tag() {
        let (mut client, server) = tokio::io::duplex(1024);
        let token = CancellationToken::new();

        let header = encode_header_block(&FlvHeader::new(true, true));
        client.write_all(&header).await.unwrap();

        let stopper = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            stopper.cancel();
        });

        let mut remuxer = FlvRemuxer::new(server, Vec::new());
        let outcome = remuxer.run(&token).await.unwrap();
        assert_eq!(outcome, RemuxOutcome::Stopped);

        let (_, output) = remuxer.into_inner();
        assert_eq!(output, header);
        drop(client);
    }
}
