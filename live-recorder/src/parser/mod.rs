//! Stream parsers.
//!
//! A parser consumes a live stream from a URL and writes a playable file.
//! Two variants exist: the in-process FLV remuxer and an ffmpeg subprocess.
//! One instance serves exactly one recording attempt.

pub mod ffmpeg;
pub mod flv;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::Result;
use crate::config::FfmpegConfig;

pub use self::ffmpeg::FfmpegParser;
pub use self::flv::FlvParser;

/// How an attempt ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The remote closed the stream.
    Finished,
    /// [`StreamParser::stop`] was called.
    Stopped,
}

#[async_trait]
pub trait StreamParser: Send + Sync {
    fn name(&self) -> &'static str;

    /// Records `url` into `file` until the stream ends or the parser is stopped.
    async fn parse_live_stream(&self, url: &Url, file: &Path) -> Result<ParseOutcome>;

    /// Requests a stop. Safe to call at any time, any number of times.
    fn stop(&self);
}

/// The closed set of parser variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserKind {
    NativeFlv,
    Ffmpeg,
}

impl ParserKind {
    /// Native remuxing for `.flv` URLs when enabled, ffmpeg otherwise.
    pub fn select(url: &Url, use_native_flv_parser: bool) -> Self {
        if use_native_flv_parser && url.path().contains(".flv") {
            Self::NativeFlv
        } else {
            Self::Ffmpeg
        }
    }

    /// Extension of the files this variant writes.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::NativeFlv => "flv",
            Self::Ffmpeg => "mp4",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NativeFlv => "flv",
            Self::Ffmpeg => "ffmpeg",
        }
    }

    /// Builds a fresh instance bound to `token`.
    pub fn create(
        &self,
        client: &reqwest::Client,
        ffmpeg: &FfmpegConfig,
        token: CancellationToken,
    ) -> Arc<dyn StreamParser> {
        match self {
            Self::NativeFlv => Arc::new(FlvParser::new(client.clone(), token)),
            Self::Ffmpeg => Arc::new(FfmpegParser::new(ffmpeg.clone(), token)),
        }
    }
}

impl std::fmt::Display for ParserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
