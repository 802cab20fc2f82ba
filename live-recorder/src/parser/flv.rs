use std::path::Path;

use async_trait::async_trait;
use ::flv::{FlvMetadata, FlvRemuxer, RemuxOutcome};
use futures::TryStreamExt;
use parking_lot::Mutex;
use tokio::io::BufWriter;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::{ParseOutcome, StreamParser};
use crate::Result;
use crate::utils::fs;

const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// Records an HTTP-FLV stream by forwarding it tag by tag.
pub struct FlvParser {
    client: reqwest::Client,
    cancellation_token: CancellationToken,
    metadata: Mutex<Option<FlvMetadata>>,
}

impl FlvParser {
    pub fn new(client: reqwest::Client, cancellation_token: CancellationToken) -> Self {
        Self {
            client,
            cancellation_token,
            metadata: Mutex::new(None),
        }
    }

    /// Metadata of the finished attempt.
    pub fn metadata(&self) -> Option<FlvMetadata> {
        self.metadata.lock().clone()
    }
}

#[async_trait]
impl StreamParser for FlvParser {
    fn name(&self) -> &'static str {
        "flv"
    }

    async fn parse_live_stream(&self, url: &Url, file: &Path) -> Result<ParseOutcome> {
        let response = tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => return Ok(ParseOutcome::Stopped),
            response = self.client.get(url.clone()).send() => response?,
        };
        let response = response.error_for_status()?;
        debug!(url = %url, status = %response.status(), "FLV stream opened");

        // the output file only exists once the remote answered
        let output = tokio::fs::File::create(file)
            .await
            .map_err(|e| fs::io_error("creating file", file, e))?;
        let writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, output);

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let reader = StreamReader::new(Box::pin(body));

        let mut remuxer = FlvRemuxer::new(reader, writer);
        let result = remuxer.run(&self.cancellation_token).await;

        let metadata = remuxer.metadata().clone();
        info!(
            file = %file.display(),
            bytes = metadata.bytes_written,
            video_tags = metadata.video_tags,
            audio_tags = metadata.audio_tags,
            "FLV attempt ended"
        );
        *self.metadata.lock() = Some(metadata);

        Ok(match result? {
            RemuxOutcome::Finished => ParseOutcome::Finished,
            RemuxOutcome::Stopped => ParseOutcome::Stopped,
        })
    }

    fn stop(&self) {
        self.cancellation_token.cancel();
    }
}
