use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::{ParseOutcome, StreamParser};
use crate::config::FfmpegConfig;
use crate::{Error, Result};

/// Records a stream by running `ffmpeg -c copy` into an mp4 file.
pub struct FfmpegParser {
    config: FfmpegConfig,
    cancellation_token: CancellationToken,
}

impl FfmpegParser {
    pub fn new(config: FfmpegConfig, cancellation_token: CancellationToken) -> Self {
        Self {
            config,
            cancellation_token,
        }
    }

    fn build_args(&self, url: &Url, file: &Path) -> Vec<String> {
        let mut args: Vec<String> = ["-loglevel", "warning", "-y", "-re"]
            .into_iter()
            .map(String::from)
            .collect();

        args.extend(self.config.input_args.iter().cloned());

        if !self.config.user_agent.is_empty() {
            args.extend(["-user_agent".to_string(), self.config.user_agent.clone()]);
        }
        if self.config.timeout_secs > 0 {
            // microseconds
            let timeout = self.config.timeout_secs.saturating_mul(1_000_000);
            args.extend(["-timeout".to_string(), timeout.to_string()]);
        }

        args.extend(["-i".to_string(), url.to_string()]);
        args.extend(
            ["-c", "copy", "-bsf:a", "aac_adtstoasc", "-f", "mp4"]
                .into_iter()
                .map(String::from),
        );
        args.extend(self.config.output_args.iter().cloned());
        args.push(file.to_string_lossy().to_string());
        args
    }
}

#[async_trait]
impl StreamParser for FfmpegParser {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn parse_live_stream(&self, url: &Url, file: &Path) -> Result<ParseOutcome> {
        if self.cancellation_token.is_cancelled() {
            return Ok(ParseOutcome::Stopped);
        }

        let args = self.build_args(url, file);
        debug!(binary = %self.config.binary_path, ?args, "Starting ffmpeg");

        let mut child = process_utils::tokio_command(&self.config.binary_path)
            .args(&args)
            .env("LC_ALL", "C") // Force consistent output
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Process(format!("Failed to spawn ffmpeg: {}", e)))?;

        if let Some(stderr) = child.stderr.take() {
            let file = file.display().to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.contains("Error") || line.contains("error") {
                        warn!(file = %file, "ffmpeg: {}", line);
                    } else {
                        debug!(file = %file, "ffmpeg: {}", line);
                    }
                }
            });
        }

        let (code, stopped) = tokio::select! {
            status = child.wait() => (status?.code(), false),
            _ = self.cancellation_token.cancelled() => {
                debug!(file = %file.display(), "Asking ffmpeg to quit");
                let code = process_utils::quit_gracefully(&mut child, self.config.quit_grace()).await?;
                (code, true)
            }
        };

        match code {
            Some(0) if stopped => Ok(ParseOutcome::Stopped),
            Some(0) => {
                info!(file = %file.display(), "ffmpeg finished");
                Ok(ParseOutcome::Finished)
            }
            Some(code) => Err(Error::Process(format!("ffmpeg exited with code {}", code))),
            None => Err(Error::Process("ffmpeg terminated by signal".to_string())),
        }
    }

    fn stop(&self) {
        self.cancellation_token.cancel();
    }
}
