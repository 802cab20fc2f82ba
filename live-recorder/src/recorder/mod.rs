//! Recording.
//!
//! A [`Recorder`] exists while its source is on air. It resolves a stream
//! URL, picks a parser, records into a fresh file and retries after a pause
//! until it is closed. A failed attempt never ends the recorder.

pub mod manager;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Local;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use url::Url;

use crate::Result;
use crate::config::{Config, FfmpegConfig};
use crate::events::{EventDispatcher, EventType};
use crate::live::{Live, LiveId};
use crate::parser::{ParseOutcome, ParserKind, StreamParser};
use crate::utils::{filename, fs};

pub use manager::RecorderManager;

/// Settings shared by every recorder of a manager.
#[derive(Debug, Clone)]
pub struct RecorderOptions {
    pub output_path: PathBuf,
    pub retry_interval: Duration,
    pub use_native_flv_parser: bool,
    pub ffmpeg: FfmpegConfig,
    pub client: reqwest::Client,
}

impl RecorderOptions {
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        Self {
            output_path: config.output_path.clone(),
            retry_interval: config.retry_interval(),
            use_native_flv_parser: config.feature.use_native_flv_parser,
            ffmpeg: config.ffmpeg.clone(),
            client,
        }
    }
}

pub struct Recorder {
    live: Arc<dyn Live>,
    dispatcher: Arc<EventDispatcher>,
    options: Arc<RecorderOptions>,
    tracker: TaskTracker,
    cancellation_token: CancellationToken,
    /// Parser of the attempt in progress.
    parser: Mutex<Option<Arc<dyn StreamParser>>>,
    attempts: AtomicU64,
    started: AtomicBool,
    closed: AtomicBool,
}

impl Recorder {
    pub fn new(
        live: Arc<dyn Live>,
        dispatcher: Arc<EventDispatcher>,
        options: Arc<RecorderOptions>,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            live,
            dispatcher,
            options,
            tracker,
            cancellation_token: CancellationToken::new(),
            parser: Mutex::new(None),
            attempts: AtomicU64::new(0),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn live_id(&self) -> LiveId {
        self.live.live_id()
    }

    pub fn live(&self) -> &Arc<dyn Live> {
        &self.live
    }

    /// Number of attempts that reached the parser.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Starts the recording loop. Only the first call has an effect.
    pub fn start(self: &Arc<Self>) {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let recorder = self.clone();
        self.tracker.spawn(async move { recorder.run().await });

        info!(live = %self.live.info_fields(), "Recorder started");
        self.dispatcher
            .dispatch(EventType::RecorderStart, self.live.clone());
    }

    /// Stops the current attempt and the loop. Only the first call has an effect.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        self.cancellation_token.cancel();
        let parser = self.parser.lock().clone();
        if let Some(parser) = parser {
            parser.stop();
        }

        info!(live = %self.live.info_fields(), "Recorder closed");
        self.dispatcher
            .dispatch(EventType::RecorderStop, self.live.clone());
    }

    async fn run(&self) {
        while !self.cancellation_token.is_cancelled() {
            self.attempt().await;

            if !self.wait_retry().await {
                break;
            }
        }
        debug!(live_id = %self.live.live_id(), "Recorder task exited");
    }

    /// Waits the retry interval. Returns `false` if closed meanwhile.
    async fn wait_retry(&self) -> bool {
        tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => false,
            _ = tokio::time::sleep(self.options.retry_interval) => true,
        }
    }

    async fn attempt(&self) {
        let live_id = self.live.live_id();

        let url = match self.live.get_stream_urls().await {
            Ok(urls) => match urls.into_iter().next() {
                Some(url) => url,
                None => {
                    debug!(live_id = %live_id, "No stream url available");
                    return;
                }
            },
            Err(e) => {
                debug!(live_id = %live_id, error = %e, "Failed to resolve stream urls");
                return;
            }
        };

        let kind = ParserKind::select(&url, self.options.use_native_flv_parser);
        let file = match self.output_file(kind).await {
            Ok(file) => file,
            Err(e) => {
                warn!(live_id = %live_id, error = %e, "Failed to prepare output file");
                return;
            }
        };

        // a child token is cancelled at once if close already ran
        let parser = kind.create(
            &self.options.client,
            &self.options.ffmpeg,
            self.cancellation_token.child_token(),
        );
        *self.parser.lock() = Some(parser.clone());
        self.attempts.fetch_add(1, Ordering::SeqCst);

        info!(
            live_id = %live_id,
            parser = parser.name(),
            url = %url,
            file = %file.display(),
            "Recording"
        );
        self.record(parser.as_ref(), &url, &file).await;
        *self.parser.lock() = None;

        match fs::remove_if_empty(&file).await {
            Ok(true) => debug!(file = %file.display(), "Removed empty recording"),
            Ok(false) => {}
            Err(e) => warn!(file = %file.display(), error = %e, "Failed to clean up recording"),
        }
    }

    async fn record(&self, parser: &dyn StreamParser, url: &Url, file: &Path) {
        let live_id = self.live.live_id();
        match parser.parse_live_stream(url, file).await {
            Ok(ParseOutcome::Stopped) => {
                debug!(live_id = %live_id, file = %file.display(), "Recording stopped")
            }
            Ok(ParseOutcome::Finished) => {
                info!(live_id = %live_id, file = %file.display(), "Recording finished")
            }
            Err(e) => {
                warn!(live_id = %live_id, file = %file.display(), error = %e, "Recording failed")
            }
        }
    }

    /// `<root>/<platform>/<host>/<platform>_<host>_<YYYYMMDD_HHMM>[_n].<ext>`
    async fn output_file(&self, kind: ParserKind) -> Result<PathBuf> {
        let platform = self.live.platform_name();
        let host = self.live.cached_info().host_name;

        let dir = filename::recording_dir(&self.options.output_path, platform, &host);
        fs::ensure_dir_all(&dir).await?;

        let stem = filename::recording_stem(platform, &host, &Local::now());
        fs::next_free_path(&dir, &stem, kind.extension()).await
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("live_id", &self.live.live_id())
            .field("attempts", &self.attempts())
            .field("closed", &self.is_closed())
            .finish()
    }
}
