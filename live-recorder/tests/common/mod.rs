//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use live_recorder::config::{FfmpegConfig, HttpConfig};
use live_recorder::events::{EventDispatcher, EventType};
use live_recorder::live::{Live, LiveId, LiveInfo};
use live_recorder::recorder::RecorderOptions;
use live_recorder::utils::http_client::build_http_client;
use live_recorder::{Error, Result};
use parking_lot::Mutex;
use tokio::time::Instant;
use url::Url;

pub const ALL_EVENTS: [EventType; 6] = [
    EventType::ListenStart,
    EventType::ListenStop,
    EventType::LiveStart,
    EventType::LiveEnd,
    EventType::RecorderStart,
    EventType::RecorderStop,
];

/// A source whose status follows a script and whose stream URLs are fixed.
///
/// Once the script is exhausted the last status repeats.
pub struct ScriptedLive {
    id: LiveId,
    host_name: String,
    statuses: Mutex<VecDeque<bool>>,
    current: Mutex<bool>,
    urls: Mutex<Vec<Url>>,
    fail_urls: Mutex<bool>,
    info_calls: AtomicUsize,
    url_calls: AtomicUsize,
    url_call_times: Mutex<Vec<Instant>>,
    last_start_time: Mutex<Option<DateTime<Local>>>,
}

impl ScriptedLive {
    pub fn new(id: &str) -> Arc<Self> {
        Self::with_statuses(id, &[])
    }

    pub fn with_statuses(id: &str, statuses: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            id: LiveId::from(id),
            host_name: format!("host-{id}"),
            statuses: Mutex::new(statuses.iter().copied().collect()),
            current: Mutex::new(false),
            urls: Mutex::new(Vec::new()),
            fail_urls: Mutex::new(false),
            info_calls: AtomicUsize::new(0),
            url_calls: AtomicUsize::new(0),
            url_call_times: Mutex::new(Vec::new()),
            last_start_time: Mutex::new(None),
        })
    }

    pub fn set_urls(&self, urls: Vec<Url>) {
        *self.urls.lock() = urls;
    }

    pub fn fail_stream_urls(&self, fail: bool) {
        *self.fail_urls.lock() = fail;
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn url_calls(&self) -> usize {
        self.url_calls.load(Ordering::SeqCst)
    }

    /// When each stream URL lookup, i.e. each recording attempt, began.
    pub fn url_call_times(&self) -> Vec<Instant> {
        self.url_call_times.lock().clone()
    }
}

#[async_trait]
impl Live for ScriptedLive {
    fn live_id(&self) -> LiveId {
        self.id.clone()
    }

    fn platform_name(&self) -> &str {
        "Scripted"
    }

    async fn get_info(&self) -> Result<LiveInfo> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        let mut current = self.current.lock();
        if let Some(next) = self.statuses.lock().pop_front() {
            *current = next;
        }
        Ok(LiveInfo {
            host_name: self.host_name.clone(),
            room_name: "room".to_string(),
            status: *current,
        })
    }

    fn cached_info(&self) -> LiveInfo {
        LiveInfo {
            host_name: self.host_name.clone(),
            room_name: "room".to_string(),
            status: *self.current.lock(),
        }
    }

    async fn get_stream_urls(&self) -> Result<Vec<Url>> {
        self.url_calls.fetch_add(1, Ordering::SeqCst);
        self.url_call_times.lock().push(Instant::now());
        if *self.fail_urls.lock() {
            return Err(Error::Live("scripted failure".to_string()));
        }
        Ok(self.urls.lock().clone())
    }

    fn set_last_start_time(&self, at: DateTime<Local>) {
        *self.last_start_time.lock() = Some(at);
    }

    fn last_start_time(&self) -> Option<DateTime<Local>> {
        *self.last_start_time.lock()
    }
}

/// Records every dispatched event.
pub fn record_events(dispatcher: &EventDispatcher) -> Arc<Mutex<Vec<(EventType, LiveId)>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for event_type in ALL_EVENTS {
        let seen = seen.clone();
        dispatcher.add_event_listener(event_type, move |event| {
            seen.lock().push((event.event_type, event.live.live_id()));
        });
    }
    seen
}

pub fn count_of(events: &[(EventType, LiveId)], event_type: EventType) -> usize {
    events.iter().filter(|(t, _)| *t == event_type).count()
}

pub fn options(output_path: &Path, retry_interval: Duration) -> RecorderOptions {
    RecorderOptions {
        output_path: output_path.to_path_buf(),
        retry_interval,
        use_native_flv_parser: true,
        ffmpeg: FfmpegConfig::default(),
        client: build_http_client(&HttpConfig::default()).expect("http client"),
    }
}
