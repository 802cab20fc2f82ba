//! Live sources.
//!
//! A [`Live`] resolves one broadcast into its on-air status and stream URLs.
//! Platform clients implement it; [`DirectLive`] covers a plain stream URL.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tracing::debug;
use url::Url;

use crate::Result;
use crate::config::LiveConfig;

/// Opaque identity of a source; key of both registries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LiveId(String);

impl LiveId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LiveId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LiveId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Snapshot of a source's status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveInfo {
    pub host_name: String,
    pub room_name: String,
    /// Whether the source is on air.
    pub status: bool,
}

/// A live-broadcast source.
///
/// Errors returned by the async methods are transient: callers log them and
/// try again later.
#[async_trait]
pub trait Live: Send + Sync {
    fn live_id(&self) -> LiveId;

    fn platform_name(&self) -> &str;

    /// Queries the remote for the current status and refreshes the cache.
    async fn get_info(&self) -> Result<LiveInfo>;

    /// Last value returned by [`Live::get_info`].
    fn cached_info(&self) -> LiveInfo;

    /// Resolves the playable stream URLs, best first.
    async fn get_stream_urls(&self) -> Result<Vec<Url>>;

    fn set_last_start_time(&self, at: DateTime<Local>);

    fn last_start_time(&self) -> Option<DateTime<Local>>;

    /// Human readable context for log lines.
    fn info_fields(&self) -> String {
        let info = self.cached_info();
        format!(
            "platform={} host={} room={} id={}",
            self.platform_name(),
            info.host_name,
            info.room_name,
            self.live_id()
        )
    }
}

/// A source defined by a direct stream URL.
///
/// The source is on air while the URL answers a GET with a success status.
pub struct DirectLive {
    id: LiveId,
    url: Url,
    platform_name: String,
    client: reqwest::Client,
    info: Mutex<LiveInfo>,
    last_start_time: Mutex<Option<DateTime<Local>>>,
}

impl DirectLive {
    pub fn new(
        url: Url,
        platform_name: impl Into<String>,
        host_name: Option<String>,
        client: reqwest::Client,
    ) -> Self {
        let host_name = host_name
            .or_else(|| url.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        let room_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .unwrap_or_default()
            .to_string();

        Self {
            id: LiveId::new(url.as_str()),
            url,
            platform_name: platform_name.into(),
            client,
            info: Mutex::new(LiveInfo {
                host_name,
                room_name,
                status: false,
            }),
            last_start_time: Mutex::new(None),
        }
    }

    pub fn from_config(config: &LiveConfig, client: reqwest::Client) -> Result<Arc<Self>> {
        let url = Url::parse(&config.url)?;
        Ok(Arc::new(Self::new(
            url,
            config.platform_name.clone(),
            config.host_name.clone(),
            client,
        )))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Probes the URL. A refused connection counts as offline; other
    /// transport errors are reported.
    async fn probe(&self) -> Result<bool> {
        match self.client.get(self.url.clone()).send().await {
            // The body of a live stream never ends; dropping the response
            // closes the connection without reading it.
            Ok(response) => Ok(response.status().is_success()),
            Err(e) if e.is_connect() => {
                debug!(url = %self.url, error = %e, "Stream endpoint refused connection");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Live for DirectLive {
    fn live_id(&self) -> LiveId {
        self.id.clone()
    }

    fn platform_name(&self) -> &str {
        &self.platform_name
    }

    async fn get_info(&self) -> Result<LiveInfo> {
        let status = self.probe().await?;
        let mut info = self.info.lock();
        info.status = status;
        Ok(info.clone())
    }

    fn cached_info(&self) -> LiveInfo {
        self.info.lock().clone()
    }

    async fn get_stream_urls(&self) -> Result<Vec<Url>> {
        Ok(vec![self.url.clone()])
    }

    fn set_last_start_time(&self, at: DateTime<Local>) {
        *self.last_start_time.lock() = Some(at);
    }

    fn last_start_time(&self) -> Option<DateTime<Local>> {
        *self.last_start_time.lock()
    }
}

impl fmt::Debug for DirectLive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectLive")
            .field("id", &self.id)
            .field("platform_name", &self.platform_name)
            .field("info", &*self.info.lock())
            .finish()
    }
}
