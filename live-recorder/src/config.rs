//! Application configuration loaded from a JSON file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "LIVE_RECORDER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn default_interval() -> u64 {
    30
}

fn default_output_path() -> PathBuf {
    PathBuf::from("./")
}

fn default_retry_interval() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_ffmpeg_path() -> String {
    std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string())
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_ffmpeg_timeout() -> u64 {
    10
}

fn default_quit_grace() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    30
}

fn default_platform_name() -> String {
    "Direct".to_string()
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between two status checks of a source.
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Root directory of recordings.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Seconds to wait between two recording attempts.
    #[serde(default = "default_retry_interval")]
    pub retry_interval: u64,

    #[serde(default)]
    pub feature: FeatureConfig,

    #[serde(default)]
    pub ffmpeg: FfmpegConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub log: LogConfig,

    /// Sources to watch.
    #[serde(default)]
    pub lives: Vec<LiveConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            output_path: default_output_path(),
            retry_interval: default_retry_interval(),
            feature: FeatureConfig::default(),
            ffmpeg: FfmpegConfig::default(),
            http: HttpConfig::default(),
            log: LogConfig::default(),
            lives: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Remux `.flv` streams in-process instead of handing them to ffmpeg.
    #[serde(default = "default_true")]
    pub use_native_flv_parser: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            use_native_flv_parser: true,
        }
    }
}

/// Settings of the ffmpeg pass-through parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfmpegConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub binary_path: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network timeout handed to ffmpeg, in seconds.
    #[serde(default = "default_ffmpeg_timeout")]
    pub timeout_secs: u64,

    /// How long ffmpeg may take to finalize after being asked to quit.
    #[serde(default = "default_quit_grace")]
    pub quit_grace_secs: u64,

    /// Extra arguments placed before `-i`.
    #[serde(default)]
    pub input_args: Vec<String>,

    /// Extra arguments placed before the output file.
    #[serde(default)]
    pub output_args: Vec<String>,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary_path: default_ffmpeg_path(),
            user_agent: default_user_agent(),
            timeout_secs: default_ffmpeg_timeout(),
            quit_grace_secs: default_quit_grace(),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }
}

impl FfmpegConfig {
    pub fn quit_grace(&self) -> Duration {
        Duration::from_secs(self.quit_grace_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Maximum idle time between two reads of a response body.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive; `RUST_LOG` takes precedence.
    #[serde(default)]
    pub filter: Option<String>,

    /// Directory for daily-rolling log files. Console only when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// A source defined by a direct stream URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    pub url: String,

    #[serde(default = "default_platform_name")]
    pub platform_name: String,

    /// Defaults to the URL host.
    #[serde(default)]
    pub host_name: Option<String>,
}

impl Config {
    /// Loads the file named by `LIVE_RECORDER_CONFIG`, or `config.json`.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::from_file(Path::new(&path))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(Error::config("interval must be greater than zero"));
        }
        for live in &self.lives {
            Url::parse(&live.url)
                .map_err(|e| Error::config(format!("invalid live url {:?}: {}", live.url, e)))?;
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = Config::from_json("{}").unwrap();

        assert_eq!(config.interval(), Duration::from_secs(30));
        assert_eq!(config.retry_interval(), Duration::from_secs(5));
        assert_eq!(config.output_path, PathBuf::from("./"));
        assert!(config.feature.use_native_flv_parser);
        assert_eq!(config.ffmpeg.timeout_secs, 10);
        assert!(config.log.dir.is_none());
        assert!(config.lives.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_json(
            r#"{
                "interval": 15,
                "output_path": "/data/rec",
                "feature": { "use_native_flv_parser": false },
                "ffmpeg": { "binary_path": "/usr/bin/ffmpeg", "output_args": ["-movflags", "faststart"] },
                "lives": [
                    { "url": "http://example.com/live/room.flv", "host_name": "room" },
                    { "url": "http://example.com/other.m3u8", "platform_name": "Example" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.interval, 15);
        assert_eq!(config.output_path, PathBuf::from("/data/rec"));
        assert!(!config.feature.use_native_flv_parser);
        assert_eq!(config.ffmpeg.binary_path, "/usr/bin/ffmpeg");
        assert_eq!(config.ffmpeg.output_args, vec!["-movflags", "faststart"]);
        assert_eq!(config.lives[0].platform_name, "Direct");
        assert_eq!(config.lives[0].host_name.as_deref(), Some("room"));
        assert_eq!(config.lives[1].platform_name, "Example");
        assert!(config.lives[1].host_name.is_none());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = Config::from_json(r#"{ "interval": 0 }"#);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_bad_live_url_rejected() {
        let result = Config::from_json(r#"{ "lives": [ { "url": "not a url" } ] }"#);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_example_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.json");
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.lives.len(), 1);
        assert_eq!(config.log.dir, Some(PathBuf::from("./logs")));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let result = Config::from_file(Path::new("/nonexistent/config.json"));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = Config::from_json("{ interval: ");
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
