use std::{sync::OnceLock, time::Duration};

use tracing::debug;

use crate::Result;
use crate::config::HttpConfig;

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the `reqwest::Client` shared by status probes and the native FLV parser.
///
/// No total request timeout is set: a recording response lives as long as the
/// broadcast. A stalled remote is bounded by the read timeout instead.
pub fn build_http_client(config: &HttpConfig) -> Result<reqwest::Client> {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);

    if config.connect_timeout_secs > 0 {
        builder = builder.connect_timeout(Duration::from_secs(config.connect_timeout_secs));
    }
    if config.read_timeout_secs > 0 {
        builder = builder.read_timeout(Duration::from_secs(config.read_timeout_secs));
    }

    Ok(builder.build()?)
}
