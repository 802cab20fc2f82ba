use std::sync::Arc;

use anyhow::Context;
use live_recorder::config::Config;
use live_recorder::events::EventDispatcher;
use live_recorder::listener::ListenerManager;
use live_recorder::live::DirectLive;
use live_recorder::recorder::{RecorderManager, RecorderOptions};
use live_recorder::utils::http_client;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = live_recorder::logging::init_logging(&config.log)?;

    let client = http_client::build_http_client(&config.http)?;
    let dispatcher = Arc::new(EventDispatcher::new());

    let recorders = RecorderManager::new(
        dispatcher.clone(),
        RecorderOptions::from_config(&config, client.clone()),
    );
    recorders.start();

    let listeners = ListenerManager::new(dispatcher.clone(), config.interval());
    for live_config in &config.lives {
        let live = match DirectLive::from_config(live_config, client.clone()) {
            Ok(live) => live,
            Err(e) => {
                warn!(url = %live_config.url, error = %e, "Skipping live");
                continue;
            }
        };
        if let Err(e) = listeners.add_listener(live) {
            warn!(url = %live_config.url, error = %e, "Failed to add listener");
        }
    }

    info!(
        lives = listeners.listener_count(),
        output = %config.output_path.display(),
        "live-recorder started"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");

    listeners.close();
    recorders.close();
    recorders.wait().await;

    info!("live-recorder stopped");
    Ok(())
}
