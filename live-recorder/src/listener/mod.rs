//! Status polling.
//!
//! A [`Listener`] asks its source for the live status on a fixed interval and
//! publishes `LiveStart`/`LiveEnd` whenever the observed status flips.

pub mod manager;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use parking_lot::ReentrantMutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::events::{EventDispatcher, EventType};
use crate::live::{Live, LiveId};

pub use manager::ListenerManager;

pub struct Listener {
    live: Arc<dyn Live>,
    dispatcher: Arc<EventDispatcher>,
    interval: Duration,
    /// Last status observed by this listener, independent of the source cache.
    status: AtomicBool,
    started: AtomicBool,
    closed: AtomicBool,
    /// Held while a status flip or the close is published, so `ListenStop`
    /// is always the last event of a listener. Reentrant so handlers may
    /// close the listener.
    transition: ReentrantMutex<()>,
    cancellation_token: CancellationToken,
}

impl Listener {
    pub fn new(live: Arc<dyn Live>, dispatcher: Arc<EventDispatcher>, interval: Duration) -> Self {
        Self {
            live,
            dispatcher,
            interval,
            status: AtomicBool::new(false),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            transition: ReentrantMutex::new(()),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn live_id(&self) -> LiveId {
        self.live.live_id()
    }

    pub fn live(&self) -> &Arc<dyn Live> {
        &self.live
    }

    /// Last observed on-air status.
    pub fn status(&self) -> bool {
        self.status.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Starts polling. Only the first call has an effect.
    pub fn start(self: &Arc<Self>) {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        info!(live = %self.live.info_fields(), "Listener started");
        self.dispatcher
            .dispatch(EventType::ListenStart, self.live.clone());

        let listener = self.clone();
        tokio::spawn(async move { listener.run().await });
    }

    /// Stops polling. Only the first call has an effect; the polling task is
    /// not awaited.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        info!(live = %self.live.info_fields(), "Listener closed");
        let _transition = self.transition.lock();
        self.dispatcher
            .dispatch(EventType::ListenStop, self.live.clone());
        self.cancellation_token.cancel();
    }

    async fn run(&self) {
        // the first tick completes immediately and serves as the initial refresh
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => break,
                _ = ticker.tick() => self.refresh().await,
            }
        }
        debug!(live_id = %self.live.live_id(), "Listener task exited");
    }

    async fn refresh(&self) {
        let info = match self.live.get_info().await {
            Ok(info) => info,
            Err(e) => {
                debug!(live_id = %self.live.live_id(), error = %e, "Failed to refresh live info");
                return;
            }
        };

        let _transition = self.transition.lock();
        if self.cancellation_token.is_cancelled() {
            return;
        }

        let previous = self.status.swap(info.status, Ordering::SeqCst);
        match (previous, info.status) {
            (false, true) => {
                self.live.set_last_start_time(Local::now());
                info!(live = %self.live.info_fields(), "Live Start");
                self.dispatcher
                    .dispatch(EventType::LiveStart, self.live.clone());
            }
            (true, false) => {
                info!(live = %self.live.info_fields(), "Live End");
                self.dispatcher
                    .dispatch(EventType::LiveEnd, self.live.clone());
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("live_id", &self.live.live_id())
            .field("status", &self.status())
            .field("interval", &self.interval)
            .field("closed", &self.is_closed())
            .finish()
    }
}
