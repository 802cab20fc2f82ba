//! Registry of active recorders, driven by listener events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::{Recorder, RecorderOptions};
use crate::events::{Event, EventDispatcher, EventType};
use crate::live::{Live, LiveId};
use crate::{Error, Result};

const KIND: &str = "recorder";

/// Owns at most one [`Recorder`] per source.
///
/// After [`RecorderManager::start`] a recorder is created on `LiveStart` and
/// closed on `LiveEnd` or `ListenStop`. Every recording task runs on one
/// [`TaskTracker`] so shutdown can wait for files to be finalized.
pub struct RecorderManager {
    recorders: RwLock<HashMap<LiveId, Arc<Recorder>>>,
    dispatcher: Arc<EventDispatcher>,
    options: Arc<RecorderOptions>,
    tracker: TaskTracker,
    subscribed: AtomicBool,
}

impl RecorderManager {
    pub fn new(dispatcher: Arc<EventDispatcher>, options: RecorderOptions) -> Arc<Self> {
        Arc::new(Self {
            recorders: RwLock::new(HashMap::new()),
            dispatcher,
            options: Arc::new(options),
            tracker: TaskTracker::new(),
            subscribed: AtomicBool::new(false),
        })
    }

    /// Subscribes to listener events. Only the first call has an effect.
    pub fn start(self: &Arc<Self>) {
        if self
            .subscribed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        self.subscribe(EventType::LiveStart, |manager, event| {
            manager.add_recorder(event.live.clone()).map(|_| ())
        });
        self.subscribe(EventType::LiveEnd, |manager, event| {
            manager.remove_recorder(&event.live.live_id())
        });
        self.subscribe(EventType::ListenStop, |manager, event| {
            manager.remove_recorder(&event.live.live_id())
        });
        debug!("Recorder manager subscribed to listener events");
    }

    /// Registers `action` for `event_type` without keeping the manager alive.
    fn subscribe<F>(self: &Arc<Self>, event_type: EventType, action: F)
    where
        F: Fn(&RecorderManager, &Event) -> Result<()> + Send + Sync + 'static,
    {
        let manager: Weak<Self> = Arc::downgrade(self);
        self.dispatcher.add_event_listener(event_type, move |event| {
            let Some(manager) = manager.upgrade() else {
                return;
            };
            match action(&manager, event) {
                Ok(()) => {}
                Err(e) if e.is_not_found() || e.is_already_exists() => {
                    debug!(event = %event_type, error = %e, "Ignoring event")
                }
                Err(e) => warn!(event = %event_type, error = %e, "Failed to handle event"),
            }
        });
    }

    /// Creates and starts a recorder for `live`.
    ///
    /// Fails with `AlreadyExists` if one is running.
    pub fn add_recorder(&self, live: Arc<dyn Live>) -> Result<Arc<Recorder>> {
        let id = live.live_id();
        let recorder = {
            let mut recorders = self.recorders.write();
            if recorders.contains_key(&id) {
                return Err(Error::already_exists(KIND, &id));
            }
            let recorder = Arc::new(Recorder::new(
                live,
                self.dispatcher.clone(),
                self.options.clone(),
                self.tracker.clone(),
            ));
            recorders.insert(id.clone(), recorder.clone());
            recorder
        };

        recorder.start();
        debug!(live_id = %id, "Recorder added");
        Ok(recorder)
    }

    /// Closes and forgets the recorder of `id`.
    ///
    /// Fails with `NotFound` if there is none.
    pub fn remove_recorder(&self, id: &LiveId) -> Result<()> {
        let recorder = self
            .recorders
            .write()
            .remove(id)
            .ok_or_else(|| Error::not_found(KIND, id))?;

        recorder.close();
        debug!(live_id = %id, "Recorder removed");
        Ok(())
    }

    pub fn get_recorder(&self, id: &LiveId) -> Result<Arc<Recorder>> {
        self.recorders
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(KIND, id))
    }

    pub fn has_recorder(&self, id: &LiveId) -> bool {
        self.recorders.read().contains_key(id)
    }

    pub fn recorder_count(&self) -> usize {
        self.recorders.read().len()
    }

    /// Closes every recorder.
    pub fn close(&self) {
        let drained: Vec<_> = self.recorders.write().drain().map(|(_, r)| r).collect();
        if !drained.is_empty() {
            info!(count = drained.len(), "Closing recorders");
        }
        for recorder in drained {
            recorder.close();
        }
    }

    /// Waits until every recording task has exited. Call after [`close`].
    ///
    /// [`close`]: RecorderManager::close
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl std::fmt::Debug for RecorderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecorderManager")
            .field("recorders", &self.recorder_count())
            .field("tasks", &self.tracker.len())
            .finish()
    }
}
