//! Registry of active listeners.
//!
//! The `ListenerManager` holds at most one [`Listener`] per source:
//! - Adding starts the listener, removing closes it
//! - The map lock is held for the mutation only; events are published after
//!   it is released

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::Listener;
use crate::events::EventDispatcher;
use crate::live::{Live, LiveId};
use crate::{Error, Result};

const KIND: &str = "listener";

pub struct ListenerManager {
    listeners: RwLock<HashMap<LiveId, Arc<Listener>>>,
    dispatcher: Arc<EventDispatcher>,
    interval: Duration,
}

impl ListenerManager {
    /// Create a manager whose listeners poll every `interval`.
    pub fn new(dispatcher: Arc<EventDispatcher>, interval: Duration) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            dispatcher,
            interval,
        }
    }

    /// Start listening to `live`.
    ///
    /// Fails with `AlreadyExists` if the source is already listened to.
    pub fn add_listener(&self, live: Arc<dyn Live>) -> Result<Arc<Listener>> {
        let id = live.live_id();
        let listener = {
            let mut listeners = self.listeners.write();
            if listeners.contains_key(&id) {
                return Err(Error::already_exists(KIND, &id));
            }
            let listener = Arc::new(Listener::new(live, self.dispatcher.clone(), self.interval));
            listeners.insert(id.clone(), listener.clone());
            listener
        };

        listener.start();
        debug!(live_id = %id, "Listener added");
        Ok(listener)
    }

    /// Stop listening to the source with `id`.
    ///
    /// Fails with `NotFound` if it is not listened to.
    pub fn remove_listener(&self, id: &LiveId) -> Result<()> {
        let listener = self
            .listeners
            .write()
            .remove(id)
            .ok_or_else(|| Error::not_found(KIND, id))?;

        listener.close();
        debug!(live_id = %id, "Listener removed");
        Ok(())
    }

    pub fn get_listener(&self, id: &LiveId) -> Result<Arc<Listener>> {
        self.listeners
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(KIND, id))
    }

    pub fn has_listener(&self, id: &LiveId) -> bool {
        self.listeners.read().contains_key(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn live_ids(&self) -> Vec<LiveId> {
        self.listeners.read().keys().cloned().collect()
    }

    /// Close every listener. Used at shutdown.
    pub fn close(&self) {
        let drained: Vec<_> = self.listeners.write().drain().map(|(_, l)| l).collect();
        if drained.is_empty() {
            return;
        }

        info!(count = drained.len(), "Closing listeners");
        for listener in drained {
            listener.close();
        }
    }
}

impl std::fmt::Debug for ListenerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerManager")
            .field("listeners", &self.listener_count())
            .field("interval", &self.interval)
            .finish()
    }
}
