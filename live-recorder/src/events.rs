//! Lifecycle events and their synchronous dispatcher.
//!
//! Listeners publish status transitions, recorders publish their own start
//! and stop, and the recorder manager subscribes to the transitions. Handlers
//! run on the publisher's task, in registration order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::live::Live;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    ListenStart,
    ListenStop,
    LiveStart,
    LiveEnd,
    RecorderStart,
    RecorderStop,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListenStart => "ListenStart",
            Self::ListenStop => "ListenStop",
            Self::LiveStart => "LiveStart",
            Self::LiveEnd => "LiveEnd",
            Self::RecorderStart => "RecorderStart",
            Self::RecorderStop => "RecorderStop",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event and the source it concerns.
#[derive(Clone)]
pub struct Event {
    pub event_type: EventType,
    pub live: Arc<dyn Live>,
}

impl Event {
    pub fn new(event_type: EventType, live: Arc<dyn Live>) -> Self {
        Self { event_type, live }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("live_id", &self.live.live_id())
            .finish()
    }
}

pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Typed publish/subscribe.
///
/// The handler list is cloned out of the lock before delivery, so a handler
/// may publish further events or register new handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<HashMap<EventType, Vec<EventHandler>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event_listener<F>(&self, event_type: EventType, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(event_type)
            .or_default()
            .push(Arc::new(handler));
    }

    pub fn dispatch(&self, event_type: EventType, live: Arc<dyn Live>) {
        self.dispatch_event(&Event::new(event_type, live));
    }

    pub fn dispatch_event(&self, event: &Event) {
        let handlers = self
            .handlers
            .read()
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        trace!(
            event = %event.event_type,
            live_id = %event.live.live_id(),
            handlers = handlers.len(),
            "Dispatching event"
        );
        for handler in handlers {
            handler(event);
        }
    }

    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers
            .read()
            .get(&event_type)
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let mut counts: Vec<_> = handlers.iter().map(|(t, h)| (*t, h.len())).collect();
        counts.sort_by_key(|(t, _)| t.as_str());
        f.debug_struct("EventDispatcher")
            .field("handlers", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::{LiveId, LiveInfo};
    use async_trait::async_trait;
    use chrono::{DateTime, Local};
    use parking_lot::Mutex;
    use url::Url;

    struct StubLive;

    #[async_trait]
    impl Live for StubLive {
        fn live_id(&self) -> LiveId {
            LiveId::from("stub")
        }
        fn platform_name(&self) -> &str {
            "Stub"
        }
        async fn get_info(&self) -> crate::Result<LiveInfo> {
            Ok(LiveInfo::default())
        }
        fn cached_info(&self) -> LiveInfo {
            LiveInfo::default()
        }
        async fn get_stream_urls(&self) -> crate::Result<Vec<Url>> {
            Ok(Vec::new())
        }
        fn set_last_start_time(&self, _at: DateTime<Local>) {}
        fn last_start_time(&self) -> Option<DateTime<Local>> {
            None
        }
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let seen = seen.clone();
            dispatcher.add_event_listener(EventType::LiveStart, move |_| seen.lock().push(n));
        }
        dispatcher.dispatch(EventType::LiveStart, Arc::new(StubLive));

        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_only_matching_type_is_delivered() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        dispatcher.add_event_listener(EventType::LiveEnd, move |e| sink.lock().push(e.event_type));
        dispatcher.dispatch(EventType::LiveStart, Arc::new(StubLive));
        dispatcher.dispatch(EventType::LiveEnd, Arc::new(StubLive));

        assert_eq!(*seen.lock(), vec![EventType::LiveEnd]);
        assert_eq!(dispatcher.handler_count(EventType::LiveEnd), 1);
        assert_eq!(dispatcher.handler_count(EventType::ListenStop), 0);
    }

    #[test]
    fn test_handler_may_dispatch_reentrantly() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner = Arc::downgrade(&dispatcher);
        dispatcher.add_event_listener(EventType::LiveStart, move |e| {
            if let Some(dispatcher) = inner.upgrade() {
                dispatcher.dispatch(EventType::RecorderStart, e.live.clone());
            }
        });
        let sink = seen.clone();
        dispatcher.add_event_listener(EventType::RecorderStart, move |e| {
            sink.lock().push(e.live.live_id())
        });

        dispatcher.dispatch(EventType::LiveStart, Arc::new(StubLive));
        assert_eq!(*seen.lock(), vec![LiveId::from("stub")]);
    }
}
