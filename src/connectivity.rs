//! Connectivity monitor - tracks online/offline state and notifies listeners.
//!
//! The platform layer feeds network signals into [`ConnectivityMonitor::set_online`];
//! everything else in the engine either polls [`ConnectivityMonitor::is_online`]
//! or subscribes to transition events. Events fire only on actual transitions,
//! never on repeated signals of the same state.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::info;

/// A connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// The device came online
    Connected,
    /// The device went offline
    Disconnected,
}

/// Observes online/offline transitions and fans them out to subscribers.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    online: AtomicBool,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            online: AtomicBool::new(online),
            events,
        }
    }

    /// Current connectivity state.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Feeds a platform network signal into the monitor. Emits an event to
    /// subscribers only when the state actually changes.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }

        let event = if online {
            ConnectivityEvent::Connected
        } else {
            ConnectivityEvent::Disconnected
        };
        info!("Connectivity changed: {:?}", event);

        // Send fails only when nobody is subscribed, which is fine.
        let _ = self.events.send(event);
    }

    /// Subscribes to connectivity transitions.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[tokio::test]
    async fn test_transition_emits_event() {
        let monitor = ConnectivityMonitor::new(true);
        let mut events = monitor.subscribe();

        monitor.set_online(false);
        assert!(!monitor.is_online());
        assert_eq!(events.try_recv().unwrap(), ConnectivityEvent::Disconnected);

        monitor.set_online(true);
        assert!(monitor.is_online());
        assert_eq!(events.try_recv().unwrap(), ConnectivityEvent::Connected);
    }

    #[tokio::test]
    async fn test_repeated_signal_is_silent() {
        let monitor = ConnectivityMonitor::new(true);
        let mut events = monitor.subscribe();

        monitor.set_online(true);
        monitor.set_online(true);
        assert!(events.try_recv().is_err());
    }
}
