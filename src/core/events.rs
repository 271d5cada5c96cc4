//! Application event definitions

use crate::notifications::NotificationEvent;
use tokio::sync::mpsc;

/// Wrapper around `mpsc::UnboundedSender<AppEvent>`.
///
/// Background tasks hold a clone; the receiver lives with whatever drives
/// the UI (the overlay host, or the CLI loop in `main.rs`).
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }

    /// Create a sender/receiver pair
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, event: AppEvent) -> Result<(), mpsc::error::SendError<AppEvent>> {
        self.tx.send(event)
    }
}

/// Application-wide events for inter-module communication
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Notification channel opened a connection
    ChannelConnected,

    /// Notification channel lost its connection
    ChannelClosed { reason: String },

    /// A toast should be shown
    Toast(NotificationEvent),

    /// The controller list left the loading state
    ControllersUpdated { count: usize },

    /// A setting round trip was confirmed by the backend
    SettingChanged { key: String, value: bool },

    /// A setting round trip failed and the local value was rolled back
    SettingFailed { key: String, error: String },
}
