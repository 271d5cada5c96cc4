//! Toast events and the sinks that display them

use crate::core::events::{AppEvent, EventSender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// A transient alert for the overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub title: String,
    pub body: String,
    #[serde(rename = "showToast")]
    pub show: bool,
}

impl NotificationEvent {
    /// A visible toast with the given title and body
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            show: true,
        }
    }
}

/// Something that renders toasts. Fire-and-forget.
pub trait ToastSink: Send + Sync + 'static {
    fn toast(&self, event: NotificationEvent);
}

impl<T: ToastSink + ?Sized> ToastSink for Arc<T> {
    fn toast(&self, event: NotificationEvent) {
        (**self).toast(event)
    }
}

/// Writes toasts to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogToastSink;

impl ToastSink for LogToastSink {
    fn toast(&self, event: NotificationEvent) {
        info!(title = %event.title, "{}", event.body);
    }
}

/// Forwards toasts to the app event loop
#[derive(Clone)]
pub struct ChannelToastSink {
    events: EventSender,
}

impl ChannelToastSink {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl ToastSink for ChannelToastSink {
    fn toast(&self, event: NotificationEvent) {
        if self.events.send(AppEvent::Toast(event)).is_err() {
            debug!("Toast dropped, event receiver is gone");
        }
    }
}
