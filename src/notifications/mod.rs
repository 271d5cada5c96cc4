//! Notifications module - push alerts from the backend
//!
//! This module provides:
//! - `NotificationChannel`: reconnecting receive-only client for the backend WebSocket
//! - `ToastSink`: where notification events end up
//! - `Connector`/`Connection`: transport seam, `WsConnector` for the real thing

mod channel;
mod toast;
mod transport;

pub use channel::{ChannelHandle, ChannelState, ChannelStatus, NotificationChannel, RECONNECT_DELAY};
pub use toast::{ChannelToastSink, LogToastSink, NotificationEvent, ToastSink};
pub use transport::{Connection, Connector, InboundFrame, TransportError, WsConnection, WsConnector};
