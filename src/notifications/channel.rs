//! Self-healing notification channel
//!
//! Keeps one connection to the backend open for the lifetime of the
//! process and turns every inbound text frame into a toast. When the
//! connection closes (or never opens) the channel waits a fixed delay and
//! tries again, forever.

use super::toast::{NotificationEvent, ToastSink};
use super::transport::{Connection, Connector, InboundFrame};
use crate::core::events::{AppEvent, EventSender};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, Instrument};

/// Delay between a closed connection and the next attempt
pub const RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Open => write!(f, "open"),
            ChannelState::Closed => write!(f, "closed"),
        }
    }
}

/// Observable channel status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    pub state: ChannelState,
    /// Connection attempts made so far (including the current one)
    pub attempts: u64,
    /// Toasts handed to the sink
    pub delivered: u64,
    /// Frames dropped as malformed
    pub discarded: u64,
    /// Reason the last connection ended or failed
    pub last_error: Option<String>,
}

impl Default for ChannelStatus {
    fn default() -> Self {
        Self {
            state: ChannelState::Connecting,
            attempts: 0,
            delivered: 0,
            discarded: 0,
            last_error: None,
        }
    }
}

/// Push-notification client for the backend WebSocket
pub struct NotificationChannel<C: Connector, S: ToastSink> {
    url: String,
    title: String,
    reconnect_delay: Duration,
    connector: C,
    sink: S,
    events: Option<EventSender>,
    status: watch::Sender<ChannelStatus>,
}

impl<C: Connector, S: ToastSink> NotificationChannel<C, S> {
    pub fn new(url: impl Into<String>, connector: C, sink: S) -> Self {
        let (status, _) = watch::channel(ChannelStatus::default());
        Self {
            url: url.into(),
            title: crate::PRODUCT_NAME.to_string(),
            reconnect_delay: RECONNECT_DELAY,
            connector,
            sink,
            events: None,
            status,
        }
    }

    /// Title used for every toast
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Also report connect/close transitions as app events
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Spawn the channel on the current runtime.
    ///
    /// Must be called from within a tokio runtime. Nothing is ever reported
    /// back through the return value; failures are retried internally.
    /// The task logs inside the caller's current span.
    pub fn start(self) -> ChannelHandle {
        let status = self.status.subscribe();
        let task = tokio::spawn(self.run().in_current_span());
        ChannelHandle { task, status }
    }

    async fn run(self) {
        loop {
            self.status.send_modify(|s| {
                s.state = ChannelState::Connecting;
                s.attempts += 1;
            });
            let attempt = self.status.borrow().attempts;
            debug!(attempt, url = %self.url, "Connecting to notification endpoint");

            let reason = match self.connector.connect(&self.url).await {
                Ok(mut conn) => {
                    info!(attempt, "WebSocket connected");
                    self.status.send_modify(|s| s.state = ChannelState::Open);
                    self.emit(AppEvent::ChannelConnected);
                    let reason = self.pump(&mut conn).await;
                    drop(conn);
                    reason
                }
                Err(e) => {
                    error!(attempt, reason = %e, "Socket encountered error, closing socket");
                    e.to_string()
                }
            };

            info!(
                attempt,
                reason = %reason,
                "Socket is closed. Reconnect will be attempted in {:?}",
                self.reconnect_delay
            );
            self.status.send_modify(|s| {
                s.state = ChannelState::Closed;
                s.last_error = Some(reason.clone());
            });
            self.emit(AppEvent::ChannelClosed { reason });

            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Deliver frames until the connection ends; returns the close reason
    async fn pump(&self, conn: &mut C::Connection) -> String {
        loop {
            match conn.recv().await {
                Some(Ok(InboundFrame::Text(body))) => {
                    debug!("Notification received: {}", body);
                    self.sink.toast(NotificationEvent::new(self.title.clone(), body));
                    self.status.send_modify(|s| s.delivered += 1);
                }
                Some(Ok(InboundFrame::Binary(data))) => {
                    error!("Unexpected message type: binary ({} bytes), discarding", data.len());
                    self.status.send_modify(|s| s.discarded += 1);
                }
                Some(Ok(InboundFrame::Control)) => {}
                Some(Ok(InboundFrame::Close(reason))) => {
                    // Finish the close handshake before dropping the socket
                    conn.close().await;
                    return reason.unwrap_or_else(|| "closed by peer".to_string());
                }
                Some(Err(e)) => {
                    error!(reason = %e, "Socket encountered error, closing socket");
                    conn.close().await;
                    return e.to_string();
                }
                None => return "connection ended".to_string(),
            }
        }
    }

    fn emit(&self, event: AppEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Handle to a running channel
pub struct ChannelHandle {
    task: JoinHandle<()>,
    status: watch::Receiver<ChannelStatus>,
}

impl ChannelHandle {
    /// Current status snapshot
    pub fn status(&self) -> ChannelStatus {
        self.status.borrow().clone()
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<ChannelStatus> {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the channel (process teardown only)
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
        info!("Notification channel stopped");
    }
}
