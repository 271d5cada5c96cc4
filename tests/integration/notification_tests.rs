//! Notification channel integration tests

mod common;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use common::{spawn_backend, wait_for, RecordingSink};
use controller_tools::notifications::{
    ChannelState, Connection, Connector, InboundFrame, NotificationChannel, NotificationEvent,
    TransportError, WsConnector,
};
use controller_tools::{AppEvent, EventSender};
use futures_util::future::{pending, BoxFuture};
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing_test::traced_test;

const URL: &str = "ws://localhost:33220/ws";

// ── Scripted transport ───────────────────────────────────────────────

/// What the next connection attempt does
enum Script {
    Refuse,
    /// Deliver these frames, then either end the stream or stay open
    Frames {
        frames: Vec<Result<InboundFrame, TransportError>>,
        hang: bool,
    },
}

#[derive(Clone, Default)]
struct ScriptedConnector {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
    closes: Arc<AtomicUsize>,
    /// Used once the scripts run out
    repeat_close: bool,
}

impl ScriptedConnector {
    fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            ..Default::default()
        }
    }

    /// Every attempt connects and is immediately closed by the peer
    fn always_closing() -> Self {
        Self {
            repeat_close: true,
            ..Default::default()
        }
    }

    fn attempt_offsets(&self, start: Instant) -> Vec<Duration> {
        self.attempts.lock().iter().map(|t| t.duration_since(start)).collect()
    }

    fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct ScriptedConnection {
    frames: VecDeque<Result<InboundFrame, TransportError>>,
    hang: bool,
    closes: Arc<AtomicUsize>,
}

impl Connection for ScriptedConnection {
    fn recv(&mut self) -> BoxFuture<'_, Option<Result<InboundFrame, TransportError>>> {
        async move {
            if let Some(frame) = self.frames.pop_front() {
                return Some(frame);
            }
            if self.hang {
                pending::<()>().await;
            }
            None
        }
        .boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        async {}.boxed()
    }
}

impl Connector for ScriptedConnector {
    type Connection = ScriptedConnection;

    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ScriptedConnection, TransportError>> {
        async move {
            self.attempts.lock().push(Instant::now());
            let script = self.scripts.lock().pop_front();
            let script = match script {
                Some(script) => script,
                None if self.repeat_close => Script::Frames {
                    frames: vec![Ok(InboundFrame::Close(Some("backend restarting".into())))],
                    hang: false,
                },
                None => Script::Refuse,
            };
            match script {
                Script::Refuse => Err(TransportError::Connect {
                    url: url.to_string(),
                    message: "connection refused".into(),
                }),
                Script::Frames { frames, hang } => Ok(ScriptedConnection {
                    frames: frames.into(),
                    hang,
                    closes: Arc::clone(&self.closes),
                }),
            }
        }
        .boxed()
    }
}

fn assert_ten_second_cycles(offsets: &[Duration], expected_attempts: usize) {
    assert_eq!(offsets.len(), expected_attempts, "attempts at {:?}", offsets);
    assert_eq!(offsets[0], Duration::ZERO);
    for pair in offsets.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= Duration::from_secs(10), "reconnected early: {:?}", offsets);
        assert!(gap < Duration::from_millis(10_010), "reconnected late: {:?}", offsets);
    }
}

// ── Reconnection ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_refused_connect_retries_every_ten_seconds() {
    let connector = ScriptedConnector::new(vec![]);
    let sink = Arc::new(RecordingSink::default());
    let start = Instant::now();

    let handle = NotificationChannel::new(URL, connector.clone(), sink.clone()).start();

    tokio::time::sleep(Duration::from_millis(9_500)).await;
    assert_eq!(connector.attempt_offsets(start).len(), 1);
    assert_eq!(handle.status().state, ChannelState::Closed);

    tokio::time::sleep(Duration::from_millis(26_000)).await;
    assert_ten_second_cycles(&connector.attempt_offsets(start), 4);

    let status = handle.status();
    assert_eq!(status.attempts, 4);
    assert!(status.last_error.unwrap().contains("connection refused"));
    assert!(sink.events().is_empty());
    assert!(handle.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_peer_close_reconnects_after_fixed_delay() {
    let connector = ScriptedConnector::always_closing();
    let sink = Arc::new(RecordingSink::default());
    let start = Instant::now();

    let handle = NotificationChannel::new(URL, connector.clone(), sink).start();

    tokio::time::sleep(Duration::from_millis(45_500)).await;
    assert_ten_second_cycles(&connector.attempt_offsets(start), 5);

    let status = handle.status();
    assert_eq!(status.state, ChannelState::Closed);
    assert_eq!(status.last_error.as_deref(), Some("backend restarting"));
    // Every peer close is answered before the socket is dropped
    assert_eq!(connector.close_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_custom_reconnect_delay_is_constant() {
    let connector = ScriptedConnector::new(vec![]);
    let start = Instant::now();

    let _handle = NotificationChannel::new(URL, connector.clone(), Arc::new(RecordingSink::default()))
        .with_reconnect_delay(Duration::from_secs(2))
        .start();

    tokio::time::sleep(Duration::from_millis(60_500)).await;
    let offsets = connector.attempt_offsets(start);
    assert_eq!(offsets.len(), 31);
    for pair in offsets.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= Duration::from_secs(2) && gap < Duration::from_millis(2_010));
    }
}

// ── Frame handling ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_binary_frame_is_discarded_without_closing() {
    let connector = ScriptedConnector::new(vec![Script::Frames {
        frames: vec![
            Ok(InboundFrame::Text("first".into())),
            Ok(InboundFrame::Binary(vec![0xde, 0xad, 0xbe, 0xef])),
            Ok(InboundFrame::Control),
            Ok(InboundFrame::Text("DualSense is low on battery (15%)".into())),
        ],
        hang: true,
    }]);
    let sink = Arc::new(RecordingSink::default());

    let handle = NotificationChannel::new(URL, connector.clone(), sink.clone()).start();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(sink.bodies(), vec!["first", "DualSense is low on battery (15%)"]);
    let status = handle.status();
    assert_eq!(status.state, ChannelState::Open);
    assert_eq!(status.attempts, 1);
    assert_eq!(status.delivered, 2);
    assert_eq!(status.discarded, 1);
    assert_eq!(connector.close_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_toast_fields() {
    let connector = ScriptedConnector::new(vec![Script::Frames {
        frames: vec![Ok(InboundFrame::Text("Pro Controller is low on battery (10%)".into()))],
        hang: true,
    }]);
    let sink = Arc::new(RecordingSink::default());

    let _handle = NotificationChannel::new(URL, connector, sink.clone()).start();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(
        sink.events(),
        vec![NotificationEvent {
            title: "Controller Tools".into(),
            body: "Pro Controller is low on battery (10%)".into(),
            show: true,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_closes_and_retries() {
    let connector = ScriptedConnector::new(vec![
        Script::Frames {
            frames: vec![
                Ok(InboundFrame::Text("before".into())),
                Err(TransportError::Protocol("connection reset".into())),
                Ok(InboundFrame::Text("never delivered".into())),
            ],
            hang: true,
        },
        Script::Frames {
            frames: vec![Ok(InboundFrame::Text("after".into()))],
            hang: true,
        },
    ]);
    let sink = Arc::new(RecordingSink::default());
    let start = Instant::now();

    let handle = NotificationChannel::new(URL, connector.clone(), sink.clone()).start();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(connector.close_count(), 1);
    let status = handle.status();
    assert_eq!(status.state, ChannelState::Closed);
    assert!(status.last_error.unwrap().contains("connection reset"));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_ten_second_cycles(&connector.attempt_offsets(start), 2);
    assert_eq!(handle.status().state, ChannelState::Open);
    assert_eq!(sink.bodies(), vec!["before", "after"]);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_events() {
    let connector = ScriptedConnector::new(vec![Script::Frames {
        frames: vec![
            Ok(InboundFrame::Text("hello".into())),
            Ok(InboundFrame::Close(None)),
        ],
        hang: false,
    }]);
    let (events, mut rx) = EventSender::channel();

    let handle = NotificationChannel::new(URL, connector, Arc::new(RecordingSink::default()))
        .with_events(events)
        .start();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(rx.recv().await, Some(AppEvent::ChannelConnected));
    assert_eq!(
        rx.recv().await,
        Some(AppEvent::ChannelClosed {
            reason: "closed by peer".into()
        })
    );
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_transitions_are_logged_before_state_changes() {
    let connector = ScriptedConnector::new(vec![Script::Frames {
        frames: vec![Ok(InboundFrame::Close(Some("backend restarting".into())))],
        hang: false,
    }]);
    let handle = NotificationChannel::new(URL, connector, Arc::new(RecordingSink::default())).start();
    let mut status = handle.subscribe();

    // Whatever state is observed, the line for every transition up to it is already written
    status.wait_for(|s| s.state != ChannelState::Connecting).await.unwrap();
    assert!(logs_contain("WebSocket connected"));

    status.wait_for(|s| s.state == ChannelState::Closed).await.unwrap();
    assert!(logs_contain("Socket is closed. Reconnect will be attempted in 10s"));
    assert!(logs_contain("reason=backend restarting"));

    status
        .wait_for(|s| s.attempts >= 2 && s.state == ChannelState::Closed)
        .await
        .unwrap();
    assert!(logs_contain("Socket encountered error, closing socket"));
    assert!(logs_contain("connection refused"));
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_ends_the_task() {
    let connector = ScriptedConnector::new(vec![]);
    let handle = NotificationChannel::new(URL, connector.clone(), Arc::new(RecordingSink::default())).start();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(handle.is_running());

    handle.stop().await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.attempts.lock().len(), 1);
}

// ── Real WebSocket backend ───────────────────────────────────────────

#[derive(Default)]
struct AlertBackend {
    connections: AtomicUsize,
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AlertBackend>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| push_alert(socket, state))
}

/// Sends one junk binary frame and one alert, then hangs up
async fn push_alert(mut socket: WebSocket, state: Arc<AlertBackend>) {
    let n = state.connections.fetch_add(1, Ordering::SeqCst) + 1;
    let _ = socket.send(Message::Binary(vec![1, 2, 3].into())).await;
    let _ = socket
        .send(Message::Text(format!("Xbox Controller is low on battery ({}%)", n).into()))
        .await;
    let _ = socket.send(Message::Close(None)).await;
}

#[tokio::test]
async fn test_websocket_backend_alerts_and_reconnect() {
    let backend = Arc::new(AlertBackend::default());
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(Arc::clone(&backend));
    let addr = spawn_backend(app).await;

    let sink = Arc::new(RecordingSink::default());
    let handle = NotificationChannel::new(format!("ws://{}/ws", addr), WsConnector, sink.clone())
        .with_reconnect_delay(Duration::from_millis(50))
        .start();

    assert!(wait_for(Duration::from_secs(5), || sink.events().len() >= 2).await);

    let bodies = sink.bodies();
    assert_eq!(bodies[0], "Xbox Controller is low on battery (1%)");
    assert_eq!(bodies[1], "Xbox Controller is low on battery (2%)");
    assert!(backend.connections.load(Ordering::SeqCst) >= 2);

    let status = handle.status();
    assert!(status.discarded >= 2);
    assert!(status.attempts >= 2);
    handle.stop().await;
}

#[tokio::test]
async fn test_websocket_refused_is_retried() {
    // Reserve a port, then free it so nothing is listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let handle = NotificationChannel::new(
        format!("ws://{}/ws", addr),
        WsConnector,
        Arc::new(RecordingSink::default()),
    )
    .with_reconnect_delay(Duration::from_millis(20))
    .start();

    let mut status = handle.subscribe();
    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        status.wait_for(|s| s.attempts >= 3).await.is_ok()
    })
    .await;
    assert!(tokio_test::assert_ok!(reached));

    let last_error = handle.status().last_error.unwrap();
    assert!(last_error.contains("connect to"), "{}", last_error);
    handle.stop().await;
}
