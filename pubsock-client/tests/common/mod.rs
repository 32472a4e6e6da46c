//! Common test utilities for pubsock-client integration tests
//!
//! Two ways to drive a client without a real feed:
//!
//! - [`MockTransport`]: a scripted transport. Tests decide when each socket
//!   opens, what it receives and when it dies, and inspect what the client
//!   sent. Pair it with `#[tokio::test(start_paused = true)]` to step through
//!   heartbeat and reconnect timings deterministically.
//! - [`MockWsServer`]: a real WebSocket server on localhost that acknowledges
//!   channel requests and can push updates, drop or freeze its connections.
//!
//! [`capture_logs`] records the client's `tracing` events for assertions.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use pubsock_client::{
    EventSink, Notification, NotificationKind, PubSubClient, Transport, TransportHandle,
};
use pubsock_core::{Error, Result};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Let the connection task drain everything queued so far
///
/// Under paused time this only advances the clock by a millisecond, which is
/// far below any timer the tests configure.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Advance (paused) time and let the connection task react
pub async fn elapse(duration: Duration) {
    tokio::time::sleep(duration).await;
    settle().await;
}

/// Build a client on `transport`, let it open its first socket and report
/// that socket as open
pub async fn connected_client(
    transport: &MockTransport,
) -> (PubSubClient, broadcast::Receiver<Notification>) {
    let client = PubSubClient::builder("ws://mock.invalid/feed")
        .with_transport(transport.clone())
        .connect()
        .unwrap();
    let events = client.events();

    settle().await;
    transport.latest().open();
    settle().await;

    (client, events)
}

/// Drain the notifications received so far
pub fn drain(events: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(notification) = events.try_recv() {
        out.push(notification);
    }
    out
}

/// Kinds of the notifications received so far
pub fn drain_kinds(events: &mut broadcast::Receiver<Notification>) -> Vec<NotificationKind> {
    drain(events).iter().map(Notification::kind).collect()
}

/// Everything one scripted socket was asked to do
#[derive(Debug, Default)]
pub struct SocketLog {
    pub sent: Vec<String>,
    pub pings: usize,
    pub closed: bool,
    pub terminated: bool,
}

/// One socket opened through [`MockTransport`]
#[derive(Clone)]
pub struct MockSocket {
    pub sink: EventSink,
    log: Arc<Mutex<SocketLog>>,
}

impl MockSocket {
    /// Report the socket as open
    pub fn open(&self) {
        self.sink.opened();
    }

    /// Deliver a text frame to the client
    pub fn receive(&self, value: Value) {
        self.sink.message(value.to_string());
    }

    /// Deliver a raw text frame to the client
    pub fn receive_raw(&self, text: &str) {
        self.sink.message(text);
    }

    /// Answer the outstanding ping
    pub fn pong(&self) {
        self.sink.heartbeat_reply();
    }

    /// Report a socket error
    pub fn fail(&self, reason: &str) {
        self.sink.error(Error::Transport(reason.to_string()));
    }

    /// Report the socket as closed by the remote end
    pub fn drop_connection(&self) {
        self.sink.closed();
    }

    pub fn sent(&self) -> Vec<Value> {
        self.log
            .lock()
            .unwrap()
            .sent
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    /// Channels of all frames with the given op, sorted
    pub fn channels_for(&self, op: &str) -> Vec<String> {
        let mut channels: Vec<String> = self
            .sent()
            .into_iter()
            .filter(|frame| frame["op"] == op)
            .map(|frame| frame["channel"].as_str().unwrap().to_string())
            .collect();
        channels.sort();
        channels
    }

    pub fn pings(&self) -> usize {
        self.log.lock().unwrap().pings
    }

    pub fn was_closed(&self) -> bool {
        self.log.lock().unwrap().closed
    }

    pub fn was_terminated(&self) -> bool {
        self.log.lock().unwrap().terminated
    }
}

#[derive(Default)]
struct TransportState {
    sockets: Vec<MockSocket>,
    refuse: usize,
}

/// Scripted transport recording every connection attempt
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<TransportState>>,
    auto_close: bool,
}

impl MockTransport {
    /// A transport whose sockets only change state when the test says so
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose sockets report `closed` as soon as they are asked to
    /// close or are terminated, like a real socket would
    pub fn closing_promptly() -> Self {
        Self {
            auto_close: true,
            ..Self::default()
        }
    }

    /// Make the next `n` calls to `open` fail synchronously
    pub fn refuse_next(&self, n: usize) {
        self.state.lock().unwrap().refuse = n;
    }

    /// Number of sockets opened so far
    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().sockets.len()
    }

    pub fn socket(&self, index: usize) -> MockSocket {
        self.state.lock().unwrap().sockets[index].clone()
    }

    pub fn latest(&self) -> MockSocket {
        self.state
            .lock()
            .unwrap()
            .sockets
            .last()
            .cloned()
            .expect("no socket opened yet")
    }
}

impl Transport for MockTransport {
    fn open(&self, _url: &str, events: EventSink) -> Result<Box<dyn TransportHandle>> {
        let mut state = self.state.lock().unwrap();
        if state.refuse > 0 {
            state.refuse -= 1;
            return Err(Error::Transport("connection refused".to_string()));
        }

        let log = Arc::new(Mutex::new(SocketLog::default()));
        state.sockets.push(MockSocket {
            sink: events.clone(),
            log: Arc::clone(&log),
        });

        Ok(Box::new(MockHandle {
            log,
            events,
            auto_close: self.auto_close,
        }))
    }
}

struct MockHandle {
    log: Arc<Mutex<SocketLog>>,
    events: EventSink,
    auto_close: bool,
}

impl TransportHandle for MockHandle {
    fn send(&mut self, text: String) -> Result<()> {
        self.log.lock().unwrap().sent.push(text);
        Ok(())
    }

    fn ping(&mut self) -> Result<()> {
        self.log.lock().unwrap().pings += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closed = true;
        if self.auto_close {
            self.events.closed();
        }
    }

    fn terminate(&mut self) {
        self.log.lock().unwrap().terminated = true;
        if self.auto_close {
            self.events.closed();
        }
    }
}

/// Build the response a server sends for a channel request
pub fn mock_response(op: &str, channel: &str, success: bool) -> Value {
    json!({
        "type": "response",
        "op": op,
        "success": success,
        "data": { "channel": channel }
    })
}

/// Build an update envelope
pub fn mock_update(channel: &str, data: Value) -> Value {
    json!({
        "type": "update",
        "channel": channel,
        "data": data
    })
}

#[derive(Debug, Clone)]
enum ServerCommand {
    Push(String),
    DropAll,
    FreezeAll,
}

/// Mock WebSocket server for end-to-end client tests
///
/// Acknowledges every `{op, channel}` frame with a successful response and
/// answers pings (tungstenite does this while reading). Frozen connections
/// stop reading, so pings go unanswered.
pub struct MockWsServer {
    addr: SocketAddr,
    frames: mpsc::UnboundedReceiver<String>,
    control: broadcast::Sender<ServerCommand>,
    accepted: Arc<AtomicUsize>,
    shutdown_tx: mpsc::Sender<()>,
}

impl MockWsServer {
    pub async fn new() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (frames_tx, frames) = mpsc::unbounded_channel();
        let (control, _) = broadcast::channel(64);
        let accepted = Arc::new(AtomicUsize::new(0));

        let control_tx = control.clone();
        let accepted_count = Arc::clone(&accepted);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accept_result = listener.accept() => {
                        let Ok((stream, _)) = accept_result else { continue };
                        accepted_count.fetch_add(1, Ordering::SeqCst);
                        tokio::spawn(serve_connection(
                            stream,
                            frames_tx.clone(),
                            control_tx.subscribe(),
                        ));
                    }
                }
            }
        });

        Self {
            addr,
            frames,
            control,
            accepted,
            shutdown_tx,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of connections accepted so far
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Send a frame to every live connection
    pub fn push(&self, value: Value) {
        let _ = self.control.send(ServerCommand::Push(value.to_string()));
    }

    /// Drop every live connection without a close handshake
    pub fn drop_connections(&self) {
        let _ = self.control.send(ServerCommand::DropAll);
    }

    /// Stop reading on every live connection
    pub fn freeze_connections(&self) {
        let _ = self.control.send(ServerCommand::FreezeAll);
    }

    /// Next text frame received from any client, parsed
    pub async fn next_frame(&mut self) -> Option<Value> {
        tokio::time::timeout(Duration::from_secs(5), self.frames.recv())
            .await
            .ok()
            .flatten()
            .map(|text| serde_json::from_str(&text).unwrap())
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    frames: mpsc::UnboundedSender<String>,
    mut control: broadcast::Receiver<ServerCommand>,
) {
    let Ok(ws_stream) = accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let _ = frames.send(text.clone());
                    if let Ok(request) = serde_json::from_str::<Value>(&text) {
                        if let (Some(op), Some(channel)) = (request["op"].as_str(), request["channel"].as_str()) {
                            let reply = mock_response(op, channel, true).to_string();
                            let _ = write.send(Message::Text(reply)).await;
                        }
                    }
                }
                Some(Ok(_)) => {}
                _ => return,
            },
            command = control.recv() => match command {
                Ok(ServerCommand::Push(text)) => {
                    let _ = write.send(Message::Text(text)).await;
                }
                Ok(ServerCommand::DropAll) => return,
                Ok(ServerCommand::FreezeAll) => {
                    // Hold the socket open without ever reading again
                    let _socket = (write, read);
                    std::future::pending::<()>().await;
                    return;
                }
                Err(_) => return,
            },
        }
    }
}

/// A `tracing` event recorded by [`capture_logs`]
#[derive(Debug, Clone)]
pub struct LoggedEvent {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LoggedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Events recorded so far
#[derive(Clone, Default)]
pub struct LoggedEvents(Arc<Mutex<Vec<LoggedEvent>>>);

impl LoggedEvents {
    pub fn at_level(&self, level: Level) -> Vec<LoggedEvent> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.level == level)
            .cloned()
            .collect()
    }
}

struct CaptureLayer(LoggedEvents);

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let value = format!("{:?}", value);
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let LoggedEvents(events) = &self.0;
        events.lock().unwrap().push(LoggedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Record every `tracing` event on this thread while the guard lives
///
/// `#[tokio::test]` runs the client's tasks on the test thread, so their
/// events are captured too.
pub fn capture_logs() -> (LoggedEvents, tracing::subscriber::DefaultGuard) {
    let logs = LoggedEvents::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(logs.clone()));
    (logs, tracing::subscriber::set_default(subscriber))
}
