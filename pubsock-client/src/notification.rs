//! Notifications delivered to the caller
//!
//! The client reports four kinds of events:
//!
//! - **Open**: the first connection of the client's lifetime opened
//! - **Update**: an `update` envelope arrived (the whole envelope is passed on)
//! - **Error**: the transport reported an error while connected
//! - **Close**: an explicit `close()` completed
//!
//! They can be consumed two ways. Async callbacks registered per kind run on
//! a dispatcher task of their own, one at a time and in emission order, so a
//! callback may await the client (for example `subscriptions()`) without
//! stalling the connection. A slow callback only delays later callbacks.
//! [`Notifier::subscribe`] returns a broadcast receiver instead, which sees
//! every notification as it is emitted (a receiver that falls too far behind
//! gets `Lagged`).
//!
//! # Examples
//!
//! ```rust,no_run
//! use pubsock_client::{Notification, PubSubClient};
//!
//! # async fn example(client: &PubSubClient) {
//! client.on_update(|update| async move {
//!     println!("update: {:?}", update);
//! }).await;
//!
//! let mut events = client.events();
//! while let Ok(event) = events.recv().await {
//!     if let Notification::Close = event {
//!         break;
//!     }
//! }
//! # }
//! ```

use pubsock_core::Error;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};

/// Capacity of the broadcast stream returned by `subscribe`
const STREAM_CAPACITY: usize = 1024;

/// An event reported to the caller
#[derive(Debug, Clone)]
pub enum Notification {
    /// The client connected for the first time
    Open,
    /// An update envelope, verbatim
    Update(Value),
    /// A transport error while connected
    Error(Error),
    /// The client was closed
    Close,
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Open => NotificationKind::Open,
            Notification::Update(_) => NotificationKind::Update,
            Notification::Error(_) => NotificationKind::Error,
            Notification::Close => NotificationKind::Close,
        }
    }
}

/// Discriminant of [`Notification`], used to register callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Open,
    Update,
    Error,
    Close,
}

/// Type for notification handler functions
pub type NotificationFn =
    Arc<dyn Fn(Notification) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Wrap an async closure as a [`NotificationFn`]
pub(crate) fn handler_fn<F, Fut>(handler: F) -> NotificationFn
where
    F: Fn(Notification) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |notification| Box::pin(handler(notification)))
}

type HandlerMap = Arc<Mutex<HashMap<NotificationKind, Vec<NotificationFn>>>>;

/// Registry of notification callbacks plus a broadcast stream
///
/// Clones share the callbacks, the stream and the dispatcher task. The
/// dispatcher exits once every clone is dropped and the queue is drained.
#[derive(Clone)]
pub struct Notifier {
    handlers: HandlerMap,
    stream: broadcast::Sender<Notification>,
    dispatch: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Create a notifier with no callbacks
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        Self::with_handlers(Vec::new())
    }

    /// Create a notifier with callbacks registered up front
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_handlers(handlers: Vec<(NotificationKind, NotificationFn)>) -> Self {
        let mut map: HashMap<NotificationKind, Vec<NotificationFn>> = HashMap::new();
        for (kind, handler) in handlers {
            map.entry(kind).or_default().push(handler);
        }
        let handlers = Arc::new(Mutex::new(map));

        let (stream, _) = broadcast::channel(STREAM_CAPACITY);
        let (dispatch, queue) = mpsc::unbounded_channel();
        tokio::spawn(run_callbacks(Arc::clone(&handlers), queue));

        Self {
            handlers,
            stream,
            dispatch,
        }
    }

    /// Register a callback for one kind of notification
    ///
    /// Callbacks accumulate; registering twice runs both.
    pub async fn register<F, Fut>(&self, kind: NotificationKind, handler: F)
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.handlers
            .lock()
            .await
            .entry(kind)
            .or_default()
            .push(handler_fn(handler));
    }

    /// Receive every notification emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.stream.subscribe()
    }

    /// Deliver a notification to the stream and queue it for the callbacks
    ///
    /// Never waits on a callback.
    pub fn emit(&self, notification: Notification) {
        // No receivers is fine
        let _ = self.stream.send(notification.clone());

        if self.dispatch.send(notification).is_err() {
            tracing::warn!("Notification dispatcher has stopped");
        }
    }

    /// Number of callbacks registered for a kind
    pub async fn handler_count(&self, kind: NotificationKind) -> usize {
        self.handlers.lock().await.get(&kind).map_or(0, Vec::len)
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Run callbacks for queued notifications, in order, until every sender is gone
async fn run_callbacks(handlers: HandlerMap, mut queue: mpsc::UnboundedReceiver<Notification>) {
    while let Some(notification) = queue.recv().await {
        let matching = {
            let handlers = handlers.lock().await;
            handlers.get(&notification.kind()).cloned().unwrap_or_default()
        };

        for handler in matching {
            handler(notification.clone()).await;
        }
    }
}
