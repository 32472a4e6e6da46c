//! Pub/sub client over a self-healing WebSocket
//!
//! `PubSubClient` is a handle on a background connection task. Creating one
//! starts connecting immediately; from then on the task keeps the connection
//! alive on its own until [`PubSubClient::close`] is called.
//!
//! # Client Lifecycle
//!
//! 1. **Connect**: the first transport is opened in the background
//! 2. **Use**: subscribe and unsubscribe at any time, connected or not
//! 3. **Heal**: lost connections are reopened after the reconnect delay and
//!    every registered subscription is replayed
//! 4. **Close**: an explicit close is terminal; no reconnect follows
//!
//! # Cloning
//!
//! `PubSubClient` is cheap to clone. All clones drive the same connection.
//! When the last clone is dropped the connection task terminates the socket
//! and exits.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pubsock_client::{ClientOptions, ConnectionState, PubSubClient};
//!
//! # async fn example() -> pubsock_core::Result<()> {
//! let client = PubSubClient::new("wss://feed.example.com/ws", ClientOptions::default())?;
//!
//! client.on_update(|update| async move {
//!     println!("{:?}", update);
//! }).await;
//!
//! client.subscribe(["trades", "quotes"])?;
//! client.wait_for_state(ConnectionState::Connected).await?;
//!
//! client.unsubscribe("quotes")?;
//! client.close()?;
//! # Ok(())
//! # }
//! ```

use crate::connection::Command;
use crate::notification::{Notification, NotificationKind, Notifier};
use crate::subscription::IntoChannels;
use crate::{ClientBuilder, ClientOptions, ConnectionState};
use pubsock_core::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Pub/sub client handle
#[derive(Clone)]
pub struct PubSubClient {
    url: Arc<str>,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    notifier: Notifier,
}

impl PubSubClient {
    /// Create a client for `url` and start connecting
    ///
    /// Must be called from within a tokio runtime. Fails only when the
    /// options are invalid; connection problems are retried in the background.
    pub fn new(url: impl Into<String>, options: ClientOptions) -> Result<Self> {
        ClientBuilder::new(url).options(options).connect()
    }

    /// Start configuring a client
    pub fn builder(url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(url)
    }

    pub(crate) fn from_parts(
        url: String,
        commands: mpsc::UnboundedSender<Command>,
        state: watch::Receiver<ConnectionState>,
        notifier: Notifier,
    ) -> Self {
        Self {
            url: url.into(),
            commands,
            state,
            notifier,
        }
    }

    /// The server URL this client connects to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Check if the client is currently connected
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Wait until the connection reaches `target`
    ///
    /// Returns immediately if it is already there. Fails with
    /// `Error::ClientShutdown` if the connection task exits first.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<()> {
        let mut state = self.state.clone();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| Error::ClientShutdown)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::ClientShutdown)
    }

    /// Subscribe to one or more channels
    ///
    /// The channels are remembered and resubscribed after every reconnect.
    /// If currently connected, one subscribe frame per channel is sent now.
    pub fn subscribe(&self, channels: impl IntoChannels) -> Result<()> {
        self.send(Command::Subscribe(channels.into_channels()))
    }

    /// Unsubscribe from one or more channels
    ///
    /// The channels are forgotten. If currently connected, one unsubscribe
    /// frame per channel is sent now.
    pub fn unsubscribe(&self, channels: impl IntoChannels) -> Result<()> {
        self.send(Command::Unsubscribe(channels.into_channels()))
    }

    /// Close the connection for good
    ///
    /// Heartbeat and pending reconnects are cancelled and a `Close`
    /// notification follows once the socket is gone. Closing an already
    /// closed client does nothing.
    pub fn close(&self) -> Result<()> {
        tracing::debug!(url = %self.url, "Close requested");
        self.send(Command::Close)
    }

    /// Snapshot of the channels currently registered
    pub async fn subscriptions(&self) -> Result<Vec<String>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Subscriptions(tx))?;
        rx.await.map_err(|_| Error::ClientShutdown)
    }

    /// Stream of every notification emitted from now on
    pub fn events(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Register a callback for the first successful connection
    ///
    /// Registered after the client starts, so it can miss an `open` that has
    /// already happened; use [`ClientBuilder::on_open`] to be sure.
    pub async fn on_open<F, Fut>(&self, handler: F)
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.notifier.register(NotificationKind::Open, handler).await;
    }

    /// Register a callback for update envelopes
    pub async fn on_update<F, Fut>(&self, handler: F)
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.notifier.register(NotificationKind::Update, handler).await;
    }

    /// Register a callback for transport errors while connected
    pub async fn on_error<F, Fut>(&self, handler: F)
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.notifier.register(NotificationKind::Error, handler).await;
    }

    /// Register a callback for a completed close
    pub async fn on_close<F, Fut>(&self, handler: F)
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.notifier.register(NotificationKind::Close, handler).await;
    }
}

impl std::fmt::Debug for PubSubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubClient")
            .field("url", &self.url)
            .field("state", &self.state())
            .finish()
    }
}
