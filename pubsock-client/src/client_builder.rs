//! Client builder for timing, reconnection and observability options
//!
//! The `ClientBuilder` provides a fluent API for configuring a client before
//! it starts connecting. It allows you to:
//! - Override the heartbeat and reconnect timings
//! - Swap the fixed reconnect delay for another strategy
//! - Register notification callbacks that see the very first `open`
//! - Configure observability (OpenTelemetry)
//! - Plug in a different transport
//!
//! # Examples
//!
//! ```rust,no_run
//! use pubsock_client::{ClientBuilder, ExponentialBackoff};
//! use std::time::Duration;
//!
//! # async fn example() -> pubsock_core::Result<()> {
//! // Faster heartbeat, backoff instead of a fixed delay
//! let client = ClientBuilder::new("wss://feed.example.com/ws")
//!     .ping_interval(Duration::from_secs(5))
//!     .pong_timeout(Duration::from_millis(500))
//!     .with_reconnect(Box::new(ExponentialBackoff::default()))
//!     .on_open(|_| async { println!("connected") })
//!     .connect()?;
//!
//! // With observability
//! let client2 = ClientBuilder::new("wss://feed.example.com/ws")
//!     .with_default_observability()
//!     .service_name("ticker-feed")
//!     .connect()?;
//! # Ok(())
//! # }
//! ```

use crate::connection::ConnectionActor;
use crate::connection_state::StateTracker;
use crate::notification::{handler_fn, Notification, NotificationFn, NotificationKind, Notifier};
use crate::reconnect::{FixedDelay, ReconnectionStrategy};
use crate::transport::Transport;
use crate::{ClientMetrics, ClientOptions, PubSubClient, WsTransport};
use pubsock_core::{Error, ObservabilityConfig, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Builder for configuring and creating a PubSubClient
pub struct ClientBuilder {
    url: String,
    options: ClientOptions,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    transport: Option<Arc<dyn Transport>>,
    handlers: Vec<(NotificationKind, NotificationFn)>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
    enable_metrics: bool,
}

impl ClientBuilder {
    /// Create a new client builder with default options
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: ClientOptions::default(),
            reconnect_strategy: None,
            transport: None,
            handlers: Vec::new(),
            observability_config: None,
            service_name: None,
            enable_metrics: false,
        }
    }

    /// Replace all timing options at once
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Period between liveness probes
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.options.ping_interval = interval;
        self
    }

    /// Deadline for a probe reply
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.options.pong_timeout = timeout;
        self
    }

    /// Fixed delay before each reconnect attempt
    pub fn reconnect_timeout(mut self, timeout: Duration) -> Self {
        self.options.reconnect_timeout = timeout;
        self
    }

    /// Use a custom reconnection strategy instead of the fixed delay
    pub fn with_reconnect(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.reconnect_strategy = Some(strategy);
        self
    }

    /// Use a custom transport instead of [`WsTransport`]
    pub fn with_transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    fn on<F, Fut>(mut self, kind: NotificationKind, handler: F) -> Self
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.handlers.push((kind, handler_fn(handler)));
        self
    }

    /// Callback for the first successful connection
    pub fn on_open<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(NotificationKind::Open, handler)
    }

    /// Callback for update envelopes
    pub fn on_update<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(NotificationKind::Update, handler)
    }

    /// Callback for transport errors while connected
    pub fn on_error<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(NotificationKind::Error, handler)
    }

    /// Callback for a completed close
    pub fn on_close<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(NotificationKind::Close, handler)
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Record client metrics against the global meter provider
    ///
    /// Implied by `with_observability`. Use this when the application sets up
    /// OpenTelemetry itself.
    pub fn with_metrics(mut self) -> Self {
        self.enable_metrics = true;
        self
    }

    /// Build the client and start connecting in the background
    ///
    /// Returns as soon as the connection task is spawned; use
    /// [`PubSubClient::wait_for_state`] or an `on_open` callback to know when
    /// the connection is up. Must be called from within a tokio runtime.
    pub fn connect(self) -> Result<PubSubClient> {
        self.options.validate()?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Internal(format!("No tokio runtime: {}", e)))?;

        // Initialize observability if configured
        let metrics = if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }

            pubsock_core::init_observability(config.clone())
                .map_err(|e| Error::Internal(format!("Failed to initialize observability: {}", e)))?;

            Some(Arc::new(ClientMetrics::new(config.service_name)))
        } else if self.enable_metrics {
            let name = self.service_name.unwrap_or_else(|| "pubsock".to_string());
            Some(Arc::new(ClientMetrics::new(name)))
        } else {
            None
        };

        let strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Box::new(FixedDelay::new(self.options.reconnect_timeout)));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WsTransport::new()));

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (state, state_rx) = StateTracker::new();
        let notifier = Notifier::with_handlers(self.handlers);

        let actor = ConnectionActor::new(
            self.url.clone(),
            self.options,
            transport,
            strategy,
            state,
            notifier.clone(),
            input_tx,
            metrics,
        );
        runtime.spawn(actor.run(command_rx, input_rx));

        Ok(PubSubClient::from_parts(self.url, command_tx, state_rx, notifier))
    }
}
