//! Connection task
//!
//! One task per client owns everything mutable: the connection state, the
//! subscription registry, the heartbeat timers, the current transport handle
//! and the reconnect timer. It consumes two queues:
//!
//! - [`Command`]s from `PubSubClient` handles
//! - [`Input`]s from transports (tagged with their [`Generation`]) and timers
//!   (tagged with their [`TimerId`])
//!
//! Because all mutation happens here, a transition and the timer changes that
//! go with it are applied together; no other code observes a half-updated
//! state. Each connection attempt bumps the generation, and events from any
//! other generation are discarded, so a socket that was given up on can never
//! drive the state machine again.
//!
//! Notifications are queued for the caller, never awaited here, so a callback
//! that calls back into the client cannot stall this task.
//!
//! When every client handle is dropped the command queue closes and the task
//! terminates the transport and exits.

use crate::connection_state::StateTracker;
use crate::heartbeat::HeartbeatMonitor;
use crate::metrics::ClientMetrics;
use crate::notification::{Notification, Notifier};
use crate::reconnect::ReconnectionStrategy;
use crate::router::{self, Routed};
use crate::subscription::SubscriptionRegistry;
use crate::timer::{Scheduler, Timer, TimerId, TimerKind};
use crate::transport::{EventSink, Generation, Transport, TransportEvent, TransportHandle};
use crate::{ClientOptions, ConnectionState};
use pubsock_core::{codec, ChannelRequest, Error, Op};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Requests from client handles
#[derive(Debug)]
pub(crate) enum Command {
    Subscribe(Vec<String>),
    Unsubscribe(Vec<String>),
    Close,
    Subscriptions(oneshot::Sender<Vec<String>>),
}

/// Events from transports and timers
#[derive(Debug)]
pub(crate) enum Input {
    Transport {
        generation: Generation,
        event: TransportEvent,
    },
    Timer {
        kind: TimerKind,
        id: TimerId,
    },
}

pub(crate) struct ConnectionActor {
    url: String,
    transport: Arc<dyn Transport>,
    handle: Option<Box<dyn TransportHandle>>,
    generation: Generation,
    state: StateTracker,
    registry: SubscriptionRegistry,
    heartbeat: HeartbeatMonitor,
    reconnect_timer: Option<Timer>,
    strategy: Box<dyn ReconnectionStrategy>,
    attempt: u32,
    announced_open: bool,
    notifier: Notifier,
    scheduler: Scheduler,
    inputs: mpsc::UnboundedSender<Input>,
    metrics: Option<Arc<ClientMetrics>>,
}

impl ConnectionActor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        url: String,
        options: ClientOptions,
        transport: Arc<dyn Transport>,
        strategy: Box<dyn ReconnectionStrategy>,
        state: StateTracker,
        notifier: Notifier,
        inputs: mpsc::UnboundedSender<Input>,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        Self {
            url,
            transport,
            handle: None,
            generation: Generation::default(),
            state,
            registry: SubscriptionRegistry::new(),
            heartbeat: HeartbeatMonitor::new(options.ping_interval, options.pong_timeout),
            reconnect_timer: None,
            strategy,
            attempt: 0,
            announced_open: false,
            notifier,
            scheduler: Scheduler::new(inputs.clone()),
            inputs,
            metrics,
        }
    }

    /// Connect, then serve commands and events until every client handle is gone
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut inputs: mpsc::UnboundedReceiver<Input>,
    ) {
        self.connect();

        loop {
            tokio::select! {
                biased;

                Some(input) = inputs.recv() => self.handle_input(input),
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }

        self.shutdown();
    }

    fn connect(&mut self) {
        self.generation = self.generation.next();
        self.set_state(ConnectionState::Connecting);

        tracing::info!(url = %self.url, generation = %self.generation, "Connecting to server");

        let sink = EventSink::new(self.generation, self.inputs.clone());
        match self.transport.open(&self.url, sink) {
            Ok(handle) => self.handle = Some(handle),
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "Connection failed");
                self.record_error(&e);
                self.handle = None;
                self.schedule_reconnect();
            }
        }
    }

    fn handle_input(&mut self, input: Input) {
        match input {
            Input::Transport { generation, event } => {
                if generation != self.generation || self.handle.is_none() {
                    tracing::trace!(
                        generation = %generation,
                        current = %self.generation,
                        "Ignoring event from stale transport"
                    );
                    return;
                }
                self.handle_transport_event(event);
            }
            Input::Timer { kind, id } => match kind {
                TimerKind::Probe => self.on_probe_tick(id),
                TimerKind::ProbeDeadline => self.on_probe_deadline(id),
                TimerKind::Reconnect => self.on_reconnect_timer(id),
            },
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.on_opened(),
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Error(error) => self.on_transport_error(error),
            TransportEvent::Closed => self.on_closed(),
            TransportEvent::HeartbeatReply => self.heartbeat.on_reply(),
        }
    }

    fn on_opened(&mut self) {
        match self.state.get() {
            ConnectionState::Connecting => {}
            ConnectionState::Closing => {
                tracing::debug!("Ignoring open while closing");
                return;
            }
            state => {
                tracing::warn!(state = %state, "Ignoring unexpected open event");
                return;
            }
        }

        self.set_state(ConnectionState::Connected);
        self.attempt = 0;
        self.strategy.reset();
        if let Some(ref m) = self.metrics {
            m.record_connection();
        }

        if !self.announced_open {
            self.announced_open = true;
            tracing::info!(url = %self.url, "Websocket connected");
            self.notifier.emit(Notification::Open);
        } else {
            tracing::info!(url = %self.url, "Websocket reconnected");
        }

        let channels = self.registry.channels();
        if !channels.is_empty() {
            tracing::debug!(count = channels.len(), "Replaying subscriptions");
        }
        self.send_requests(Op::Subscribe, &channels);

        // A failed replay has already scheduled a reconnect
        if self.state.get() == ConnectionState::Connected {
            self.heartbeat.start(&mut self.scheduler);
        }
    }

    fn on_message(&mut self, text: &str) {
        match router::route(text) {
            Ok(Routed::Update(message)) => {
                if let Some(ref m) = self.metrics {
                    m.record_update();
                }
                self.notifier.emit(Notification::Update(message));
            }
            Ok(Routed::Rejected(error)) => self.record_error(&error),
            Ok(Routed::Acknowledged { .. } | Routed::UnknownResponse | Routed::Unhandled) => {}
            Err(error) => {
                tracing::warn!(error = %error, frame = %text, "Dropping undecodable frame");
                self.record_error(&error);
            }
        }
    }

    fn on_transport_error(&mut self, error: Error) {
        tracing::error!(error = %error, state = %self.state.get(), "Websocket error");
        self.record_error(&error);

        if self.state.get() == ConnectionState::Connected {
            self.notifier.emit(Notification::Error(error));
        }
    }

    fn on_closed(&mut self) {
        tracing::info!(generation = %self.generation, "Websocket connection closed");

        match self.state.get() {
            ConnectionState::Closing => self.finish_close(),
            ConnectionState::Connecting | ConnectionState::Connected => self.lose_connection(),
            state => tracing::warn!(state = %state, "Ignoring unexpected close event"),
        }
    }

    fn on_probe_tick(&mut self, id: TimerId) {
        if self.state.get() != ConnectionState::Connected || !self.heartbeat.on_tick(id) {
            tracing::trace!("Ignoring stale heartbeat tick");
            return;
        }

        let sent = match self.handle.as_mut() {
            Some(handle) => handle.ping(),
            None => Err(Error::Internal("no transport while connected".into())),
        };

        match sent {
            Ok(()) => self.heartbeat.arm_deadline(&mut self.scheduler),
            Err(e) => self.fail_connection(e),
        }
    }

    fn on_probe_deadline(&mut self, id: TimerId) {
        if !self.heartbeat.on_deadline(id) {
            tracing::trace!("Ignoring stale heartbeat deadline");
            return;
        }

        tracing::warn!(url = %self.url, "Heartbeat reply timed out, terminating connection");
        if let Some(ref m) = self.metrics {
            m.record_heartbeat_timeout();
        }
        if let Some(handle) = self.handle.as_mut() {
            handle.terminate();
        }
        self.lose_connection();
    }

    fn on_reconnect_timer(&mut self, id: TimerId) {
        if !matches!(&self.reconnect_timer, Some(timer) if timer.id() == id) {
            tracing::trace!("Ignoring stale reconnect timer");
            return;
        }
        self.reconnect_timer = None;

        if self.state.get() != ConnectionState::Reconnecting {
            return;
        }

        tracing::info!(url = %self.url, attempt = self.attempt, "Reconnecting to server");
        self.connect();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Subscribe(channels) => {
                let added = self.registry.add(&channels);
                tracing::debug!(requested = channels.len(), added, "Subscribe");
                if self.state.get() == ConnectionState::Connected {
                    self.send_requests(Op::Subscribe, &channels);
                }
            }
            Command::Unsubscribe(channels) => {
                let removed = self.registry.remove(&channels);
                tracing::debug!(requested = channels.len(), removed, "Unsubscribe");
                if self.state.get() == ConnectionState::Connected {
                    self.send_requests(Op::Unsubscribe, &channels);
                }
            }
            Command::Close => self.close(),
            Command::Subscriptions(reply) => {
                let _ = reply.send(self.registry.channels());
            }
        }
    }

    fn close(&mut self) {
        match self.state.get() {
            ConnectionState::Connecting | ConnectionState::Connected => {
                tracing::info!(url = %self.url, "Closing connection");
                self.set_state(ConnectionState::Closing);
                self.heartbeat.stop();
                self.reconnect_timer = None;

                match self.handle.as_mut() {
                    Some(handle) => handle.close(),
                    None => self.finish_close(),
                }
            }
            ConnectionState::Reconnecting => {
                // No socket to wait for
                tracing::info!(url = %self.url, "Closing while waiting to reconnect");
                self.set_state(ConnectionState::Closing);
                self.reconnect_timer = None;
                self.heartbeat.stop();
                self.finish_close();
            }
            state => tracing::debug!(state = %state, "Ignoring close"),
        }
    }

    fn finish_close(&mut self) {
        self.handle = None;
        self.set_state(ConnectionState::Initial);
        tracing::info!(url = %self.url, "Connection closed");
        self.notifier.emit(Notification::Close);
    }

    /// Give up on the current socket after a send failure
    fn fail_connection(&mut self, error: Error) {
        tracing::warn!(error = %error, "Send failed, dropping connection");
        self.record_error(&error);
        if let Some(handle) = self.handle.as_mut() {
            handle.terminate();
        }
        self.lose_connection();
    }

    fn lose_connection(&mut self) {
        self.heartbeat.stop();
        self.handle = None;
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.state.get() == ConnectionState::Closing {
            return;
        }

        let delay = self.strategy.next_delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.set_state(ConnectionState::Reconnecting);

        if let Some(ref m) = self.metrics {
            m.record_reconnection_attempt();
        }
        tracing::info!(
            delay_ms = delay.as_millis() as u64,
            attempt = self.attempt,
            "Scheduling reconnect"
        );

        self.reconnect_timer = Some(self.scheduler.once(delay, TimerKind::Reconnect));
    }

    fn send_requests(&mut self, op: Op, channels: &[String]) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };

        let mut failure = None;
        for channel in channels {
            let sent = codec::encode_request(&ChannelRequest::new(op, channel.as_str()))
                .and_then(|frame| handle.send(frame));

            match sent {
                Ok(()) => {
                    tracing::trace!(op = %op, channel = %channel, "Frame sent");
                    if let Some(ref m) = self.metrics {
                        m.record_frame_sent(op);
                    }
                }
                Err(e @ Error::Transport(_)) => {
                    failure = Some(e);
                    break;
                }
                Err(e) => tracing::error!(op = %op, channel = %channel, error = %e, "Failed to encode frame"),
            }
        }

        if let Some(error) = failure {
            self.fail_connection(error);
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state.set(state);
        if let Some(ref m) = self.metrics {
            m.update_connection_state(state);
        }
    }

    fn record_error(&self, error: &Error) {
        if let Some(ref m) = self.metrics {
            let kind = match error {
                Error::Transport(_) => "transport",
                Error::Decode(_) => "decode",
                Error::Protocol { .. } => "protocol",
                _ => "internal",
            };
            m.record_error(kind);
        }
    }

    fn shutdown(&mut self) {
        tracing::debug!(url = %self.url, "All client handles dropped, shutting down");
        self.heartbeat.stop();
        self.reconnect_timer = None;
        if let Some(mut handle) = self.handle.take() {
            handle.terminate();
        }
    }
}
