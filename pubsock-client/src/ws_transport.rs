//! WebSocket transport built on tokio-tungstenite
//!
//! Each call to `open` spawns a socket task that connects, then pumps frames
//! in both directions until the socket ends. The returned handle talks to the
//! task over a command channel, so sending never blocks the connection task.
//!
//! Frame mapping:
//!
//! - `Text` frames are reported as messages; `Binary` frames are ignored
//! - `Pong` frames are reported as heartbeat replies
//! - incoming `Ping` frames are answered by tungstenite itself
//!
//! A graceful close waits for the peer to finish the close handshake, but no
//! longer than the close timeout (30 seconds by default); after that the
//! socket is dropped and reported closed anyway.
//!
//! Dropping the handle without closing it drops the socket silently.

use crate::transport::{EventSink, Transport, TransportHandle};
use futures::{SinkExt, StreamExt};
use pubsock_core::{Error, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// How long a graceful close may wait for the peer's close frame
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default transport: a real WebSocket connection
#[derive(Debug, Clone)]
pub struct WsTransport {
    close_timeout: Duration,
}

impl WsTransport {
    pub fn new() -> Self {
        Self {
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Limit how long `close` waits for the close handshake
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WsTransport {
    fn open(&self, url: &str, events: EventSink) -> Result<Box<dyn TransportHandle>> {
        let request = url
            .into_client_request()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(request, rx, events, self.close_timeout));

        Ok(Box::new(WsHandle { commands }))
    }
}

#[derive(Debug)]
enum SocketCommand {
    Send(String),
    Ping,
    Close,
    Terminate,
}

struct WsHandle {
    commands: mpsc::UnboundedSender<SocketCommand>,
}

impl WsHandle {
    fn command(&self, command: SocketCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::Transport("socket is closed".to_string()))
    }
}

impl TransportHandle for WsHandle {
    fn send(&mut self, text: String) -> Result<()> {
        self.command(SocketCommand::Send(text))
    }

    fn ping(&mut self) -> Result<()> {
        self.command(SocketCommand::Ping)
    }

    fn close(&mut self) {
        let _ = self.command(SocketCommand::Close);
    }

    fn terminate(&mut self) {
        let _ = self.command(SocketCommand::Terminate);
    }
}

async fn run_socket(
    request: Request,
    mut commands: mpsc::UnboundedReceiver<SocketCommand>,
    events: EventSink,
    close_timeout: Duration,
) {
    let connect = connect_async(request);
    tokio::pin!(connect);

    let stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((stream, _)) => break stream,
                Err(e) => {
                    events.error(Error::Transport(e.to_string()));
                    events.closed();
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(SocketCommand::Close) | Some(SocketCommand::Terminate) => {
                    tracing::debug!("Connect aborted");
                    events.closed();
                    return;
                }
                Some(command) => {
                    tracing::debug!(command = ?command, "Dropping command sent before open");
                }
                None => return,
            },
        }
    };

    events.opened();
    let (mut write, mut read) = stream.split();
    let mut closing = false;
    let close_deadline = tokio::time::sleep(close_timeout);
    tokio::pin!(close_deadline);

    loop {
        tokio::select! {
            _ = &mut close_deadline, if closing => {
                tracing::warn!(
                    timeout_ms = close_timeout.as_millis() as u64,
                    "Close handshake timed out, dropping socket"
                );
                break;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    events.message(text);
                }
                Some(Ok(Message::Pong(_))) => {
                    events.heartbeat_reply();
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(frame = ?frame, "Close frame received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    events.error(Error::Transport(e.to_string()));
                    break;
                }
                None => break,
            },
            command = commands.recv() => {
                let result = match command {
                    Some(SocketCommand::Send(text)) => write.send(Message::Text(text)).await,
                    Some(SocketCommand::Ping) => write.send(Message::Ping(Vec::new())).await,
                    Some(SocketCommand::Close) if !closing => {
                        closing = true;
                        close_deadline.as_mut().reset(Instant::now() + close_timeout);
                        write.send(Message::Close(None)).await
                    }
                    Some(SocketCommand::Close) => Ok(()),
                    Some(SocketCommand::Terminate) => break,
                    None => return,
                };

                if let Err(e) = result {
                    events.error(Error::Transport(e.to_string()));
                    break;
                }
            }
        }
    }

    events.closed();
}
