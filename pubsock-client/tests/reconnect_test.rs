//! Reconnection integration tests
//!
//! Lost and failed connections are retried forever after a fixed delay
//! (500ms by default) until the client is closed.

mod common;

use common::{connected_client, drain_kinds, elapse, settle, MockTransport};
use pubsock_client::{ConnectionState, ExponentialBackoff, NotificationKind, PubSubClient};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_remote_close_schedules_reconnect() {
    let transport = MockTransport::new();
    let (client, mut events) = connected_client(&transport).await;

    transport.latest().drop_connection();
    settle().await;
    assert_eq!(client.state(), ConnectionState::Reconnecting);

    elapse(Duration::from_millis(490)).await;
    assert_eq!(transport.attempts(), 1);

    elapse(Duration::from_millis(20)).await;
    assert_eq!(transport.attempts(), 2);
    assert_eq!(client.state(), ConnectionState::Connecting);

    transport.latest().open();
    settle().await;
    assert_eq!(client.state(), ConnectionState::Connected);

    // Reconnects are silent; only the first open is announced
    assert_eq!(drain_kinds(&mut events), vec![NotificationKind::Open]);
}

#[tokio::test(start_paused = true)]
async fn test_refused_connects_retry_forever() {
    let transport = MockTransport::new();
    transport.refuse_next(3);

    let client = PubSubClient::builder("ws://mock.invalid/feed")
        .with_transport(transport.clone())
        .connect()
        .unwrap();
    settle().await;

    assert_eq!(transport.attempts(), 0);
    assert_eq!(client.state(), ConnectionState::Reconnecting);

    elapse(Duration::from_millis(500)).await;
    elapse(Duration::from_millis(500)).await;
    assert_eq!(transport.attempts(), 0);

    elapse(Duration::from_millis(500)).await;
    assert_eq!(transport.attempts(), 1);
    assert_eq!(client.state(), ConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn test_failed_attempt_before_open_retries() {
    let transport = MockTransport::new();
    let client = PubSubClient::builder("ws://mock.invalid/feed")
        .with_transport(transport.clone())
        .connect()
        .unwrap();
    settle().await;

    // The handshake fails: error then close, without ever opening
    let socket = transport.latest();
    socket.fail("handshake failed");
    socket.drop_connection();
    settle().await;
    assert_eq!(client.state(), ConnectionState::Reconnecting);

    elapse(Duration::from_millis(500)).await;
    assert_eq!(transport.attempts(), 2);

    transport.latest().open();
    settle().await;
    assert!(client.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_close_events_schedule_once() {
    let transport = MockTransport::new();
    let (client, _events) = connected_client(&transport).await;

    let socket = transport.latest();
    socket.drop_connection();
    socket.drop_connection();
    settle().await;

    elapse(Duration::from_secs(2)).await;
    assert_eq!(transport.attempts(), 2);
    assert_eq!(client.state(), ConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn test_custom_strategy() {
    let transport = MockTransport::new();
    transport.refuse_next(2);

    let _client = PubSubClient::builder("ws://mock.invalid/feed")
        .with_transport(transport.clone())
        .with_reconnect(Box::new(ExponentialBackoff::new(
            Duration::from_millis(100),
            Duration::from_secs(5),
        )))
        .connect()
        .unwrap();
    settle().await;

    // Delays of 100ms then 200ms
    elapse(Duration::from_millis(100)).await;
    assert_eq!(transport.attempts(), 0);

    elapse(Duration::from_millis(150)).await;
    assert_eq!(transport.attempts(), 0);

    elapse(Duration::from_millis(60)).await;
    assert_eq!(transport.attempts(), 1);
}
