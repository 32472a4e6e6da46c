//! Subscription and routing integration tests
//!
//! Registry updates, replay on reconnect and the handling of inbound frames.

mod common;

use common::{
    capture_logs, connected_client, drain, drain_kinds, elapse, mock_response, mock_update,
    settle, MockTransport,
};
use pubsock_client::{ConnectionState, Notification, NotificationKind, PubSubClient};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Level;

fn sorted(mut channels: Vec<String>) -> Vec<String> {
    channels.sort();
    channels
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_while_connected_sends_frames() {
    let transport = MockTransport::new();
    let (client, _events) = connected_client(&transport).await;

    client.subscribe(["a", "b"]).unwrap();
    settle().await;

    assert_eq!(
        transport.latest().sent(),
        vec![
            json!({"op": "subscribe", "channel": "a"}),
            json!({"op": "subscribe", "channel": "b"}),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_before_open_is_replayed() {
    let transport = MockTransport::new();
    let client = PubSubClient::builder("ws://mock.invalid/feed")
        .with_transport(transport.clone())
        .connect()
        .unwrap();

    client.subscribe("x").unwrap();
    client.subscribe(vec!["y".to_string()]).unwrap();
    settle().await;

    let socket = transport.latest();
    assert!(socket.sent().is_empty());

    socket.open();
    settle().await;

    assert_eq!(socket.channels_for("subscribe"), vec!["x", "y"]);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_sends_and_forgets() {
    let transport = MockTransport::new();
    let (client, _events) = connected_client(&transport).await;

    client.subscribe(["a", "b"]).unwrap();
    client.unsubscribe("a").unwrap();
    settle().await;

    let socket = transport.latest();
    assert_eq!(socket.channels_for("unsubscribe"), vec!["a"]);
    assert_eq!(client.subscriptions().await.unwrap(), vec!["b".to_string()]);

    // Unknown channels still produce a frame and leave the registry alone
    client.unsubscribe("never").unwrap();
    settle().await;
    assert_eq!(socket.channels_for("unsubscribe"), vec!["a", "never"]);
    assert_eq!(client.subscriptions().await.unwrap(), vec!["b".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_replay_matches_registry_after_reconnect() {
    let transport = MockTransport::new();
    let (client, mut events) = connected_client(&transport).await;

    client.subscribe(["a", "b"]).unwrap();
    settle().await;

    transport.latest().drop_connection();
    settle().await;
    assert_eq!(client.state(), ConnectionState::Reconnecting);

    // Changes while disconnected are recorded, not sent
    client.subscribe("c").unwrap();
    client.unsubscribe("b").unwrap();
    settle().await;
    assert_eq!(transport.socket(0).channels_for("subscribe"), vec!["a", "b"]);
    assert!(transport.socket(0).channels_for("unsubscribe").is_empty());

    elapse(Duration::from_millis(500)).await;
    let fresh = transport.latest();
    fresh.open();
    settle().await;

    let registry = sorted(client.subscriptions().await.unwrap());
    assert_eq!(registry, vec!["a", "c"]);
    assert_eq!(fresh.channels_for("subscribe"), registry);

    // `open` is reported once per client lifetime
    assert_eq!(drain_kinds(&mut events), vec![NotificationKind::Open]);
}

#[tokio::test(start_paused = true)]
async fn test_updates_delivered_verbatim() {
    let transport = MockTransport::new();
    let (client, mut events) = connected_client(&transport).await;
    drain(&mut events);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client
        .on_update(move |notification| {
            let sink = Arc::clone(&sink);
            async move {
                if let Notification::Update(message) = notification {
                    sink.lock().unwrap().push(message);
                }
            }
        })
        .await;

    let update = mock_update("a", json!({"price": 42}));
    transport.latest().receive(update.clone());
    settle().await;

    assert_eq!(*seen.lock().unwrap(), vec![update.clone()]);
    match drain(&mut events).as_slice() {
        [Notification::Update(message)] => assert_eq!(message, &update),
        other => panic!("Expected one update, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_subscribe_response_is_only_logged() {
    let (logs, _guard) = capture_logs();
    let transport = MockTransport::new();
    let (client, mut events) = connected_client(&transport).await;
    client.subscribe("a").unwrap();
    settle().await;
    drain(&mut events);

    transport.latest().receive(mock_response("subscribe", "a", false));
    settle().await;

    assert_eq!(client.state(), ConnectionState::Connected);
    assert!(drain(&mut events).is_empty());
    // The desired set is unchanged by a refusal
    assert_eq!(client.subscriptions().await.unwrap(), vec!["a".to_string()]);

    let errors = logs.at_level(Level::ERROR);
    assert_eq!(errors.len(), 1, "unexpected error logs: {:?}", errors);
    assert!(errors[0].message.contains("subscribe"));
    assert_eq!(errors[0].field("channel"), Some(r#"Some("a")"#));
    assert!(errors[0].field("response").unwrap().contains("\"success\":false"));
}

#[tokio::test(start_paused = true)]
async fn test_callback_can_query_client() {
    let transport = MockTransport::new();
    let (client, _events) = connected_client(&transport).await;
    client.subscribe("a").unwrap();
    settle().await;

    let (seen_tx, mut seen) = tokio::sync::mpsc::unbounded_channel();
    let inner = client.clone();
    client
        .on_update(move |_| {
            let inner = inner.clone();
            let seen_tx = seen_tx.clone();
            async move {
                if let Ok(channels) = inner.subscriptions().await {
                    let _ = seen_tx.send(channels);
                }
            }
        })
        .await;

    transport.latest().receive(mock_update("a", json!({"price": 1})));
    settle().await;

    let from_callback = tokio::time::timeout(Duration::from_secs(2), seen.recv())
        .await
        .expect("callback never finished");
    assert_eq!(from_callback, Some(vec!["a".to_string()]));

    // The connection task keeps serving commands and frames afterwards
    let channels = tokio::time::timeout(Duration::from_secs(2), client.subscriptions())
        .await
        .expect("connection task stalled")
        .unwrap();
    assert_eq!(channels, vec!["a".to_string()]);

    client.subscribe("b").unwrap();
    settle().await;
    assert_eq!(transport.latest().channels_for("subscribe"), vec!["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn test_other_frames_ignored() {
    let transport = MockTransport::new();
    let (client, mut events) = connected_client(&transport).await;
    drain(&mut events);

    let socket = transport.latest();
    socket.receive(mock_response("subscribe", "a", true));
    socket.receive(mock_response("unsubscribe", "a", true));
    socket.receive(json!({"type": "response", "op": "ping", "success": true}));
    socket.receive(json!({"type": "snapshot", "channel": "a"}));
    socket.receive_raw("not json at all");
    socket.receive_raw("[1, 2, 3]");
    settle().await;

    assert!(drain(&mut events).is_empty());
    assert_eq!(client.state(), ConnectionState::Connected);
}
