//! End-to-end: HTTP ingest to WebSocket subscribers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use chain_relay::broadcast::Broadcaster;
use chain_relay::config::RelayConfig;
use chain_relay::http::HttpServer;
use chain_relay::lifecycle::Shutdown;
use chain_relay::notify::{Listeners, RecordingListener};

mod common;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const API_KEY: &str = "test-admin-key";

struct Relay {
    addr: SocketAddr,
    broadcaster: Broadcaster,
    recorder: Arc<RecordingListener>,
    _shutdown: Shutdown,
}

async fn start_relay() -> Relay {
    start_relay_with(RelayConfig::default()).await
}

async fn start_relay_with(mut config: RelayConfig) -> Relay {
    config.broadcast.interval_ms = 10;
    config.admin.enabled = true;
    config.admin.api_key = API_KEY.into();

    let listeners = Listeners::new();
    let recorder = Arc::new(RecordingListener::new());
    listeners.add(recorder.clone());
    let broadcaster = Broadcaster::new(config.broadcast.clone(), listeners);
    broadcaster.start();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, broadcaster.clone());
    tokio::spawn(server.run(listener, shutdown.subscribe()));

    Relay {
        addr,
        broadcaster,
        recorder,
        _shutdown: shutdown,
    }
}

async fn connect(addr: SocketAddr, query: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws?{query}")).await.unwrap();
    ws
}

/// Next text frame as JSON, skipping control frames.
async fn next_json(ws: &mut Client) -> Value {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for a frame")
}

#[tokio::test]
async fn test_ingested_event_reaches_subscriber() {
    let relay = start_relay().await;
    let mut ws = connect(relay.addr, "client_id=alice&tags=whales").await;

    let hello = next_json(&mut ws).await;
    assert_eq!(hello["type"], "connected");
    assert_eq!(hello["payload"], json!({"clientId": "alice", "tags": ["whales"]}));

    let res = reqwest::Client::new()
        .post(format!("http://{}/events", relay.addr))
        .json(&json!({"signature": "sig1", "transaction": common::system_transfer(5_000_000)}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::ACCEPTED);
    let receipt: Value = res.json().await.unwrap();
    assert_eq!(receipt["event_id"], "sig1:250000000");

    let event = next_json(&mut ws).await;
    assert_eq!(event["type"], "event");
    assert_eq!(event["id"], receipt["broadcast_id"]);
    assert_eq!(event["payload"]["type"], "transfer");
    assert_eq!(event["payload"]["amount"], "5000000");
    assert!(event["payload"]["metadata"]["risk"]["score"].is_number());
}

#[tokio::test]
async fn test_subscription_protocol() {
    let relay = start_relay().await;
    let mut ws = connect(relay.addr, "client_id=bob").await;
    assert_eq!(next_json(&mut ws).await["type"], "connected");

    ws.send(Message::text(r#"{"action":"subscribe","tags":["risk-alerts","nft"]}"#))
        .await
        .unwrap();
    let ack = next_json(&mut ws).await;
    assert_eq!(ack["type"], "subscribed");
    assert_eq!(ack["payload"]["tags"], json!(["nft", "risk-alerts"]));

    ws.send(Message::text(r#"{"action":"unsubscribe","tags":["nft"]}"#))
        .await
        .unwrap();
    assert_eq!(next_json(&mut ws).await["payload"]["tags"], json!(["risk-alerts"]));

    ws.send(Message::text(r#"{"action":"ping"}"#)).await.unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "pong");

    ws.send(Message::text("not json")).await.unwrap();
    let err = next_json(&mut ws).await;
    assert_eq!(err["type"], "error");
    assert!(err["error"].as_str().unwrap().starts_with("invalid message"));

    assert_eq!(
        relay.broadcaster.registry().tags("bob"),
        Some(vec!["risk-alerts".to_string()])
    );
}

#[tokio::test]
async fn test_replaced_connection_cannot_touch_new_entry() {
    let relay = start_relay().await;
    let mut old = connect(relay.addr, "client_id=frank&tags=a").await;
    assert_eq!(next_json(&mut old).await["type"], "connected");
    let mut new = connect(relay.addr, "client_id=frank&tags=b").await;
    assert_eq!(next_json(&mut new).await["type"], "connected");

    old.send(Message::text(r#"{"action":"subscribe","tags":["x"]}"#))
        .await
        .unwrap();
    let ended = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match old.next().await {
                Some(Ok(Message::Text(text))) => panic!("stale connection got {}", text.as_str()),
                Some(Ok(_)) => continue,
                _ => break,
            }
        }
    })
    .await;
    assert!(ended.is_ok());

    new.send(Message::text(r#"{"action":"ping"}"#)).await.unwrap();
    assert_eq!(next_json(&mut new).await["type"], "pong");
    assert_eq!(
        relay.broadcaster.registry().tags("frank"),
        Some(vec!["b".to_string()])
    );
    assert!(relay.broadcaster.registry().contains("frank"));
}

#[tokio::test]
async fn test_disconnect_unregisters_client() {
    let relay = start_relay().await;
    let mut ws = connect(relay.addr, "client_id=carol").await;
    assert_eq!(next_json(&mut ws).await["type"], "connected");
    assert!(relay.broadcaster.registry().contains("carol"));

    ws.close(None).await.unwrap();

    let gone = tokio::time::timeout(Duration::from_secs(2), async {
        while relay.broadcaster.registry().contains("carol") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(gone.is_ok());
    assert_eq!(relay.recorder.count("client_disconnected"), 1);
}

#[tokio::test]
async fn test_admin_requires_token() {
    let relay = start_relay().await;
    let http = reqwest::Client::new();
    let url = format!("http://{}/admin/clients", relay.addr);

    let denied = http.get(&url).send().await.unwrap();
    assert_eq!(denied.status(), reqwest::StatusCode::UNAUTHORIZED);

    let mut ws = connect(relay.addr, "client_id=dave&tags=a").await;
    next_json(&mut ws).await;

    let stats: Value = http
        .get(&url)
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["by_tag"]["a"], 1);
    assert_eq!(stats["clients"][0]["id"], "dave");
}

#[tokio::test]
async fn test_close_sends_going_away() {
    let relay = start_relay().await;
    let mut ws = connect(relay.addr, "client_id=erin").await;
    assert_eq!(next_json(&mut ws).await["type"], "connected");

    relay.broadcaster.close(1001, "server shutting down");

    let frame = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(frame))) => return frame,
                Some(Ok(_)) => continue,
                other => panic!("expected close frame, got {other:?}"),
            }
        }
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(u16::from(frame.code), 1001);
    assert_eq!(frame.reason.as_str(), "server shutting down");
}

#[tokio::test]
async fn test_http_limits_apply_to_routes() {
    let mut config = RelayConfig::default();
    config.server.max_body_size = 1024;
    let relay = start_relay_with(config).await;
    let http = reqwest::Client::new();

    let health = http
        .get(format!("http://{}/health", relay.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), reqwest::StatusCode::OK);

    let oversized = vec![b' '; 4096];
    let rejected = http
        .post(format!("http://{}/events", relay.addr))
        .header("content-type", "application/json")
        .body(oversized)
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(relay.broadcaster.queue_size(), 0);
}
