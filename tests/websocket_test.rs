// End-to-end tests against an in-process relay bound to an ephemeral port

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};

use p3d_relay::core::RelayServer;
use p3d_relay::handlers::routes;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Start the relay on 127.0.0.1 with an OS-assigned port
fn start_server() -> (SocketAddr, Arc<RelayServer>) {
    let server = Arc::new(RelayServer::new());
    let (addr, serving) = warp::serve(routes(server.clone())).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(serving);
    (addr, server)
}

async fn connect(addr: SocketAddr, path: &str) -> Ws {
    let url = format!("ws://{}{}", addr, path);
    let (ws, _) = tokio::time::timeout(Duration::from_secs(5), connect_async(url))
        .await
        .expect("WebSocket connection timeout")
        .expect("Failed to establish WebSocket connection");
    ws
}

async fn next_json(ws: &mut Ws) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timeout waiting for server message")
            .expect("Connection closed unexpectedly")
            .expect("Error receiving message");

        if msg.is_text() {
            let text = msg.into_text().expect("text payload");
            return serde_json::from_str(&text).expect("server sent invalid JSON");
        }
    }
}

async fn send_json(ws: &mut Ws, value: Value) {
    ws.send(Message::Text(value.to_string()))
        .await
        .expect("Failed to send message");
}

async fn wait_for_count(server: &RelayServer, expected: usize) {
    for _ in 0..100 {
        if server.connection_count().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "connection count stayed at {} instead of {}",
        server.connection_count().await,
        expected
    );
}

#[tokio::test]
async fn test_websocket_session_flow() {
    let (addr, server) = start_server();

    let mut x = connect(addr, "/").await;
    let connected = next_json(&mut x).await;
    assert_eq!(connected["type"], "connected");
    assert_eq!(connected["totalClients"], 1);
    let x_id = connected["clientId"].as_str().unwrap().to_string();

    let mut y = connect(addr, "/ws").await;
    let connected = next_json(&mut y).await;
    assert_eq!(connected["totalClients"], 2);
    let y_id = connected["clientId"].as_str().unwrap().to_string();

    send_json(&mut x, json!({"type": "join", "callsign": "X1", "aircraft": "C172"})).await;
    assert_eq!(next_json(&mut x).await, json!({"type": "player_list", "players": []}));
    assert_eq!(
        next_json(&mut y).await,
        json!({"type": "player_joined", "clientId": x_id, "callsign": "X1", "aircraft": "C172"})
    );

    send_json(&mut y, json!({"type": "join", "callsign": "Y1", "aircraft": "A320"})).await;
    let list = next_json(&mut y).await;
    assert_eq!(list["players"], json!([{"clientId": x_id, "callsign": "X1", "aircraft": "C172"}]));
    assert_eq!(next_json(&mut x).await["clientId"], y_id.as_str());

    // malformed input is ignored and the socket stays usable
    ws_send_raw(&mut y, "this is not json").await;

    send_json(&mut y, json!({"type": "position", "position": {"lat": 1.25, "lon": 2.5}})).await;
    assert_eq!(
        next_json(&mut x).await,
        json!({"type": "position", "clientId": y_id, "callsign": "Y1", "lat": 1.25, "lon": 2.5})
    );

    send_json(&mut x, json!({"type": "chat", "message": "hi"})).await;
    assert_eq!(next_json(&mut x).await["message"], "hi");
    assert_eq!(next_json(&mut y).await["message"], "hi");

    x.close(None).await.expect("close handshake");
    assert_eq!(
        next_json(&mut y).await,
        json!({"type": "player_left", "clientId": x_id, "callsign": "X1"})
    );
    wait_for_count(&server, 1).await;
}

async fn ws_send_raw(ws: &mut Ws, text: &str) {
    ws.send(Message::Text(text.to_string()))
        .await
        .expect("Failed to send raw frame");
}

#[tokio::test]
async fn test_abrupt_disconnect_is_treated_as_close() {
    let (addr, server) = start_server();

    let mut a = connect(addr, "/").await;
    next_json(&mut a).await;
    let mut b = connect(addr, "/").await;
    next_json(&mut b).await;

    // drop without a close handshake
    drop(a);

    let left = next_json(&mut b).await;
    assert_eq!(left["type"], "player_left");
    wait_for_count(&server, 1).await;
}

#[tokio::test]
async fn test_status_endpoints() {
    let (addr, server) = start_server();

    let mut ws = connect(addr, "/").await;
    next_json(&mut ws).await;
    wait_for_count(&server, 1).await;

    let client = reqwest::Client::new();

    let status: Value = client
        .get(format!("http://{}/", addr))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to reach status endpoint")
        .json()
        .await
        .expect("status body should be JSON");
    assert_eq!(status["status"], "running");
    assert_eq!(status["connectedClients"], 1);

    let health = client
        .get(format!("http://{}/health", addr))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to reach health endpoint");
    assert!(health.status().is_success());
    let body: Value = health.json().await.expect("health body should be JSON");
    assert_eq!(body, json!({"status": "ok"}));
}
