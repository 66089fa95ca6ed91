//! Integration tests for the reconnecting socket.
//!
//! These spin up a real WebSocket listener so the dial loop, backoff
//! path, and heartbeat stall detection are exercised over an actual
//! network connection, not mocks.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use tilebridge_transport::{
    HeartbeatConfig, LinkState, ReconnectingSocket, SocketConfig, SocketEvent,
};

type ServerWs = WebSocketStream<tokio::net::TcpStream>;

/// Binds a listener on a random port and hands every accepted
/// WebSocket to the test through a channel.
async fn spawn_server() -> (String, mpsc::UnboundedReceiver<ServerWs>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = listener.local_addr().expect("should have local addr");
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                if tx.send(ws).is_err() {
                    break;
                }
            }
        }
    });

    (format!("ws://{addr}"), rx)
}

async fn next_event(
    rx: &mut mpsc::UnboundedReceiver<SocketEvent>,
) -> SocketEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event should arrive in time")
        .expect("event channel should stay open")
}

fn fast_config(endpoint: &str) -> SocketConfig {
    SocketConfig::new(endpoint)
        .with_intervals(vec![Duration::from_millis(100)])
}

#[tokio::test]
async fn test_connects_and_exchanges_frames() {
    let (endpoint, mut accepted) = spawn_server().await;
    let (socket, mut events) =
        ReconnectingSocket::connect("test", fast_config(&endpoint));

    assert!(matches!(next_event(&mut events).await, SocketEvent::Open));
    let mut server_ws = accepted.recv().await.expect("server side accepted");

    // Server → client.
    server_ws
        .send(Message::Text("hello".into()))
        .await
        .expect("server send");
    match next_event(&mut events).await {
        SocketEvent::Text(text) => assert_eq!(text, "hello"),
        other => panic!("expected text frame, got {other:?}"),
    }

    // Client → server.
    assert!(socket.send("world"));
    let msg = server_ws.next().await.expect("frame").expect("no error");
    assert_eq!(msg, Message::Text("world".into()));

    assert_eq!(socket.state(), LinkState::Connected);
    socket.close();
}

#[tokio::test]
async fn test_reconnects_after_server_drop() {
    let (endpoint, mut accepted) = spawn_server().await;
    let (socket, mut events) =
        ReconnectingSocket::connect("test", fast_config(&endpoint));

    assert!(matches!(next_event(&mut events).await, SocketEvent::Open));
    let server_ws = accepted.recv().await.expect("first accept");

    // Server kills the connection.
    drop(server_ws);

    assert!(matches!(next_event(&mut events).await, SocketEvent::Closed));

    // The backoff schedule (100ms) brings the socket back.
    assert!(matches!(next_event(&mut events).await, SocketEvent::Open));
    assert!(accepted.recv().await.is_some(), "second accept");
    assert_eq!(socket.retries(), 0, "retry counter resets on open");

    socket.close();
}

#[tokio::test]
async fn test_close_suppresses_reconnection() {
    let (endpoint, mut accepted) = spawn_server().await;
    let (socket, mut events) =
        ReconnectingSocket::connect("test", fast_config(&endpoint));

    assert!(matches!(next_event(&mut events).await, SocketEvent::Open));
    let _server_ws = accepted.recv().await.expect("accept");

    socket.close();
    assert!(matches!(next_event(&mut events).await, SocketEvent::Closed));
    assert_eq!(socket.state(), LinkState::Closed);

    // No reconnect should happen: the server sees no new connection
    // within several backoff periods.
    let res = tokio::time::timeout(
        Duration::from_millis(400),
        accepted.recv(),
    )
    .await;
    assert!(res.is_err(), "closed socket must not dial again");
}

#[tokio::test]
async fn test_send_while_disconnected_fails_silently() {
    // Nothing is listening on this port.
    let config = SocketConfig::new("ws://127.0.0.1:9")
        .with_intervals(vec![Duration::from_secs(60)]);
    let (socket, _events) = ReconnectingSocket::connect("test", config);

    assert!(!socket.send("into the void"));
    assert!(!socket.is_connected());
    socket.close();
}

#[tokio::test]
async fn test_heartbeat_stall_drops_connection() {
    let (endpoint, mut accepted) = spawn_server().await;
    let config = fast_config(&endpoint).with_heartbeat(HeartbeatConfig {
        interval: Duration::from_millis(100),
        start_jitter: Duration::ZERO,
    });
    let (socket, mut events) = ReconnectingSocket::connect("test", config);

    assert!(matches!(next_event(&mut events).await, SocketEvent::Open));
    let _server_ws = accepted.recv().await.expect("accept");

    // First tick arms the slot; nobody acknowledges, so the second
    // tick declares the connection stalled and drops it.
    assert!(matches!(
        next_event(&mut events).await,
        SocketEvent::HeartbeatDue(_)
    ));
    assert!(matches!(next_event(&mut events).await, SocketEvent::Closed));

    socket.close();
}

#[tokio::test]
async fn test_acknowledged_heartbeats_keep_connection_alive() {
    let (endpoint, mut accepted) = spawn_server().await;
    let config = fast_config(&endpoint).with_heartbeat(HeartbeatConfig {
        interval: Duration::from_millis(100),
        start_jitter: Duration::ZERO,
    });
    let (socket, mut events) = ReconnectingSocket::connect("test", config);

    assert!(matches!(next_event(&mut events).await, SocketEvent::Open));
    let _server_ws = accepted.recv().await.expect("accept");

    // Acknowledge every beat the way the session would after seeing
    // the peer's echo; the connection must survive several intervals.
    let deadline = tokio::time::Instant::now() + Duration::from_millis(350);
    while tokio::time::Instant::now() < deadline {
        let waited = tokio::time::timeout_at(deadline, events.recv()).await;
        match waited {
            Ok(Some(SocketEvent::HeartbeatDue(ts))) => {
                socket.acknowledge_heartbeat(ts);
            }
            Ok(Some(SocketEvent::Closed)) => {
                panic!("acknowledged heartbeat must not stall the socket")
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }

    assert!(socket.is_connected());
    socket.close();
}
