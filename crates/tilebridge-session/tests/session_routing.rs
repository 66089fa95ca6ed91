//! Integration tests for the bot session: packet routing between a
//! scripted game server and a scripted agent, both real WebSocket
//! listeners.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use tilebridge_session::{BotConfig, BotHandle, DisplayStatus};
use tilebridge_transport::HeartbeatConfig;

type PeerWs = WebSocketStream<tokio::net::TcpStream>;

/// Binds a listener and hands every accepted WebSocket to the test.
async fn spawn_peer() -> (String, mpsc::UnboundedReceiver<PeerWs>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = listener.local_addr().expect("local addr");
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

fn trace_dir(test: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "tilebridge-session-{}-{test}",
        std::process::id()
    ))
}

fn test_config(server: &str, agent: &str, test: &str) -> BotConfig {
    BotConfig {
        name: format!("bot-{test}"),
        username: "bot".into(),
        password: "pw".into(),
        server_endpoint: server.to_owned(),
        agent_endpoint: agent.to_owned(),
        reconnect_intervals: vec![Duration::from_millis(100)],
        heartbeat: HeartbeatConfig {
            interval: Duration::from_secs(60),
            start_jitter: Duration::ZERO,
        },
        settle_interval: Duration::from_millis(100),
        response_delay: Duration::ZERO,
        trace_dir: trace_dir(test),
    }
}

async fn recv_json(ws: &mut PeerWs) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("frame should arrive")
        .expect("stream open")
        .expect("no error");
    serde_json::from_str(msg.to_text().expect("text frame")).expect("json")
}

async fn send_json(ws: &mut PeerWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("peer send");
}

/// No data frame may arrive within the window.
async fn expect_silence(ws: &mut PeerWs, window: Duration) {
    let res = tokio::time::timeout(window, ws.next()).await;
    if let Ok(Some(Ok(msg))) = &res {
        assert!(
            !msg.is_text() && !msg.is_binary(),
            "unexpected frame: {msg:?}"
        );
    }
}

async fn wait_for_status(handle: &BotHandle, expected: DisplayStatus) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = handle.status().await;
        if status == expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "status stuck at {status:?}, wanted {expected:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

struct Peers {
    handle: BotHandle,
    server: PeerWs,
    agent: PeerWs,
    server_accepts: mpsc::UnboundedReceiver<PeerWs>,
    agent_accepts: mpsc::UnboundedReceiver<PeerWs>,
}

/// Spawns a session against scripted peers and consumes the login
/// challenge request the session sends on open.
async fn connect_session(test: &str) -> Peers {
    let (server_endpoint, mut server_accepts) = spawn_peer().await;
    let (agent_endpoint, mut agent_accepts) = spawn_peer().await;

    tokio::fs::create_dir_all(trace_dir(test))
        .await
        .expect("trace dir");

    let handle =
        BotHandle::spawn(test_config(&server_endpoint, &agent_endpoint, test));

    let mut server = server_accepts.recv().await.expect("server accept");
    let agent = agent_accepts.recv().await.expect("agent accept");

    let challenge_req = recv_json(&mut server).await;
    assert_eq!(challenge_req["m"], 1);
    assert_eq!(challenge_req["r"], 10);

    wait_for_status(&handle, DisplayStatus::Idle).await;

    Peers {
        handle,
        server,
        agent,
        server_accepts,
        agent_accepts,
    }
}

async fn cleanup(test: &str) {
    let _ = tokio::fs::remove_dir_all(trace_dir(test)).await;
}

#[tokio::test]
async fn test_login_challenge_is_solved_and_answered() {
    let mut peers = connect_session("login").await;

    send_json(&mut peers.server, json!({"m": 1, "r": 10, "z": "1231231239"}))
        .await;

    let login = recv_json(&mut peers.server).await;
    assert_eq!(login["r"], 9);
    assert_eq!(login["u"], "bot");
    assert_eq!(login["p"], "pw");
    assert_eq!(login["z"], "1231231239");
    assert_eq!(login["s"], "9");

    // After the settle pause the session asks for the room list.
    let list_req = recv_json(&mut peers.server).await;
    assert_eq!(list_req["r"], 2);

    peers.handle.shutdown().await;
    cleanup("login").await;
}

#[tokio::test]
async fn test_join_succeeds_when_seat_push_confirms() {
    let mut peers = connect_session("join-ok").await;

    let handle = peers.handle.clone();
    let join = tokio::spawn(async move { handle.join(42, 2, None).await });

    let join_req = recv_json(&mut peers.server).await;
    assert_eq!(join_req["m"], 1);
    assert_eq!(join_req["r"], 4);
    assert_eq!(join_req["v"], 42);
    assert_eq!(join_req["s"], 2);
    assert!(join_req.get("p").is_none());

    // The seat push lands within the settle pause.
    send_json(
        &mut peers.server,
        json!({"m": 1, "r": 8, "t": {"i": 42, "s": 2, "n": "bot", "v": 0}}),
    )
    .await;

    assert!(join.await.expect("join task"), "join should be confirmed");

    let ready = recv_json(&mut peers.server).await;
    assert_eq!(ready["r"], 6);
    assert_eq!(ready["v"], 1);

    wait_for_status(&peers.handle, DisplayStatus::Waiting).await;

    // Exit returns the session to idle unconditionally.
    let handle = peers.handle.clone();
    let exit = tokio::spawn(async move { handle.exit().await });
    let exit_req = recv_json(&mut peers.server).await;
    assert_eq!(exit_req["r"], 5);
    exit.await.expect("exit task");
    wait_for_status(&peers.handle, DisplayStatus::Idle).await;

    peers.handle.shutdown().await;
    cleanup("join-ok").await;
}

#[tokio::test]
async fn test_join_reverts_to_idle_when_unconfirmed() {
    let mut peers = connect_session("join-fail").await;

    let handle = peers.handle.clone();
    let join =
        tokio::spawn(async move { handle.join(42, 2, Some("pw".into())).await });

    let join_req = recv_json(&mut peers.server).await;
    assert_eq!(join_req["p"], "pw");

    // The server stays silent; the settle pause elapses unconfirmed.
    assert!(!join.await.expect("join task"));
    wait_for_status(&peers.handle, DisplayStatus::Idle).await;

    // No ready confirmation may have been sent.
    expect_silence(&mut peers.server, Duration::from_millis(200)).await;

    peers.handle.shutdown().await;
    cleanup("join-fail").await;
}

#[tokio::test]
async fn test_not_ready_gameplay_never_reaches_agent() {
    let mut peers = connect_session("not-ready").await;

    // An option prompt while the agent was never readied: the session
    // declines on its own.
    send_json(&mut peers.server, json!({"m": 2, "r": 9, "tt": 1})).await;
    let decline = recv_json(&mut peers.server).await;
    assert_eq!(decline["m"], 2);
    assert_eq!(decline["r"], 9);
    assert_eq!(decline["v"], 0);

    expect_silence(&mut peers.agent, Duration::from_millis(200)).await;

    peers.handle.shutdown().await;
    cleanup("not-ready").await;
}

#[tokio::test]
async fn test_not_ready_draw_is_auto_discarded() {
    let mut peers = connect_session("auto-discard").await;

    // Ready the session once so it learns its in-game seat.
    send_json(&mut peers.server, json!({"m": 2, "r": 14, "v": 2})).await;
    let assignment = recv_json(&mut peers.agent).await;
    assert_eq!(assignment["r"], 14);

    // The agent restarts: ready drops, the seat is remembered.
    drop(peers.agent);
    let mut agent2 = peers.agent_accepts.recv().await.expect("agent re-accept");
    // Mid-game with an unready agent reads as killed.
    wait_for_status(&peers.handle, DisplayStatus::Killed).await;

    // The bot's own draw is answered with a bare discard of the drawn
    // tile; the unready agent hears nothing.
    send_json(
        &mut peers.server,
        json!({"m": 2, "r": 6, "v": 2, "t": 0x0142}),
    )
    .await;
    let discard = recv_json(&mut peers.server).await;
    assert_eq!(discard["m"], 2);
    assert_eq!(discard["r"], 2);
    assert_eq!(discard["v"], 0x42);

    expect_silence(&mut agent2, Duration::from_millis(200)).await;

    peers.handle.shutdown().await;
    cleanup("auto-discard").await;
}

#[tokio::test]
async fn test_ready_gameplay_is_forwarded_with_timestamp() {
    let mut peers = connect_session("forward").await;

    send_json(&mut peers.server, json!({"m": 2, "r": 14, "v": 0})).await;
    let assignment = recv_json(&mut peers.agent).await;
    assert_eq!(assignment["r"], 14);
    assert!(assignment.get("_ts").is_some(), "assignment is stamped");

    send_json(&mut peers.server, json!({"m": 2, "r": 2, "v": 7})).await;
    let forwarded = recv_json(&mut peers.agent).await;
    assert_eq!(forwarded["m"], 2);
    assert_eq!(forwarded["r"], 2);
    assert_eq!(forwarded["v"], 7);
    assert!(forwarded.get("_ts").is_some(), "discards are stamped");

    wait_for_status(&peers.handle, DisplayStatus::Playing).await;

    peers.handle.shutdown().await;
    cleanup("forward").await;
}

#[tokio::test]
async fn test_agent_error_never_reaches_server() {
    let mut peers = connect_session("agent-error").await;

    send_json(&mut peers.agent, json!({"_meta": {"t": "error"}})).await;

    wait_for_status(&peers.handle, DisplayStatus::Killed).await;
    expect_silence(&mut peers.server, Duration::from_millis(200)).await;

    // A well-formed decision clears the killed marker.
    send_json(
        &mut peers.agent,
        json!({"m": 2, "r": 9, "v": 0, "_meta": {"d": false}}),
    )
    .await;
    let forwarded = recv_json(&mut peers.server).await;
    assert_eq!(forwarded, json!({"m": 2, "r": 9, "v": 0}));
    wait_for_status(&peers.handle, DisplayStatus::Idle).await;

    peers.handle.shutdown().await;
    cleanup("agent-error").await;
}

#[tokio::test]
async fn test_agent_decision_is_stripped_before_forwarding() {
    let mut peers = connect_session("strip").await;

    send_json(
        &mut peers.agent,
        json!({"m": 2, "r": 2, "v": 5, "_meta": {"d": false}}),
    )
    .await;

    let forwarded = recv_json(&mut peers.server).await;
    assert_eq!(
        forwarded,
        json!({"m": 2, "r": 2, "v": 5}),
        "the envelope must never reach the server"
    );

    peers.handle.shutdown().await;
    cleanup("strip").await;
}

#[tokio::test]
async fn test_agent_fatal_drops_both_links() {
    let mut peers = connect_session("fatal").await;

    send_json(&mut peers.agent, json!({"_meta": {"t": "fatal"}})).await;

    // Both peers observe their connection closing.
    let server_end = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match peers.server.next().await {
                Some(Ok(msg)) if msg.is_close() => break,
                None => break,
                Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(server_end.is_ok(), "server link should drop");

    // The backoff schedule (100ms) dials the server again, proving the
    // drop was a disconnect and not a terminal close.
    let reconnected = tokio::time::timeout(
        Duration::from_secs(5),
        peers.server_accepts.recv(),
    )
    .await;
    assert!(reconnected.is_ok_and(|ws| ws.is_some()));

    peers.handle.shutdown().await;
    cleanup("fatal").await;
}

#[tokio::test]
async fn test_round_result_flushes_trace_once() {
    let test = "flush";
    let mut peers = connect_session(test).await;

    // Ready, one relayed packet, then the round result.
    send_json(&mut peers.server, json!({"m": 2, "r": 14, "v": 1})).await;
    let _ = recv_json(&mut peers.agent).await;
    send_json(&mut peers.server, json!({"m": 2, "r": 17, "w": 3})).await;
    let _ = recv_json(&mut peers.agent).await;

    wait_for_status(&peers.handle, DisplayStatus::Idle).await;

    // The round result triggered exactly one flush.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if count_traces(test).await == 1 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "trace file never appeared"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // The buffer is drained: further flushes are no-ops.
    peers.handle.flush().await;
    peers.handle.flush().await;
    assert_eq!(count_traces(test).await, 1, "empty flushes write nothing");

    peers.handle.shutdown().await;
    cleanup(test).await;
}

async fn count_traces(test: &str) -> usize {
    let mut count = 0;
    let Ok(mut entries) = tokio::fs::read_dir(trace_dir(test)).await else {
        return 0;
    };
    while let Ok(Some(_)) = entries.next_entry().await {
        count += 1;
    }
    count
}
