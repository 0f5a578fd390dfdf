//! End-to-end checks against a live server on an ephemeral port.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use scribble::config::ServerConfig;
use scribble::protocol::{self, ClientEvent, Point, ServerEvent, Stroke, StrokeStart, Tool};
use scribble::routes;
use scribble::state::AppState;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = routes::app(AppState::new(ServerConfig::default()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr.to_string()
}

async fn recv(client: &mut Client) -> ServerEvent {
    loop {
        let message = tokio::time::timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("decode server event");
        }
    }
}

/// Skip events until one matches `pred`.
async fn recv_until(client: &mut Client, pred: impl Fn(&ServerEvent) -> bool) -> ServerEvent {
    loop {
        let event = recv(client).await;
        if pred(&event) {
            return event;
        }
    }
}

async fn send(client: &mut Client, event: &ClientEvent) {
    let json = protocol::encode(event).expect("encode");
    client.send(Message::Text(json.into())).await.expect("send");
}

async fn connect(addr: &str) -> (Client, Uuid) {
    let (mut client, _) = connect_async(format!("ws://{addr}/ws")).await.expect("connect");
    let ServerEvent::Connected(welcome) = recv(&mut client).await else {
        panic!("expected connected first");
    };
    (client, welcome.user_id)
}

async fn join(client: &mut Client, room: &str) -> scribble::protocol::Snapshot {
    send(client, &ClientEvent::JoinRoom(Some(room.into()))).await;
    let ServerEvent::InitSnapshot(snapshot) = recv_until(client, |e| matches!(e, ServerEvent::InitSnapshot(_))).await
    else {
        unreachable!();
    };
    snapshot
}

/// Assert nothing arrives within a short window.
async fn assert_quiet(client: &mut Client) {
    if let Ok(Some(Ok(Message::Text(text)))) = tokio::time::timeout(Duration::from_millis(200), client.next()).await {
        panic!("unexpected event: {text}");
    }
}

/// Poll `/api/rooms` until its body matches `expected`.
async fn wait_for_listing(addr: &str, expected: &str) -> String {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let response = http_get(addr, "/api/rooms").await;
        if response.ends_with(expected) || tokio::time::Instant::now() >= deadline {
            return response;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

async fn http_get(addr: &str, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("tcp connect");
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.expect("write");
    let mut response = String::new();
    tokio::time::timeout(WAIT, stream.read_to_string(&mut response))
        .await
        .expect("timed out reading response")
        .expect("read");
    response
}

fn three_point_stroke() -> Stroke {
    Stroke {
        tool: Tool::Brush,
        color: "#ff0000".into(),
        width: 4.0,
        points: vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0), Point::new(20.0, 5.0)],
    }
}

#[tokio::test]
async fn stroke_is_replayed_to_late_joiner_and_undone_for_everyone() {
    let addr = spawn_server().await;

    let (mut c, _) = connect(&addr).await;
    join(&mut c, "art").await;

    let (mut a, a_id) = connect(&addr).await;
    let snapshot = join(&mut a, "art").await;
    assert_eq!(snapshot.room_id, "art");
    assert_eq!(snapshot.users.len(), 2);

    send(&mut a, &ClientEvent::StrokeEnd(three_point_stroke())).await;
    let ServerEvent::StrokeEnd(done) = recv_until(&mut c, |e| matches!(e, ServerEvent::StrokeEnd(_))).await else {
        unreachable!();
    };
    assert_eq!(done.user_id, a_id);
    assert_eq!(done.stroke.points.len(), 3);

    let (mut b, _) = connect(&addr).await;
    let snapshot = join(&mut b, "art").await;
    assert_eq!(snapshot.operations.len(), 1);
    assert_eq!(snapshot.operations[0].id, done.operation_id);
    assert_eq!(snapshot.operations[0].stroke, three_point_stroke());

    send(&mut a, &ClientEvent::Undo).await;
    for client in [&mut a, &mut b, &mut c] {
        let ServerEvent::OperationUndone(undone) =
            recv_until(client, |e| matches!(e, ServerEvent::OperationUndone(_))).await
        else {
            unreachable!();
        };
        assert_eq!(undone.operation_id, done.operation_id);
    }
}

#[tokio::test]
async fn rooms_are_isolated() {
    let addr = spawn_server().await;

    let (mut a, _) = connect(&addr).await;
    join(&mut a, "one").await;
    let (mut b, _) = connect(&addr).await;
    join(&mut b, "two").await;

    send(&mut a, &ClientEvent::StrokeEnd(three_point_stroke())).await;
    send(&mut a, &ClientEvent::Clear).await;
    // Sender sees its own clear; the other room sees nothing.
    recv_until(&mut a, |e| matches!(e, ServerEvent::CanvasCleared)).await;

    let (mut probe, _) = connect(&addr).await;
    let snapshot = join(&mut probe, "two").await;
    assert!(snapshot.operations.is_empty());
    // The only thing room two hears about is the probe arriving.
    assert!(matches!(recv(&mut b).await, ServerEvent::UserJoined(_)));
}

#[tokio::test]
async fn malformed_message_gets_error_and_connection_survives() {
    let addr = spawn_server().await;
    let (mut a, _) = connect(&addr).await;

    a.send(Message::Text("{not json".to_string().into())).await.expect("send");
    let ServerEvent::Error(err) = recv(&mut a).await else {
        panic!("expected error event");
    };
    assert_eq!(err.code, "E_INVALID_JSON");

    let snapshot = join(&mut a, "after-error").await;
    assert_eq!(snapshot.room_id, "after-error");
}

#[tokio::test]
async fn health_and_room_listing() {
    let addr = spawn_server().await;
    assert!(http_get(&addr, "/healthz").await.starts_with("HTTP/1.1 200"));

    let (mut a, _) = connect(&addr).await;
    join(&mut a, "gallery").await;

    let listing = http_get(&addr, "/api/rooms").await;
    assert!(listing.starts_with("HTTP/1.1 200"));
    assert!(listing.contains("\"roomId\":\"gallery\""));
    assert!(listing.contains("\"users\":1"));
}

#[tokio::test]
async fn binary_frame_gets_error_and_connection_survives() {
    let addr = spawn_server().await;
    let (mut a, _) = connect(&addr).await;

    a.send(Message::Binary(vec![1u8, 2, 3].into())).await.expect("send");
    let ServerEvent::Error(err) = recv(&mut a).await else {
        panic!("expected error event");
    };
    assert_eq!(err.code, "E_BINARY");

    let snapshot = join(&mut a, "after-binary").await;
    assert_eq!(snapshot.room_id, "after-binary");
}

#[tokio::test]
async fn disconnect_mid_stroke_announces_departure_and_sweeps_room() {
    let addr = spawn_server().await;

    let (mut a, a_id) = connect(&addr).await;
    join(&mut a, "art").await;
    let (mut b, _) = connect(&addr).await;
    join(&mut b, "art").await;

    let start = StrokeStart { x: 0.0, y: 0.0, color: "#00ff00".into(), width: 3.0, tool: Tool::Brush };
    send(&mut a, &ClientEvent::StrokeStart(start)).await;
    send(&mut a, &ClientEvent::StrokeMove(Point::new(5.0, 5.0))).await;
    recv_until(&mut b, |e| matches!(e, ServerEvent::StrokeMove(_))).await;
    drop(a);

    let left = recv(&mut b).await;
    let ServerEvent::UserLeft(departure) = left else {
        panic!("expected user-left, got {left:?}");
    };
    assert_eq!(departure.user_id, a_id);
    assert_quiet(&mut b).await;

    let listing = wait_for_listing(&addr, "\"users\":1,\"operations\":0}]").await;
    assert!(listing.contains("\"roomId\":\"art\""), "{listing}");

    drop(b);
    let listing = wait_for_listing(&addr, "[]").await;
    assert!(listing.ends_with("[]"), "{listing}");
}
