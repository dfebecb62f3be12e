//! Integration tests driving a real relay server over WebSocket.
//!
//! Each test serves the router on an ephemeral port inside the test runtime
//! and connects real tokio-tungstenite clients to it.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use kodou_server::{AppState, app};
use kodou_shared::protocol::{
    ClientCountData, DanmakuDeleteData, DanmakuEntry, DanmakuStatus, Event, EventType,
};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Serve the relay on an ephemeral port; returns the WebSocket URL.
async fn spawn_server() -> String {
    let state = Arc::new(AppState::new());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, app(state))
            .await
            .expect("Test server failed");
    });
    format!("ws://{addr}/ws")
}

async fn connect(url: &str) -> WsClient {
    let (ws, _response) = connect_async(url).await.expect("Failed to connect");
    ws
}

async fn send(ws: &mut WsClient, event: &Event) {
    ws.send(Message::Text(event.to_json().into()))
        .await
        .expect("Failed to send");
}

/// Next text frame parsed as an event. Panics after two seconds of silence.
async fn next_event(ws: &mut WsClient) -> Event {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("Timed out waiting for a message")
            .expect("Connection closed")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return Event::parse(&text).expect("Received unparseable event");
        }
    }
}

/// Skip frames until an event of the wanted type arrives.
async fn wait_for(ws: &mut WsClient, wanted: EventType) -> Event {
    loop {
        let event = next_event(ws).await;
        if event.r#type == wanted {
            return event;
        }
    }
}

fn submission(user_id: &str, name: &str, content: &str, timestamp: i64) -> Event {
    Event::danmaku(
        &DanmakuEntry {
            id: String::new(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            avatar: String::new(),
            content: content.to_string(),
            timestamp,
            is_quick_phrase: false,
            status: DanmakuStatus::Queued,
        },
        timestamp,
    )
}

#[tokio::test]
async fn test_connect_and_disconnect_broadcast_client_counts() {
    // テスト項目: 接続・切断時に totalClients が全接続に配信される
    // given (前提条件):
    let url = spawn_server().await;

    // when (操作):
    let mut client_a = connect(&url).await;
    let first = wait_for(&mut client_a, EventType::Connect).await;

    let mut client_b = connect(&url).await;
    let seen_by_a = wait_for(&mut client_a, EventType::Connect).await;
    let seen_by_b = wait_for(&mut client_b, EventType::Connect).await;

    // then (期待する結果):
    let first_count: ClientCountData = first.data_as().unwrap();
    assert_eq!(first_count.total_clients, 1);
    let count_a: ClientCountData = seen_by_a.data_as().unwrap();
    let count_b: ClientCountData = seen_by_b.data_as().unwrap();
    assert_eq!(count_a.total_clients, 2);
    assert_eq!(count_b.total_clients, 2);

    // when (操作): B が切断する
    client_b.close(None).await.expect("Failed to close");
    let left = wait_for(&mut client_a, EventType::Disconnect).await;

    // then (期待する結果):
    let left_count: ClientCountData = left.data_as().unwrap();
    assert_eq!(left_count.total_clients, 1);
}

#[tokio::test]
async fn test_danmaku_submission_is_broadcast_with_assigned_id() {
    // テスト項目: 弾幕投稿が id 付きで送信者を含む全接続に配信される
    // given (前提条件):
    let url = spawn_server().await;
    let mut client_a = connect(&url).await;
    let mut client_b = connect(&url).await;
    wait_for(&mut client_b, EventType::Connect).await;

    // when (操作):
    send(&mut client_a, &submission("u1", "Ann", "hi", 1000)).await;
    let seen_by_a = wait_for(&mut client_a, EventType::Danmaku).await;
    let seen_by_b = wait_for(&mut client_b, EventType::Danmaku).await;

    // then (期待する結果):
    let entry_a: DanmakuEntry = seen_by_a.data_as().unwrap();
    let entry_b: DanmakuEntry = seen_by_b.data_as().unwrap();
    assert!(!entry_a.id.is_empty());
    assert_eq!(entry_a.id, entry_b.id);
    assert_eq!(entry_a.status, DanmakuStatus::Queued);
    assert_eq!(entry_a.content, "hi");
    assert_eq!(entry_a.user_id, "u1");
}

#[tokio::test]
async fn test_danmaku_delete_is_broadcast_to_all_clients() {
    // テスト項目: 弾幕削除が全接続に配信され store からも消える
    // given (前提条件):
    let url = spawn_server().await;
    let mut client_a = connect(&url).await;
    let mut client_b = connect(&url).await;
    send(&mut client_a, &submission("u1", "Ann", "hi", 1000)).await;
    let stored: DanmakuEntry = wait_for(&mut client_a, EventType::Danmaku)
        .await
        .data_as()
        .unwrap();
    wait_for(&mut client_b, EventType::Danmaku).await;

    // when (操作):
    send(&mut client_b, &Event::danmaku_delete(&stored.id, 2000)).await;
    let seen_by_a = wait_for(&mut client_a, EventType::DanmakuDelete).await;
    let seen_by_b = wait_for(&mut client_b, EventType::DanmakuDelete).await;

    // then (期待する結果):
    let delete_a: DanmakuDeleteData = seen_by_a.data_as().unwrap();
    let delete_b: DanmakuDeleteData = seen_by_b.data_as().unwrap();
    assert_eq!(delete_a.id, stored.id);
    assert_eq!(delete_b.id, stored.id);

    // 削除後のリスト同期には現れない
    send(&mut client_a, &Event::danmaku_list(3000)).await;
    let sync = wait_for(&mut client_a, EventType::DanmakuListSync).await;
    let entries: Vec<DanmakuEntry> = sync.data_as().unwrap();
    assert!(entries.iter().all(|e| e.id != stored.id));
}

#[tokio::test]
async fn test_danmaku_list_sync_goes_to_requester_only() {
    // テスト項目: danmakuList の応答が要求したクライアントのみに届く
    // given (前提条件):
    let url = spawn_server().await;
    let mut client_a = connect(&url).await;
    send(&mut client_a, &submission("u1", "Ann", "second", 2000)).await;
    send(&mut client_a, &submission("u2", "Bob", "first", 1000)).await;
    wait_for(&mut client_a, EventType::Danmaku).await;
    wait_for(&mut client_a, EventType::Danmaku).await;

    // 新しく参加した viewer がリストを要求する
    let mut client_b = connect(&url).await;
    wait_for(&mut client_b, EventType::Connect).await;
    wait_for(&mut client_a, EventType::Connect).await;

    // when (操作):
    send(&mut client_b, &Event::danmaku_list(3000)).await;
    let sync = wait_for(&mut client_b, EventType::DanmakuListSync).await;

    // then (期待する結果): タイムスタンプ昇順の全リストが届く
    let entries: Vec<DanmakuEntry> = sync.data_as().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].content, "first");
    assert_eq!(entries[1].content, "second");

    // A には listSync が届かない: 次に届くのは interaction である
    send(&mut client_b, &Event::interaction(4000)).await;
    let next_for_a = next_event(&mut client_a).await;
    assert_eq!(next_for_a.r#type, EventType::Interaction);
}

#[tokio::test]
async fn test_malformed_message_keeps_connection_open() {
    // テスト項目: 不正なメッセージの後も接続が生きている
    // given (前提条件):
    let url = spawn_server().await;
    let mut client_a = connect(&url).await;
    wait_for(&mut client_a, EventType::Connect).await;

    // when (操作):
    client_a
        .send(Message::Text("this is not json".into()))
        .await
        .expect("Failed to send");
    send(&mut client_a, &Event::heartbeat(1000)).await;

    // then (期待する結果):
    let event = next_event(&mut client_a).await;
    assert_eq!(event.r#type, EventType::Heartbeat);
}

#[tokio::test]
async fn test_register_is_not_broadcast() {
    // テスト項目: register がどの接続にも配信されない
    // given (前提条件):
    let url = spawn_server().await;
    let mut client_a = connect(&url).await;
    let mut client_b = connect(&url).await;
    wait_for(&mut client_a, EventType::Connect).await;
    wait_for(&mut client_a, EventType::Connect).await;
    wait_for(&mut client_b, EventType::Connect).await;

    // when (操作):
    send(&mut client_a, &Event::register("u1", "Ann", 1000)).await;
    send(&mut client_a, &Event::heartbeat(2000)).await;

    // then (期待する結果): register を挟まず heartbeat が先頭で届く
    let next_for_a = next_event(&mut client_a).await;
    let next_for_b = next_event(&mut client_b).await;
    assert_eq!(next_for_a.r#type, EventType::Heartbeat);
    assert_eq!(next_for_b.r#type, EventType::Heartbeat);
}

#[tokio::test]
async fn test_mode_change_reaches_all_clients_verbatim() {
    // テスト項目: modeChange が全接続に元のまま転送される
    // given (前提条件):
    let url = spawn_server().await;
    let mut client_a = connect(&url).await;
    let mut client_b = connect(&url).await;
    wait_for(&mut client_b, EventType::Connect).await;
    let raw = r#"{"type":"modeChange","data":{"mode":"excited"},"timestamp":1000}"#;

    // when (操作):
    client_a
        .send(Message::Text(raw.into()))
        .await
        .expect("Failed to send");

    // then (期待する結果):
    let event_a = wait_for(&mut client_a, EventType::ModeChange).await;
    let event_b = wait_for(&mut client_b, EventType::ModeChange).await;
    assert_eq!(event_a, event_b);
    assert_eq!(event_a.to_json(), Event::parse(raw).unwrap().to_json());
}
