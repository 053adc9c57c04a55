//! End-to-end tests for the update channel server and the listener client

use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use nohr_dev::ws::{self, ChannelState};
use nohr_dev::*;
use nohr_router::{RouteEntry, RouteManifest, RoutePattern, RouteTable, SharedManifest, SourceRef};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

struct TestServer {
    addr: SocketAddr,
    channel: UpdateChannel,
    _stop: oneshot::Sender<()>,
}

async fn start_server(manifest: SharedManifest) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let channel = UpdateChannel::new();
    let state = ChannelState::new(
        channel.clone(),
        manifest,
        &ReconnectPolicy::default(),
        addr.port(),
    );

    let (stop, stop_rx) = oneshot::channel::<()>();
    tokio::spawn(ws::serve(listener, state, async move {
        let _ = stop_rx.await;
    }));

    TestServer {
        addr,
        channel,
        _stop: stop,
    }
}

async fn wait_members(channel: &UpdateChannel, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while channel.member_count() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("member count never reached");
}

async fn next_text<S>(stream: &mut S) -> UpdateMessage
where
    S: futures::Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out")
            .expect("stream ended")
            .expect("read error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_greeting_then_updates() {
    let server = start_server(SharedManifest::default()).await;
    let (mut socket, _) = connect_async(format!("ws://{}", server.addr)).await.unwrap();

    assert_eq!(next_text(&mut socket).await, UpdateMessage::Connected);
    wait_members(&server.channel, 1).await;

    server.channel.notify_update(UpdateKind::Css, "app/globals.css", Utc::now());
    match next_text(&mut socket).await {
        UpdateMessage::Update {
            update_type, file, ..
        } => {
            assert_eq!(update_type, UpdateKind::Css);
            assert_eq!(file, "app/globals.css");
        }
        other => panic!("expected update, got {:?}", other),
    }
}

#[tokio::test]
async fn test_disconnected_member_removed_others_receive() {
    let server = start_server(SharedManifest::default()).await;
    let url = format!("ws://{}", server.addr);

    let mut sockets = Vec::new();
    for _ in 0..3 {
        let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
        assert_eq!(next_text(&mut socket).await, UpdateMessage::Connected);
        sockets.push(socket);
    }
    wait_members(&server.channel, 3).await;

    let mut gone = sockets.remove(1);
    gone.close(None).await.unwrap();
    drop(gone);
    wait_members(&server.channel, 2).await;

    server.channel.notify_error("Build failed");
    for socket in sockets.iter_mut() {
        assert!(matches!(next_text(socket).await, UpdateMessage::Error { .. }));
    }
}

#[tokio::test]
async fn test_serves_runtime_and_routes() {
    let pages = RouteTable::from_entries(vec![RouteEntry::page(
        RoutePattern::from_dir_path("users/[id]").unwrap(),
        SourceRef::new("users/[id]/page.tsx"),
        vec![],
    )]);
    let manifest = SharedManifest::new(RouteManifest::new(pages, RouteTable::default()));
    let server = start_server(manifest).await;

    let runtime = http_get(server.addr, ws::RUNTIME_PATH).await;
    assert!(runtime.starts_with("HTTP/1.1 200"));
    assert!(runtime.contains("application/javascript"));
    assert!(runtime.contains("maxAttempts: 10"));

    let routes = http_get(server.addr, ws::ROUTES_PATH).await;
    assert!(routes.starts_with("HTTP/1.1 200"));
    assert!(routes.contains(r#""pattern":"/users/:id""#));
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<UpdateMessage>) -> UpdateMessage {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out")
        .expect("client stopped")
}

#[tokio::test]
async fn test_listener_client_reconnects() {
    let server = start_server(SharedManifest::default()).await;
    let client = UpdateClient::new(
        format!("ws://{}", server.addr),
        ReconnectPolicy {
            base_delay_ms: 20,
            factor: 1.5,
            max_attempts: 5,
        },
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        let _ = client.run(move |message| {
            let _ = tx.send(message);
        })
        .await;
    });

    assert_eq!(recv(&mut rx).await, UpdateMessage::Connected);
    wait_members(&server.channel, 1).await;

    // Server drops the member; the client reconnects and is greeted again
    assert_eq!(server.channel.disconnect_all(), 1);
    assert_eq!(recv(&mut rx).await, UpdateMessage::Connected);

    server.channel.notify_update(UpdateKind::Client, "src/client.tsx", Utc::now());
    assert!(matches!(recv(&mut rx).await, UpdateMessage::Update { .. }));

    task.abort();
}
