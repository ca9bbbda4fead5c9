//! Push channel against a local WebSocket server.

use std::time::Duration;

use finboard_client::{
    ConnectionEvent, ConnectionManager, ConnectionState, EventBus, ReconnectPolicy,
};
use finboard_core::{FileId, PushEvent, UserId};
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};

const TIMEOUT: Duration = Duration::from_secs(5);

fn policy(base_ms: u64, max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy {
        base: Duration::from_millis(base_ms),
        max_attempts,
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("ws://{}", listener.local_addr().unwrap());
    (listener, origin)
}

fn refused_origin() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}")
}

/// Accept one socket, returning it with the request path.
async fn accept(listener: &TcpListener) -> (WebSocketStream<TcpStream>, String) {
    let (tcp, _) = timeout(TIMEOUT, listener.accept())
        .await
        .expect("timeout waiting for client")
        .unwrap();
    let mut path = String::new();
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        path = req.uri().path().to_owned();
        Ok(resp)
    };
    let ws = accept_hdr_async(tcp, callback).await.unwrap();
    (ws, path)
}

async fn next_status(rx: &mut broadcast::Receiver<ConnectionEvent>) -> ConnectionEvent {
    timeout(TIMEOUT, rx.recv())
        .await
        .expect("timeout waiting for status")
        .unwrap()
}

async fn wait_for_state(rx: &mut broadcast::Receiver<ConnectionEvent>, wanted: ConnectionState) {
    loop {
        if next_status(rx).await == ConnectionEvent::StateChanged(wanted) {
            return;
        }
    }
}

#[tokio::test]
async fn delivers_text_and_binary_frames() {
    let (listener, origin) = bind().await;
    let manager = ConnectionManager::new(origin, policy(1, 5), EventBus::new(16));
    let mut events = manager.events().subscribe();
    let mut status = manager.subscribe_status();
    manager.connect(&UserId::from_raw("u1"));

    let (mut ws, path) = accept(&listener).await;
    assert_eq!(path, "/ws/u1");
    wait_for_state(&mut status, ConnectionState::Connected).await;

    ws.send(Message::text(
        r#"{"type":"analysis_completed","request_id":"r1","execution_time_ms":4200}"#,
    ))
    .await
    .unwrap();
    ws.send(Message::text("{not json")).await.unwrap();
    ws.send(Message::text(r#"{"type":"heartbeat"}"#)).await.unwrap();
    ws.send(Message::binary(br#"{"type":"file_processed","file_id":7}"#.to_vec()))
        .await
        .unwrap();

    let first = timeout(TIMEOUT, events.recv()).await.unwrap().unwrap();
    match first {
        PushEvent::AnalysisCompleted {
            request_id,
            execution_time_ms,
            ..
        } => {
            assert_eq!(request_id.as_str(), "r1");
            assert_eq!(execution_time_ms, Some(4200.0));
        }
        other => panic!("unexpected event {other:?}"),
    }

    let second = timeout(TIMEOUT, events.recv()).await.unwrap().unwrap();
    assert_eq!(
        second,
        PushEvent::FileProcessed {
            file_id: FileId::from_raw("7"),
            filename: None,
            status: None,
        }
    );
    assert_eq!(manager.state(), ConnectionState::Connected);
    manager.disconnect();
}

#[tokio::test]
async fn backs_off_then_goes_dead() {
    let manager = ConnectionManager::new(refused_origin(), policy(1, 5), EventBus::new(4));
    let mut status = manager.subscribe_status();
    manager.connect(&UserId::from_raw("u1"));

    let mut delays = Vec::new();
    let mut connecting = 0;
    loop {
        match next_status(&mut status).await {
            ConnectionEvent::ReconnectScheduled { attempt, delay } => {
                assert_eq!(attempt as usize, delays.len() + 1);
                delays.push(delay);
            }
            ConnectionEvent::StateChanged(ConnectionState::Connecting) => connecting += 1,
            ConnectionEvent::StateChanged(ConnectionState::Dead) => break,
            ConnectionEvent::StateChanged(_) => {}
        }
    }

    let expected: Vec<Duration> = [2, 4, 8, 16, 32]
        .into_iter()
        .map(Duration::from_millis)
        .collect();
    assert_eq!(delays, expected);
    assert_eq!(connecting, 6);
    assert_eq!(manager.state(), ConnectionState::Dead);
    assert!(manager.user_id().is_none());

    // Nothing else is ever scheduled.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(status.try_recv().is_err());

    // An explicit connect revives a dead channel.
    manager.connect(&UserId::from_raw("u1"));
    assert_eq!(manager.state(), ConnectionState::Connecting);
    manager.disconnect();
}

#[tokio::test]
async fn disconnect_cancels_pending_reconnect() {
    let manager = ConnectionManager::new(refused_origin(), policy(100, 5), EventBus::new(4));
    let mut status = manager.subscribe_status();
    manager.connect(&UserId::from_raw("u1"));

    loop {
        let event = next_status(&mut status).await;
        if let ConnectionEvent::ReconnectScheduled { attempt, .. } = event {
            assert_eq!(attempt, 1);
            break;
        }
    }
    manager.disconnect();
    manager.disconnect();

    tokio::time::sleep(Duration::from_millis(500)).await;
    while let Ok(event) = status.try_recv() {
        assert!(
            !matches!(
                event,
                ConnectionEvent::StateChanged(ConnectionState::Connecting)
                    | ConnectionEvent::ReconnectScheduled { .. }
            ),
            "activity after disconnect: {event:?}"
        );
    }
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn successful_open_resets_attempts() {
    let (listener, origin) = bind().await;
    let server = tokio::spawn(async move {
        loop {
            let (mut ws, _) = accept(&listener).await;
            let _ = ws.close(None).await;
        }
    });

    let manager = ConnectionManager::new(origin, policy(1, 2), EventBus::new(4));
    let mut status = manager.subscribe_status();
    manager.connect(&UserId::from_raw("u1"));

    let mut opened = 0;
    while opened < 4 {
        match next_status(&mut status).await {
            ConnectionEvent::StateChanged(ConnectionState::Connected) => opened += 1,
            ConnectionEvent::StateChanged(ConnectionState::Dead) => {
                panic!("went dead despite successful opens")
            }
            ConnectionEvent::ReconnectScheduled { attempt, .. } => assert_eq!(attempt, 1),
            ConnectionEvent::StateChanged(_) => {}
        }
    }

    manager.disconnect();
    server.abort();
}

#[tokio::test]
async fn connect_replaces_existing_socket() {
    let (listener, origin) = bind().await;
    let manager = ConnectionManager::new(origin, policy(1, 5), EventBus::new(4));
    let mut status = manager.subscribe_status();

    manager.connect(&UserId::from_raw("u1"));
    let (mut first, path) = accept(&listener).await;
    assert_eq!(path, "/ws/u1");
    wait_for_state(&mut status, ConnectionState::Connected).await;

    manager.connect(&UserId::from_raw("u2"));
    let (_second, path) = accept(&listener).await;
    assert_eq!(path, "/ws/u2");
    assert_eq!(manager.user_id(), Some(UserId::from_raw("u2")));

    // The replaced socket is closed by the client.
    let closed = timeout(TIMEOUT, async {
        loop {
            match first.next().await {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());
    manager.disconnect();
}

#[tokio::test]
async fn close_after_disconnect_does_not_reconnect() {
    let (listener, origin) = bind().await;
    let manager = ConnectionManager::new(origin, policy(1, 5), EventBus::new(4));
    let mut status = manager.subscribe_status();

    manager.connect(&UserId::from_raw("u1"));
    let (ws, _) = accept(&listener).await;
    wait_for_state(&mut status, ConnectionState::Connected).await;

    manager.disconnect();
    drop(ws);

    assert!(
        timeout(Duration::from_millis(300), listener.accept())
            .await
            .is_err(),
        "client reconnected after disconnect"
    );
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn blank_identity_opens_nothing() {
    let (listener, origin) = bind().await;
    let manager = ConnectionManager::new(origin, policy(1, 5), EventBus::new(4));
    manager.connect(&UserId::from_raw(""));
    assert!(
        timeout(Duration::from_millis(200), listener.accept())
            .await
            .is_err()
    );
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn secure_origin_starts_tls_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("wss://{}", listener.local_addr().unwrap());
    let manager = ConnectionManager::new(origin, policy(1_000, 1), EventBus::new(4));
    manager.connect(&UserId::from_raw("u1"));

    let (mut tcp, _) = timeout(TIMEOUT, listener.accept())
        .await
        .expect("timeout waiting for client")
        .unwrap();
    let mut record_type = [0u8; 1];
    let _ = timeout(TIMEOUT, tcp.read_exact(&mut record_type))
        .await
        .expect("timeout waiting for client hello")
        .unwrap();
    // 0x16 is a TLS handshake record.
    assert_eq!(record_type[0], 0x16);
    manager.disconnect();
}
