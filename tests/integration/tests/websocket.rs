//! Channel bridge over real sockets.

use futures::{SinkExt, StreamExt};
use kernelgate_core::config::KernelsConfig;
use kernelgate_core::{
    Config, KernelAliasPayload, KernelCreateRequest, KernelId, KernelManager, LocalKernelManager,
    SecretString,
};
use kernelgate_integration_tests::TestServer;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

async fn start_kernel(manager: &LocalKernelManager) -> KernelId {
    let request = KernelCreateRequest {
        name: "python3".to_string(),
        env: HashMap::new(),
    };
    let payload = KernelAliasPayload::from_request(&request).unwrap();
    manager.start_kernel(payload).await.unwrap().id
}

async fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_frames_are_relayed_in_order() {
    let manager = Arc::new(LocalKernelManager::default());
    let id = start_kernel(&manager).await;
    let server = TestServer::start(Config::default(), manager.clone()).await;

    let url = server.ws_url(&format!("/api/kernels/{id}/channels?session_id=s1"));
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    for i in 0..20 {
        ws.send(Message::Text(format!("msg-{i}"))).await.unwrap();
    }
    for i in 0..20 {
        assert_eq!(
            ws.next().await.unwrap().unwrap(),
            Message::Text(format!("msg-{i}"))
        );
    }

    drop(ws);
    assert!(wait_for(|| manager.connection_count(&id) == 0).await);
}

#[tokio::test]
async fn test_unknown_kernel_is_404() {
    let manager = Arc::new(LocalKernelManager::default());
    let server = TestServer::start(Config::default(), manager).await;

    let url = server.ws_url("/api/kernels/00000000-0000-0000-0000-000000000000/channels");
    match tokio_tungstenite::connect_async(url).await {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 404),
        other => panic!("expected 404 rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_query_token_authenticates_upgrade() {
    let manager = Arc::new(LocalKernelManager::default());
    let id = start_kernel(&manager).await;
    let mut config = Config::default();
    config.gateway.auth.token = Some(SecretString::new("ws-token"));
    let server = TestServer::start(config, manager).await;

    let url = server.ws_url(&format!("/api/kernels/{id}/channels"));
    match tokio_tungstenite::connect_async(url).await {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        other => panic!("expected 401 rejection, got {other:?}"),
    }

    let url = server.ws_url(&format!("/api/kernels/{id}/channels?token=ws-token"));
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    ws.send(Message::Text("hi".into())).await.unwrap();
    assert_eq!(ws.next().await.unwrap().unwrap(), Message::Text("hi".into()));
}

#[tokio::test]
async fn test_delete_closes_open_sockets() {
    let manager = Arc::new(LocalKernelManager::default());
    let id = start_kernel(&manager).await;
    let server = TestServer::start(Config::default(), manager.clone()).await;

    let url = server.ws_url(&format!("/api/kernels/{id}/channels?session_id=a"));
    let (mut first, _) = tokio_tungstenite::connect_async(url.clone()).await.unwrap();
    let (mut second, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    // Round trips prove both bridges are streaming before removal.
    for ws in [&mut first, &mut second] {
        ws.send(Message::Text("up".into())).await.unwrap();
        assert_eq!(ws.next().await.unwrap().unwrap(), Message::Text("up".into()));
    }
    assert_eq!(manager.connection_count(&id), 2);

    manager.remove_kernel(&id).await.unwrap();

    for ws in [&mut first, &mut second] {
        let next = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap();
        match next {
            Some(Ok(Message::Close(Some(frame)))) => assert_eq!(frame.code, CloseCode::Away),
            other => panic!("expected close frame, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_cull_on_last_disconnect() {
    let config = Config {
        kernels: KernelsConfig {
            cull_on_last_disconnect: true,
            ..KernelsConfig::default()
        },
        ..Config::default()
    };
    let manager = Arc::new(LocalKernelManager::new(config.kernels.clone()));
    let id = start_kernel(&manager).await;
    let server = TestServer::start(config, manager.clone()).await;

    let url = server.ws_url(&format!("/api/kernels/{id}/channels?session_id=c"));
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    ws.send(Message::Text("x".into())).await.unwrap();
    ws.next().await.unwrap().unwrap();

    ws.close(None).await.unwrap();
    drop(ws);

    assert!(wait_for(|| manager.is_empty()).await);
}
