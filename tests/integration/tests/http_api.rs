//! Kernel REST API against the in-process kernel manager.

use axum::http::{Method, StatusCode};
use kernelgate_core::config::KernelsConfig;
use kernelgate_core::{Config, LocalKernelManager, SecretString};
use kernelgate_gateway::Gateway;
use kernelgate_integration_tests::send;
use serde_json::json;
use std::sync::Arc;

fn app_with(config: Config) -> axum::Router {
    let manager = Arc::new(LocalKernelManager::new(config.kernels.clone()));
    Gateway::new(config, manager).router()
}

#[tokio::test]
async fn test_kernel_lifecycle() {
    let app = app_with(Config::default());

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/kernels",
        Some(json!({"name": "python3", "env": {"KERNEL_USERNAME": "alice", "HOME": "/root"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], "python3");
    assert!(created["created_at"].is_string());
    assert!(created["state"].is_string());

    let (status, fetched) = send(&app, Method::GET, &format!("/api/kernels/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(fetched["name"], created["name"]);

    for body in [&created, &fetched] {
        let text = body.to_string();
        assert!(!text.contains("key"));
        assert!(!text.contains("alice"));
    }

    let (status, listed) = send(&app, Method::GET, "/api/kernels", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["id"], created["id"]);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/kernels/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::DELETE, &format!("/api/kernels/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, listed) = send(&app, Method::GET, "/api/kernels", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_list_preserves_creation_order() {
    let app = app_with(Config::default());

    let mut ids = Vec::new();
    for name in ["python3", "ir", "julia"] {
        let (_, created) =
            send(&app, Method::POST, "/api/kernels", Some(json!({ "name": name }))).await;
        ids.push(created["id"].clone());
    }

    let (_, listed) = send(&app, Method::GET, "/api/kernels", None).await;
    let listed_ids: Vec<_> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k["id"].clone())
        .collect();
    assert_eq!(listed_ids, ids);
}

#[tokio::test]
async fn test_quota_and_allowed_specs() {
    let mut config = Config::default();
    config.kernels = KernelsConfig {
        max_kernels: Some(1),
        allowed_specs: vec!["python3".to_string()],
        ..KernelsConfig::default()
    };
    let app = app_with(config);

    let (status, body) =
        send(&app, Method::POST, "/api/kernels", Some(json!({"name": "ruby"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Kernel creation error:"));

    let (status, _) =
        send(&app, Method::POST, "/api/kernels", Some(json!({"name": "python3"}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        send(&app, Method::POST, "/api/kernels", Some(json!({"name": "python3"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "Forbidden");
}

#[tokio::test]
async fn test_requested_kernel_id_conflict() {
    let app = app_with(Config::default());
    let body = json!({"name": "python3", "env": {"KERNEL_ID": "11111111-2222-3333-4444-555555555555"}});

    let (status, created) = send(&app, Method::POST, "/api/kernels", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], "11111111-2222-3333-4444-555555555555");

    let (status, err) = send(&app, Method::POST, "/api/kernels", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["reason"], "Conflict");
}

#[tokio::test]
async fn test_unknown_kernel_and_bad_bodies() {
    let app = app_with(Config::default());

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/kernels/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("not found"));

    let (status, body) = send(&app, Method::DELETE, "/api/kernels", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Invalid request json body"));

    let (status, _) =
        send(&app, Method::POST, "/api/kernels", Some(json!({"name": 3}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_token_auth() {
    let mut config = Config::default();
    config.gateway.auth.token = Some(SecretString::new("letmein"));
    let app = app_with(config);

    let (status, _) = send(&app, Method::GET, "/api/kernels", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/kernels?token=letmein", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
