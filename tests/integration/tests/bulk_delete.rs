//! Bulk kernel removal waits for every removal before answering.

use axum::http::{Method, StatusCode};
use kernelgate_core::{Config, KernelManager};
use kernelgate_gateway::Gateway;
use kernelgate_integration_tests::{send, SlowRemovalManager};
use rand::seq::SliceRandom;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_bulk_delete_fans_in() {
    let manager = Arc::new(SlowRemovalManager::default());
    let app = Gateway::new(Config::default(), manager.clone()).router();

    let mut ids = Vec::new();
    for _ in 0..8 {
        let (status, created) =
            send(&app, Method::POST, "/api/kernels", Some(json!({"name": "python3"}))).await;
        assert_eq!(status, StatusCode::OK);
        ids.push(created["id"].as_str().unwrap().to_string());
    }
    ids.push("ffffffff-ffff-ffff-ffff-ffffffffffff".to_string());
    ids.shuffle(&mut rand::thread_rng());

    let (status, body) = send(
        &app,
        Method::DELETE,
        "/api/kernels",
        Some(json!({ "kernel_ids": ids })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());
    assert_eq!(manager.completed_removals(), ids.len());
    assert!(manager.peak_in_flight() > 1, "removals ran one at a time");
    assert!(manager.list_kernels().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_delete_empty_list() {
    let manager = Arc::new(SlowRemovalManager::default());
    let app = Gateway::new(Config::default(), manager.clone()).router();

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/api/kernels",
        Some(json!({ "kernel_ids": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(manager.completed_removals(), 0);
}
