use axum::http::{Method, StatusCode};
use axum::Router;
use key_lease_server::store::{keys, LeaseStore};
use key_lease_server::workers::run_reclaim_cycle;

mod common;

use common::{send, TestContext};

async fn generate(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/keys").await;
    assert_eq!(status, StatusCode::OK);
    body["key"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_generate_key() {
    let ctx = TestContext::new();
    let app = ctx.app();

    let (status, body) = send(&app, Method::POST, "/keys").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "successfully generated new key");
    assert_eq!(body["key"].as_str().unwrap().len(), 32);
}

#[tokio::test]
async fn test_available_key_then_exhausted() {
    let ctx = TestContext::new();
    let app = ctx.app();
    let key = generate(&app).await;

    let (status, body) = send(&app, Method::GET, "/keys/available").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], key.as_str());

    let (status, body) = send(&app, Method::GET, "/keys/available").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No available keys");
}

#[tokio::test]
async fn test_unblock_key() {
    let ctx = TestContext::new();
    let app = ctx.app();
    let key = generate(&app).await;
    send(&app, Method::GET, "/keys/available").await;

    let (status, body) = send(&app, Method::PATCH, &format!("/keys/{key}/unblock")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Key unblocked");
    assert_eq!(ctx.store.zscore(keys::block_index(), &key).await.unwrap(), None);
    assert!(ctx.store.sismember(keys::available_set(), &key).await.unwrap());
    assert!(ctx.store.exists(&keys::record_key(&key)).await.unwrap());
}

#[tokio::test]
async fn test_unblock_unknown_key() {
    let ctx = TestContext::new();
    let app = ctx.app();

    let (status, body) = send(&app, Method::PATCH, "/keys/nonexistent/unblock").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Key not found");
}

#[tokio::test]
async fn test_delete_key() {
    let ctx = TestContext::new();
    let app = ctx.app();
    let key = generate(&app).await;

    let (status, body) = send(&app, Method::DELETE, &format!("/keys?key={key}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Key deleted");
    assert!(!ctx.store.exists(&keys::record_key(&key)).await.unwrap());
    assert_eq!(ctx.store.set_len(keys::available_set()), 0);
}

#[tokio::test]
async fn test_delete_bad_key() {
    let ctx = TestContext::new();
    let app = ctx.app();

    let (status, body) = send(&app, Method::DELETE, "/keys?key=non_existent_key").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Key not found");

    let (status, _) = send(&app, Method::DELETE, "/keys").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_keep_alive() {
    let ctx = TestContext::new();
    let app = ctx.app();
    let key = generate(&app).await;

    let (status, body) = send(&app, Method::POST, &format!("/keys/{key}/keep_alive")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Key kept alive");

    let (status, body) = send(&app, Method::POST, "/keys/nonexistent/keep_alive").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Key not found");
}

#[tokio::test]
async fn test_key_status() {
    let ctx = TestContext::new();
    let app = ctx.app();
    let key = generate(&app).await;

    let (status, body) = send(&app, Method::GET, &format!("/keys/{key}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "available");

    send(&app, Method::GET, "/keys/available").await;
    let (_, body) = send(&app, Method::GET, &format!("/keys/{key}")).await;
    assert_eq!(body["status"], "leased");

    let (status, _) = send(&app, Method::GET, "/keys/0123456789abcdef0123456789abcdef").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lease_times_out_after_block_time() {
    let ctx = TestContext::new();
    let app = ctx.app();
    let key = generate(&app).await;

    let (_, body) = send(&app, Method::GET, "/keys/available").await;
    assert_eq!(body["key"], key.as_str());

    ctx.clock.advance(keys::BLOCK_TIME.as_secs() as i64);
    run_reclaim_cycle(&ctx.manager).await.unwrap();

    let (status, body) = send(&app, Method::GET, "/keys/available").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], key.as_str());
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();
    let app = ctx.app();

    let (status, body) = send(&app, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "connected");
    assert_eq!(body["backend"], "memory");

    let (status, _) = send(&app, Method::GET, "/health/live").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_404_not_found() {
    let ctx = TestContext::new();
    let app = ctx.app();

    let (status, body) = send(&app, Method::GET, "/nonexistent/path").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}
