use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use ott_wishlist::api::{create_router, AppState};
use ott_wishlist::db::memory::MemoryLocalStore;
use ott_wishlist::error::{AppError, AppResult};
use ott_wishlist::models::{
    ApiProgramDetail, NewWishlistItem, Platform, ProgramId, WishlistId, WishlistItem,
};
use ott_wishlist::services::{AuthHandle, ProgramCatalog, WishlistRemote};
use ott_wishlist::sync::SyncEngine;

/// Server-side wishlist kept in memory; ids start at 900
#[derive(Default)]
struct InMemoryRemote {
    entries: Mutex<Vec<(i64, ProgramId)>>,
}

#[async_trait::async_trait]
impl WishlistRemote for InMemoryRemote {
    async fn list(&self) -> AppResult<Vec<WishlistItem>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .map(|(id, program_id)| {
                NewWishlistItem::new(*program_id, format!("Program {}", program_id))
                    .into_item(WishlistId::Server(*id))
            })
            .collect())
    }

    async fn add(&self, program_id: ProgramId) -> AppResult<()> {
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|(_, p)| *p == program_id) {
            return Err(AppError::Conflict("already wishlisted".to_string()));
        }
        let id = 900 + entries.len() as i64;
        entries.push((id, program_id));
        Ok(())
    }

    async fn remove(&self, wishlist_id: i64) -> AppResult<()> {
        self.entries
            .lock()
            .unwrap()
            .retain(|(id, _)| *id != wishlist_id);
        Ok(())
    }
}

/// Catalog with no availability data
struct EmptyCatalog;

#[async_trait::async_trait]
impl ProgramCatalog for EmptyCatalog {
    async fn fetch_program_detail(&self, program_id: ProgramId) -> AppResult<ApiProgramDetail> {
        Ok(ApiProgramDetail {
            program_id,
            title: String::new(),
            availability: vec![],
        })
    }

    async fn fetch_platforms(&self) -> AppResult<Vec<Platform>> {
        Ok(vec![])
    }
}

fn create_test_server() -> (TestServer, SyncEngine) {
    let auth = AuthHandle::anonymous();
    let engine = SyncEngine::builder(
        Arc::new(MemoryLocalStore::new()),
        Arc::new(InMemoryRemote::default()),
        Arc::new(EmptyCatalog),
        auth.clone(),
    )
    .remote_timeout(Duration::from_secs(1))
    .start();

    let app = create_router(AppState::new(engine.clone(), auth));
    (TestServer::new(app).unwrap(), engine)
}

async fn wait_for_state(server: &TestServer, state: &str) -> Value {
    for _ in 0..100 {
        let snapshot: Value = server.get("/wishlist").await.json();
        if snapshot["state"] == state && snapshot["isLoading"] == false {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("wishlist never reached state {}", state);
}

#[tokio::test]
async fn test_health_check() {
    let (server, _engine) = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_add_and_list_as_guest() {
    let (server, engine) = create_test_server();
    engine.ready().await.unwrap();

    let response = server
        .post("/wishlist")
        .json(&json!({ "programId": 42, "title": "Show A" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let added: Value = response.json();
    assert_eq!(added["outcome"], "added");
    assert_eq!(added["item"]["id"]["kind"], "local");
    assert_eq!(added["item"]["programId"], 42);

    // Same program again
    let response = server
        .post("/wishlist")
        .json(&json!({ "programId": 42, "title": "Show A" }))
        .await;
    response.assert_status_ok();
    let again: Value = response.json();
    assert_eq!(again["outcome"], "alreadyPresent");
    assert_eq!(again["programId"], 42);

    let snapshot: Value = server.get("/wishlist").await.json();
    assert_eq!(snapshot["state"], "anonymous");
    assert_eq!(snapshot["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_rejects_blank_title() {
    let (server, _engine) = create_test_server();

    let response = server
        .post("/wishlist")
        .json(&json!({ "programId": 42, "title": "  " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remove_by_local_id() {
    let (server, _engine) = create_test_server();

    let added: Value = server
        .post("/wishlist")
        .json(&json!({ "programId": 7, "title": "Show B" }))
        .await
        .json();
    let local_id = added["item"]["id"]["value"].as_i64().unwrap();

    let response = server.delete(&format!("/wishlist/local:{}", local_id)).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!("removed"));

    let response = server.delete(&format!("/wishlist/local:{}", local_id)).await;
    assert_eq!(response.json::<Value>(), json!("notPresent"));
}

#[tokio::test]
async fn test_remove_rejects_malformed_id() {
    let (server, _engine) = create_test_server();

    let response = server.delete("/wishlist/local:abc").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_merge_requires_session() {
    let (server, _engine) = create_test_server();

    let response = server.post("/wishlist/merge").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_merges_guest_list() {
    let (server, engine) = create_test_server();
    engine.ready().await.unwrap();

    server
        .post("/wishlist")
        .json(&json!({ "programId": 42, "title": "Show A" }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/session/login")
        .json(&json!({ "token": "token" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["state"], "authenticated");

    let snapshot = wait_for_state(&server, "authenticated").await;
    let items = snapshot["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], json!({ "kind": "server", "value": 900 }));
    assert_eq!(snapshot["lastMerge"]["succeeded"], json!([42]));

    let response = server.delete("/wishlist/900").await;
    response.assert_status_ok();

    server.post("/session/logout").await.assert_status_ok();
    let snapshot = wait_for_state(&server, "anonymous").await;
    assert!(snapshot["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_refresh_returns_items() {
    let (server, _engine) = create_test_server();

    server
        .post("/wishlist")
        .json(&json!({ "programId": 3, "title": "Show C" }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server.post("/wishlist/refresh").await;
    response.assert_status_ok();
    let items: Vec<Value> = response.json();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["programId"], 3);
}

#[tokio::test]
async fn test_login_rejects_blank_token() {
    let (server, _engine) = create_test_server();

    let response = server
        .post("/session/login")
        .json(&json!({ "token": "" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
