use axum::http::StatusCode;
use axum_test::TestServer;
use inventory_core::DbLocation;
use inventory_http::{router, AppState};
use serde_json::{json, Value};
use std::path::Path;

fn server() -> TestServer {
    TestServer::new(router(AppState::for_location(&DbLocation::Memory))).unwrap()
}

async fn create_press(server: &TestServer) -> Value {
    let response = server
        .post("/equipment")
        .json(&json!({ "name": "Press-1", "location": "Bay 3" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

#[tokio::test]
async fn index_reports_readiness() {
    let server = server();

    let response = server.get("/").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert!(body["message"].as_str().unwrap().contains("ready"));
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn create_equipment_returns_record_with_defaults() {
    let server = server();

    let created = create_press(&server).await;

    assert!(!created["id"].as_str().unwrap().is_empty());
    assert_eq!(created["name"], "Press-1");
    assert_eq!(created["location"], "Bay 3");
    assert_eq!(created["serialNumber"], "N/A");
    assert_eq!(created["deleted"], false);
    assert_eq!(created["version"], 1);
    assert_eq!(created["createdAt"], created["modifiedAt"]);
}

#[tokio::test]
async fn create_equipment_without_name_is_bad_request() {
    let server = server();

    let response = server
        .post("/equipment")
        .json(&json!({ "location": "Bay 3" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "name is required");
    server.get("/equipment").await.assert_json(&json!([]));
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let server = server();

    let response = server
        .post("/products")
        .text("{not json")
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let server = server();

    server
        .get("/equipment/missing")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .put("/equipment/missing")
        .json(&json!({ "location": "Bay 4" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete("/products/missing")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn put_overlays_only_provided_fields() {
    let server = server();
    let created = create_press(&server).await;
    let id = created["id"].as_str().unwrap();

    let response = server
        .put(&format!("/equipment/{id}"))
        .json(&json!({ "location": "Bay 4" }))
        .await;

    response.assert_status_ok();
    let updated = response.json::<Value>();
    assert_eq!(updated["id"], id);
    assert_eq!(updated["name"], "Press-1");
    assert_eq!(updated["location"], "Bay 4");
    assert_eq!(updated["version"], 2);
    assert_eq!(updated["createdAt"], created["createdAt"]);
}

#[tokio::test]
async fn delete_is_logical() {
    let server = server();
    let created = create_press(&server).await;
    let id = created["id"].as_str().unwrap();

    let response = server.delete(&format!("/equipment/{id}")).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["deleted"], true);

    let fetched = server.get(&format!("/equipment/{id}")).await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<Value>()["deleted"], true);

    server.get("/equipment").await.assert_json(&json!([]));
}

#[tokio::test]
async fn product_price_accepts_numeric_strings() {
    let server = server();

    let response = server
        .post("/products")
        .json(&json!({ "name": "Bolt", "price": "1.5" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let created = response.json::<Value>();
    assert_eq!(created["price"], 1.5);
    assert_eq!(created["category"], "General");
    assert_eq!(created["description"], "");
}

#[tokio::test]
async fn non_positive_price_is_bad_request() {
    let server = server();

    server
        .post("/products")
        .json(&json!({ "name": "Bolt", "price": 0 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_returns_newest_first() {
    let server = server();
    for name in ["Nut", "Bolt", "Washer"] {
        server
            .post("/products")
            .json(&json!({ "name": name, "price": 1 }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let listed = server.get("/products").await.json::<Value>();
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Washer", "Bolt", "Nut"]);
}

#[tokio::test]
async fn stale_if_match_is_conflict() {
    let server = server();
    let created = create_press(&server).await;
    let id = created["id"].as_str().unwrap();

    server
        .put(&format!("/equipment/{id}"))
        .add_header("If-Match", "1")
        .json(&json!({ "location": "Bay 4" }))
        .await
        .assert_status_ok();

    let stale = server
        .put(&format!("/equipment/{id}"))
        .add_header("If-Match", "\"1\"")
        .json(&json!({ "location": "Bay 5" }))
        .await;
    stale.assert_status(StatusCode::CONFLICT);

    let current = server.get(&format!("/equipment/{id}")).await.json::<Value>();
    assert_eq!(current["location"], "Bay 4");
    assert_eq!(current["version"], 2);

    server
        .delete(&format!("/equipment/{id}"))
        .add_header("If-Match", "1")
        .await
        .assert_status(StatusCode::CONFLICT);
}

fn set_stored_version(path: &Path, id: &str, version: u64) {
    let raw = rusqlite::Connection::open(path).unwrap();
    let stored: String = raw
        .query_row("SELECT document FROM equipment WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .unwrap();
    let mut document: Value = serde_json::from_str(&stored).unwrap();
    document["version"] = json!(version);
    raw.execute(
        "UPDATE equipment SET document = ?1 WHERE id = ?2",
        [document.to_string().as_str(), id],
    )
    .unwrap();
}

#[tokio::test]
async fn exhausted_version_fails_once_and_leaves_the_kind_usable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory.db");
    let server =
        TestServer::new(router(AppState::for_location(&DbLocation::File(path.clone())))).unwrap();
    let created = create_press(&server).await;
    let id = created["id"].as_str().unwrap();
    set_stored_version(&path, id, u64::MAX);

    let response = server
        .put(&format!("/equipment/{id}"))
        .json(&json!({ "location": "Bay 4" }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["error"], "Internal server error");

    let listed = server.get("/equipment").await;
    listed.assert_status_ok();
    let listed = listed.json::<Value>();
    assert_eq!(listed[0]["location"], "Bay 3");

    create_press(&server).await;
}

#[tokio::test]
async fn repository_stays_usable_after_a_panicked_holder() {
    let state = AppState::for_location(&DbLocation::Memory);
    let equipment = state.equipment.clone();
    let holder = std::thread::spawn(move || {
        let _guard = equipment.lock().unwrap();
        panic!("repository holder aborted");
    });
    assert!(holder.join().is_err());
    assert!(state.equipment.is_poisoned());

    let server = TestServer::new(router(state)).unwrap();
    server.get("/equipment").await.assert_json(&json!([]));
    create_press(&server).await;
}
