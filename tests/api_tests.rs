use std::{net::TcpListener, sync::Arc};

use fintrack::api::{router, AppState};
use fintrack::config::{BackendKind, StorageConfig};
use fintrack::storage::{self, StorageBackend};
use fintrack_memory::{IndexedStorage, ListStorage};
use fintrack_sqlite::SqliteStorage;
use metrics_exporter_prometheus::PrometheusBuilder;
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Serves the API on an ephemeral port and returns its base URL.
fn spawn_app(storage: Arc<dyn StorageBackend>) -> String {
    spawn_with_state(AppState::new(storage))
}

fn spawn_with_state(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state);

    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service())
            .await
            .unwrap();
    });

    format!("http://{}", addr)
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    let response = client.post(url).json(&body).send().await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

async fn put(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    let response = client.put(url).json(&body).send().await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

async fn get(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let response = client.get(url).send().await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_salary_lifecycle() {
    let base = spawn_app(Arc::new(IndexedStorage::new()));
    let client = reqwest::Client::new();

    let (status, created) = post(&client, format!("{base}/api/salaries"), json!({"amount": 5000, "month": 1, "year": 2025})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], 1);
    assert_eq!(created["amount"], 5000);
    assert!(created["createdAt"].is_string());

    let (status, updated) = put(&client, format!("{base}/api/salaries/1"), json!({"amount": 6100})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["amount"], 6100);
    assert_eq!(updated["month"], 1);
    assert_eq!(updated["createdAt"], created["createdAt"]);

    let (status, listed) = get(&client, format!("{base}/api/salaries")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([updated]));
}

#[tokio::test]
async fn test_validation_errors_list_every_field() {
    let storage: Arc<dyn StorageBackend> = Arc::new(ListStorage::new());
    let base = spawn_app(storage.clone());
    let client = reqwest::Client::new();

    let (status, body) = post(&client, format!("{base}/api/expenses"), json!({"amount": "1200", "month": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let issues = body["issues"].as_array().unwrap();
    let paths: Vec<&str> = issues.iter().map(|i| i["path"][0].as_str().unwrap()).collect();
    assert_eq!(paths, vec!["amount", "category", "year"]);
    assert_eq!(issues[0]["code"], "invalid_type");
    assert_eq!(issues[1]["code"], "required");

    assert!(storage.list_expenses().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let base = spawn_app(Arc::new(ListStorage::new()));
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/salaries"))
        .header("content-type", "application/json")
        .body("{\"amount\": 5000,")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["issues"][0]["code"], "invalid_json");

    let (status, listed) = get(&client, format!("{base}/api/salaries")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_update_unknown_salary_is_not_found() {
    let base = spawn_app(Arc::new(ListStorage::new()));
    let client = reqwest::Client::new();

    let (status, body) = put(&client, format!("{base}/api/salaries/42"), json!({"amount": 1})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "salary not found: 42");

    let (status, body) = put(&client, format!("{base}/api/salaries/abc"), json!({"amount": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["issues"][0]["path"][0], "id");
}

#[tokio::test]
async fn test_expenses_keep_free_form_category() {
    let base = spawn_app(Arc::new(SqliteStorage::new(":memory:").unwrap()));
    let client = reqwest::Client::new();

    let (status, created) = post(
        &client,
        format!("{base}/api/expenses"),
        json!({"amount": 80, "category": "Gym", "month": 3, "year": 2025, "id": 500}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], 1, "client-supplied id is ignored");
    assert_eq!(created["category"], "Gym");

    let (_, listed) = get(&client, format!("{base}/api/expenses")).await;
    assert_eq!(listed, json!([created]));

    let (status, categories) = get(&client, format!("{base}/api/categories")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(categories.as_array().unwrap().len(), 7);
    assert_eq!(categories[1], "School Fees");
}

#[tokio::test]
async fn test_summary_totals() {
    let base = spawn_app(Arc::new(IndexedStorage::new()));
    let client = reqwest::Client::new();

    for month in [1, 2] {
        post(&client, format!("{base}/api/salaries"), json!({"amount": 5000, "month": month, "year": 2025})).await;
    }
    post(&client, format!("{base}/api/expenses"), json!({"amount": 1200, "category": "Rent", "month": 1, "year": 2025})).await;
    post(&client, format!("{base}/api/expenses"), json!({"amount": 700, "category": "Rent", "month": 1, "year": 2024})).await;

    let (status, summary) = get(&client, format!("{base}/api/summary?year=2025")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["totals"], json!({"income": 10000, "expenses": 1200, "net": 8800}));
    assert_eq!(summary["monthly"].as_array().unwrap().len(), 12);
    assert_eq!(summary["categories"][0]["amount"], 1200);

    let (_, all) = get(&client, format!("{base}/api/summary")).await;
    assert_eq!(all["totals"]["expenses"], 1900);

    let (status, _) = get(&client, format!("{base}/api/summary?year=next")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_disabled_metrics() {
    let base = spawn_app(Arc::new(ListStorage::new()));
    let client = reqwest::Client::new();

    let (status, body) = get(&client, format!("{base}/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let response = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_rendered_when_enabled() {
    let mut state = AppState::new(Arc::new(ListStorage::new()));
    state.metrics = Some(PrometheusBuilder::new().build_recorder().handle());
    let base = spawn_with_state(state);
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.is_ok());
}

/// Needs a live server at `FINTRACK_TEST_POSTGRES_URL`; skipped otherwise.
#[tokio::test(flavor = "multi_thread")]
async fn test_postgres_storage_released_off_runtime() {
    let url = match std::env::var("FINTRACK_TEST_POSTGRES_URL") {
        Ok(url) => url,
        Err(_) => return,
    };
    let config = StorageConfig {
        backend: BackendKind::Postgres,
        path: ":memory:".to_string(),
        url: Some(url),
    };
    let storage = tokio::task::spawn_blocking(move || storage::open(&config))
        .await
        .unwrap()
        .unwrap();

    let app = router(AppState::new(storage.clone()));
    drop(app);
    storage::close(storage).await;
}
