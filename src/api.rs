use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{MatchedPath, Path, Query, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use fintrack_core::{Category, Expense, NewExpense, NewSalary, Salary, SalaryPatch};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::ApiError,
    storage::{StorageBackend, StorageError},
    summary::Summary,
    validation::{parse_body, parse_param, validate},
};

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageBackend>,
    /// Present when a Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage, metrics: None }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/salaries", get(list_salaries).post(create_salary))
        .route("/api/salaries/:id", put(update_salary))
        .route("/api/expenses", get(list_expenses).post(create_expense))
        .route("/api/categories", get(list_categories))
        .route("/api/summary", get(summary))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .route_layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Runs a storage call off the async workers; the durable drivers block.
async fn with_storage<T, F>(storage: &Arc<dyn StorageBackend>, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn StorageBackend) -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    let storage = storage.clone();
    let result = tokio::task::spawn_blocking(move || op(storage.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(result?)
}

async fn track_requests<B>(req: Request<B>, next: Next<B>) -> Response {
    let route = req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = req.method().to_string();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics::increment_counter!("fintrack_requests_total", "method" => method, "route" => route, "status" => status);
    response
}

async fn list_salaries(State(state): State<AppState>) -> Result<Json<Vec<Salary>>, ApiError> {
    let salaries = with_storage(&state.storage, |s| s.list_salaries()).await?;
    Ok(Json(salaries))
}

async fn create_salary(State(state): State<AppState>, body: Bytes) -> Result<Json<Salary>, ApiError> {
    let salary: NewSalary = validate(&parse_body(&body)?)?;
    let created = with_storage(&state.storage, move |s| s.create_salary(&salary)).await?;
    metrics::increment_counter!("fintrack_records_created_total", "kind" => "salary");
    Ok(Json(created))
}

async fn update_salary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Salary>, ApiError> {
    let id = parse_param("id", &id)?;
    let patch: SalaryPatch = validate(&parse_body(&body)?)?;
    let updated = with_storage(&state.storage, move |s| s.update_salary(id, &patch)).await?;
    Ok(Json(updated))
}

async fn list_expenses(State(state): State<AppState>) -> Result<Json<Vec<Expense>>, ApiError> {
    let expenses = with_storage(&state.storage, |s| s.list_expenses()).await?;
    Ok(Json(expenses))
}

async fn create_expense(State(state): State<AppState>, body: Bytes) -> Result<Json<Expense>, ApiError> {
    let expense: NewExpense = validate(&parse_body(&body)?)?;
    let created = with_storage(&state.storage, move |s| s.create_expense(&expense)).await?;
    metrics::increment_counter!("fintrack_records_created_total", "kind" => "expense");
    Ok(Json(created))
}

async fn list_categories() -> Json<Vec<&'static str>> {
    Json(Category::ALL.iter().map(Category::as_str).collect())
}

#[derive(Debug, Deserialize)]
struct SummaryParams {
    year: Option<String>,
}

async fn summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<Summary>, ApiError> {
    let year = params.year
        .as_deref()
        .map(|raw| parse_param("year", raw))
        .transpose()?;
    let (salaries, expenses) = with_storage(&state.storage, |s| {
        Ok((s.list_salaries()?, s.list_expenses()?))
    })
    .await?;
    Ok(Json(Summary::build(&salaries, &expenses, year)))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
