use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::calendar::{parse_date, parse_month, MonthRange};
use crate::config::Config;
use crate::roster::{Doctor, ShiftRecord};
use crate::schedule::summary::DoctorShiftCount;
use crate::schedule::{DistributionPlan, ShiftConflict};
use crate::store::RosterStore;
use crate::workflow::{clear_month, distribute_month, month_conflicts, month_counts};

/// Per-month mutexes serializing read-compute-write sequences. Entries
/// nobody holds or waits on are dropped on the next acquire.
#[derive(Debug, Clone, Default)]
pub struct RangeLocks {
    inner: Arc<std::sync::Mutex<HashMap<MonthRange, Arc<Mutex<()>>>>>,
}

impl RangeLocks {
    pub async fn acquire(&self, month: MonthRange) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = match self.inner.lock() {
                Ok(map) => map,
                Err(poisoned) => poisoned.into_inner(),
            };
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(month).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Locks every month in ascending order, so callers holding several
    /// months cannot deadlock each other.
    pub async fn acquire_all(&self, months: BTreeSet<MonthRange>) -> Vec<OwnedMutexGuard<()>> {
        let mut guards = Vec::with_capacity(months.len());
        for month in months {
            guards.push(self.acquire(month).await);
        }
        guards
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        match self.inner.lock() {
            Ok(map) => map.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

#[derive(Clone)]
struct ApiState {
    config: Config,
    db_path: PathBuf,
    locks: RangeLocks,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "request failed");
        }
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct MonthQuery {
    month: String,
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    shifts: Vec<ShiftRecord>,
}

#[derive(Debug, Serialize)]
struct BatchResponse {
    written: usize,
}

#[derive(Debug, Deserialize)]
struct DistributeRequest {
    month: String,
    seed: Option<u64>,
    #[serde(default)]
    dry_run: bool,
}

#[derive(Debug, Serialize)]
struct ClearResponse {
    month: String,
    cleared: usize,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let state = ApiState {
        db_path: config.resolved_db_path(),
        config,
        locks: RangeLocks::default(),
    };
    // fail fast on an unusable database path
    RosterStore::open(&state.db_path)?;

    let app = Router::new()
        .route("/health", get(health))
        .route("/v1/config", get(show_config))
        .route("/v1/doctors", get(doctors))
        .route("/v1/shifts", get(shifts).put(put_shifts))
        .route("/v1/distribute", post(distribute))
        .route("/v1/conflicts", get(conflicts))
        .route("/v1/clear", post(clear))
        .route("/v1/counts", get(counts))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse { status: "ok" })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config)
}

async fn doctors(State(state): State<ApiState>) -> ApiResult<Vec<Doctor>> {
    let store = open_store(&state)?;
    Ok(ok(store.list_doctors().map_err(ApiError::internal)?))
}

async fn shifts(
    State(state): State<ApiState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Vec<ShiftRecord>> {
    let from = parse_date(&query.from).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let to = parse_date(&query.to).map_err(|e| ApiError::bad_request(e.to_string()))?;
    if from > to {
        return Err(ApiError::bad_request("`from` must not be after `to`"));
    }
    let store = open_store(&state)?;
    Ok(ok(store
        .shifts_in_range(from, to)
        .map_err(ApiError::internal)?))
}

/// Holds the lock of every month the batch touches, so a manual edit cannot
/// land between a distribution's read and its write.
async fn put_shifts(
    State(state): State<ApiState>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<BatchResponse> {
    let _guards = state.locks.acquire_all(batch_months(&request.shifts)).await;
    let store = open_store(&state)?;
    let written = store
        .upsert_shifts(&request.shifts)
        .map_err(ApiError::internal)?;
    Ok(ok(BatchResponse { written }))
}

async fn distribute(
    State(state): State<ApiState>,
    Json(request): Json<DistributeRequest>,
) -> ApiResult<DistributionPlan> {
    let month = month_param(&request.month)?;
    let _guard = state.locks.acquire(month).await;
    let store = open_store(&state)?;
    let plan = distribute_month(&store, &state.config, month, request.seed, request.dry_run)
        .map_err(ApiError::internal)?;
    Ok(ok(plan))
}

async fn conflicts(
    State(state): State<ApiState>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Vec<ShiftConflict>> {
    let month = month_param(&query.month)?;
    let store = open_store(&state)?;
    Ok(ok(month_conflicts(&store, month).map_err(ApiError::internal)?))
}

async fn clear(
    State(state): State<ApiState>,
    Json(request): Json<MonthQuery>,
) -> ApiResult<ClearResponse> {
    let month = month_param(&request.month)?;
    let _guard = state.locks.acquire(month).await;
    let store = open_store(&state)?;
    let cleared = clear_month(&store, month).map_err(ApiError::internal)?;
    Ok(ok(ClearResponse {
        month: month.to_string(),
        cleared,
    }))
}

async fn counts(
    State(state): State<ApiState>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Vec<DoctorShiftCount>> {
    let month = month_param(&query.month)?;
    let store = open_store(&state)?;
    Ok(ok(month_counts(&store, month).map_err(ApiError::internal)?))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

fn open_store(state: &ApiState) -> std::result::Result<RosterStore, ApiError> {
    RosterStore::open(&state.db_path).map_err(ApiError::internal)
}

fn batch_months(records: &[ShiftRecord]) -> BTreeSet<MonthRange> {
    records.iter().map(|r| MonthRange::of(r.date)).collect()
}

fn month_param(raw: &str) -> std::result::Result<MonthRange, ApiError> {
    parse_month(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}
