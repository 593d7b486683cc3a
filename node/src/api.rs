//! HTTP API for the asset ledger node

use assetledger_asset::Asset;
use assetledger_core::{LedgerError, LedgerResult};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::runtime::NodeRuntime;

/// API state containing node runtime
pub type ApiState = Arc<NodeRuntime>;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// JSON body extractor that reports rejections in the response envelope
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiResponse<()>>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err((rejection.status(), Json(ApiResponse::err(rejection.body_text())))),
        }
    }
}

/// Create/update acknowledgement
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    #[serde(rename = "dealerID")]
    pub dealer_id: String,
    pub state_version: u64,
    pub message: String,
}

/// History query options
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    /// Include transaction ID, version and timestamp per entry
    #[serde(default)]
    pub meta: bool,
}

/// Create API router
pub fn create_router(state: ApiState) -> Router {
    let enable_cors = state.config().api.enable_cors;

    let router = Router::new()
        // Health
        .route("/health", get(health))
        .route("/status", get(status))
        // Assets
        .route("/asset", post(create_asset).put(update_asset))
        .route("/asset/:id", get(read_asset))
        .route("/asset/:id/history", get(asset_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// HTTP status for a failed contract operation
pub fn status_code(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::AlreadyExists { .. } => StatusCode::CONFLICT,
        LedgerError::Encode { .. } | LedgerError::KeyMismatch { .. } => StatusCode::BAD_REQUEST,
        LedgerError::Decode { .. }
        | LedgerError::StoreIo { .. }
        | LedgerError::Config(_)
        | LedgerError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response<T: Serialize>(err: LedgerError) -> (StatusCode, Json<ApiResponse<T>>) {
    (status_code(&err), Json(ApiResponse::err(err)))
}

/// Run a runtime call on the blocking pool
///
/// Writers wait on the runtime lock and may fsync, so they stay off the
/// async workers.
pub async fn run_blocking<T, F>(runtime: ApiState, f: F) -> LedgerResult<T>
where
    F: FnOnce(&NodeRuntime) -> LedgerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&runtime))
        .await
        .map_err(|e| LedgerError::Other(anyhow::anyhow!("runtime task failed: {}", e)))?
}

/// Health check
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// Node status
async fn status(State(runtime): State<ApiState>) -> impl IntoResponse {
    Json(ApiResponse::ok(runtime.status()))
}

/// Create asset
async fn create_asset(
    State(runtime): State<ApiState>,
    ApiJson(req): ApiJson<Asset>,
) -> impl IntoResponse {
    let dealer_id = req.dealer_id.clone();
    let result = run_blocking(runtime, move |rt| rt.create_asset(&req.dealer_id, req.fields())).await;

    match result {
        Ok(version) => (
            StatusCode::CREATED,
            Json(ApiResponse::ok(WriteResponse {
                dealer_id,
                state_version: version.0,
                message: "Asset created successfully".to_string(),
            })),
        ),
        Err(e) => error_response(e),
    }
}

/// Update asset
async fn update_asset(
    State(runtime): State<ApiState>,
    ApiJson(req): ApiJson<Asset>,
) -> impl IntoResponse {
    let dealer_id = req.dealer_id.clone();
    let result = run_blocking(runtime, move |rt| rt.update_asset(&req.dealer_id, req.fields())).await;

    match result {
        Ok(version) => (
            StatusCode::OK,
            Json(ApiResponse::ok(WriteResponse {
                dealer_id,
                state_version: version.0,
                message: "Asset updated successfully".to_string(),
            })),
        ),
        Err(e) => error_response(e),
    }
}

/// Read asset
async fn read_asset(
    State(runtime): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match run_blocking(runtime, move |rt| rt.read_asset(&id)).await {
        Ok(asset) => (StatusCode::OK, Json(ApiResponse::ok(asset))),
        Err(e) => error_response(e),
    }
}

/// Asset history, oldest first
async fn asset_history(
    State(runtime): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Response {
    if params.meta {
        match run_blocking(runtime, move |rt| rt.get_asset_history_entries(&id)).await {
            Ok(entries) => Json(ApiResponse::ok(entries)).into_response(),
            Err(e) => error_response::<()>(e).into_response(),
        }
    } else {
        match run_blocking(runtime, move |rt| rt.get_asset_history(&id)).await {
            Ok(assets) => Json(ApiResponse::ok(assets)).into_response(),
            Err(e) => error_response::<()>(e).into_response(),
        }
    }
}

/// Start API server
pub async fn start_api_server(runtime: Arc<NodeRuntime>, listen_addr: &str) -> anyhow::Result<()> {
    let router = create_router(runtime);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("API server listening on {}", listen_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
