//! Suspension endpoints: scheduled cycle and manual per-subscriber control.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use fiber_billing::{
    AccountStatusReport, SingleActionResult, SuspensionRunOutcome, SuspensionUseCases,
};

use crate::models::{ApiResponse, TargetRequest};
use crate::ApiState;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/run", post(run_cycle))
        .route("/suspend", post(suspend_one))
        .route("/reinstate", post(reinstate_one))
        .route("/status/:pattern", get(check_one))
}

/// Run the grace-period suspension cycle.
///
/// No-op outside the suspension day; idempotent when re-run on it.
#[utoipa::path(
    post,
    path = "/api/v1/suspension/run",
    responses((status = 200, description = "Cycle summary or not-suspension-day")),
    tag = "suspension"
)]
pub async fn run_cycle(
    State(state): State<Arc<ApiState>>,
) -> Json<ApiResponse<SuspensionRunOutcome>> {
    match state.platform.suspension.run_suspension_cycle().await {
        Ok(outcome) => Json(ApiResponse::success(outcome)),
        Err(err) => Json(ApiResponse::from_use_case_error(&err)),
    }
}

/// Disable one subscriber's PPP account, by id or name substring.
#[utoipa::path(
    post,
    path = "/api/v1/suspension/suspend",
    request_body = TargetRequest,
    responses((status = 200, description = "Single-subscriber result")),
    tag = "suspension"
)]
pub async fn suspend_one(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<TargetRequest>,
) -> Json<ApiResponse<SingleActionResult>> {
    match state.platform.suspension.suspend_one(&request.pattern).await {
        Ok(result) => Json(ApiResponse::success(result)),
        Err(err) => Json(ApiResponse::from_use_case_error(&err)),
    }
}

/// Re-enable one subscriber's PPP account, by id or name substring.
#[utoipa::path(
    post,
    path = "/api/v1/suspension/reinstate",
    request_body = TargetRequest,
    responses((status = 200, description = "Single-subscriber result")),
    tag = "suspension"
)]
pub async fn reinstate_one(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<TargetRequest>,
) -> Json<ApiResponse<SingleActionResult>> {
    match state
        .platform
        .suspension
        .reinstate_one(&request.pattern)
        .await
    {
        Ok(result) => Json(ApiResponse::success(result)),
        Err(err) => Json(ApiResponse::from_use_case_error(&err)),
    }
}

/// Query the device for one subscriber's PPP account state.
#[utoipa::path(
    get,
    path = "/api/v1/suspension/status/{pattern}",
    params(("pattern" = String, Path, description = "Subscriber id or name substring")),
    responses((status = 200, description = "Device-side account state")),
    tag = "suspension"
)]
pub async fn check_one(
    State(state): State<Arc<ApiState>>,
    Path(pattern): Path<String>,
) -> Json<ApiResponse<AccountStatusReport>> {
    match state.platform.suspension.check_one(&pattern).await {
        Ok(report) => Json(ApiResponse::success(report)),
        Err(err) => Json(ApiResponse::from_use_case_error(&err)),
    }
}
