//! Billing endpoints: invoice run, proration preview, payment recording.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use fiber_billing::{
    BillingUseCases, EntityId, InvoiceRunSummary, Money, PaymentOutcome, PaymentUseCases,
    Proration,
};

use crate::models::{ApiResponse, ProrationPreviewParams, RecordPaymentRequest};
use crate::ApiState;

use super::parse_period_unit;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/run", post(run_billing))
        .route("/proration-preview", get(proration_preview))
        .route("/payments", post(record_payment))
}

/// Run the monthly invoice batch.
///
/// Returns 200 when the batch ran to completion; per-subscriber failures are
/// embedded in the summary.
#[utoipa::path(
    post,
    path = "/api/v1/billing/run",
    responses((status = 200, description = "Invoice run summary")),
    tag = "billing"
)]
pub async fn run_billing(
    State(state): State<Arc<ApiState>>,
) -> Json<ApiResponse<InvoiceRunSummary>> {
    match state.platform.invoicing.generate_monthly_invoices().await {
        Ok(summary) => Json(ApiResponse::success(summary)),
        Err(err) => Json(ApiResponse::from_use_case_error(&err)),
    }
}

/// Preview a first-month proration. Pure; no side effects.
#[utoipa::path(
    get,
    path = "/api/v1/billing/proration-preview",
    responses((status = 200, description = "Proration preview")),
    tag = "billing"
)]
pub async fn proration_preview(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<ProrationPreviewParams>,
) -> Json<ApiResponse<Proration>> {
    let preview = state.platform.invoicing.preview_proration(
        params.activation_date,
        Money::from_units(params.package_price),
        parse_period_unit(params.period_unit.as_deref()),
    );
    Json(ApiResponse::success(preview))
}

/// Record an invoice payment.
///
/// Drives the billing state machine, including the auto-reinstatement
/// attempt for suspended subscribers.
#[utoipa::path(
    post,
    path = "/api/v1/billing/payments",
    request_body = RecordPaymentRequest,
    responses((status = 200, description = "Payment outcome")),
    tag = "billing"
)]
pub async fn record_payment(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<RecordPaymentRequest>,
) -> Json<ApiResponse<PaymentOutcome>> {
    let invoice_id = EntityId::from_string(&request.invoice_id);
    match state.platform.payments.record_payment(&invoice_id).await {
        Ok(outcome) => Json(ApiResponse::success(outcome)),
        Err(err) => Json(ApiResponse::from_use_case_error(&err)),
    }
}
