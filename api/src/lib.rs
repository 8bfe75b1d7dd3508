//! OpenFiber Subscriber Platform API
//!
//! Thin HTTP adapter over the billing core: the trigger surface for the
//! external scheduler (invoice run, suspension cycle) and the operator
//! (manual suspend/reinstate, proration preview, subscriber intake). No
//! business logic lives here.

pub mod config;
pub mod models;
pub mod routes;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use fiber_billing::BillingPlatform;

pub use config::PlatformConfig;
pub use models::*;

/// API state
pub struct ApiState {
    /// Wired billing platform
    pub platform: Arc<BillingPlatform>,
    /// Subscriber sequence counter
    pub next_sequence: AtomicU64,
}

impl ApiState {
    pub fn new(platform: Arc<BillingPlatform>) -> Self {
        Self {
            platform,
            next_sequence: AtomicU64::new(1),
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "OpenFiber API",
        version = "0.1.0",
        description = "OpenFiber Subscriber Platform - billing and suspension control",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::health::health_check,
        routes::billing::run_billing,
        routes::billing::proration_preview,
        routes::billing::record_payment,
        routes::suspension::run_cycle,
        routes::suspension::suspend_one,
        routes::suspension::reinstate_one,
        routes::suspension::check_one,
        routes::subscribers::create_subscriber,
        routes::subscribers::reassign_slot,
        routes::subscribers::remove_subscriber,
    ),
    components(
        schemas(
            ErrorResponse,
            RecordPaymentRequest, ProrationPreviewParams, TargetRequest,
            SubscriberCreate, AddonCreate, SubscriberView, ReassignSlotRequest
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "billing", description = "Invoice generation and payments"),
        (name = "suspension", description = "Grace-period suspension control"),
        (name = "subscribers", description = "Subscriber intake and slot accounting")
    )
)]
pub struct ApiDoc;

/// Build the API router
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", api_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

fn api_routes() -> Router<Arc<ApiState>> {
    Router::new()
        .nest("/billing", routes::billing::router())
        .nest("/suspension", routes::suspension::router())
        .nest("/subscribers", routes::subscribers::router())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn test_server() -> TestServer {
        let state = ApiState::new(Arc::new(BillingPlatform::default()));
        TestServer::new(build_router(state)).expect("test server")
    }

    #[tokio::test]
    async fn test_health() {
        let server = test_server();
        let response = server.get("/health").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_proration_preview() {
        let server = test_server();
        let response = server
            .get("/api/v1/billing/proration-preview")
            .add_query_param("activation_date", "2024-06-20")
            .add_query_param("package_price", "300000")
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["applied"], true);
        assert_eq!(body["data"]["remaining_days"], 11);
    }

    #[tokio::test]
    async fn test_subscriber_intake_and_billing_run() {
        let server = test_server();

        let response = server
            .post("/api/v1/subscribers")
            .json(&json!({
                "name": "Budi Santoso",
                "package_name": "Home 20 Mbps",
                "package_price": 300000,
                "activation_date": "2024-05-01",
            }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["service_status"], "active");

        let run: Value = server.post("/api/v1/billing/run").await.json();
        assert_eq!(run["success"], true);
        assert_eq!(run["data"]["created_count"], 1);
    }

    #[tokio::test]
    async fn test_suspend_unknown_subscriber_reports_not_found() {
        let server = test_server();
        let response = server
            .post("/api/v1/suspension/suspend")
            .json(&json!({ "pattern": "nobody" }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
