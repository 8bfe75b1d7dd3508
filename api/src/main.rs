//! OpenFiber API - Main Entry Point

use std::sync::Arc;

use openfiber_api::{build_router, ApiState, PlatformConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fiber_billing::infrastructure::gateway::NoopRouterGateway;
use fiber_billing::{
    BillingCalendar, BillingPlatform, Router, RouterControlGateway, RouterRepository,
};
use fiber_mikrotik::MikrotikRestGateway;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("OpenFiber API v{}", env!("CARGO_PKG_VERSION"));

    // Load config
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "/etc/openfiber/platform.json".into());

    let config = PlatformConfig::load(&config_path).unwrap_or_else(|_| {
        tracing::warn!("Config not found, using defaults");
        PlatformConfig::default()
    });

    // Gateway: RouterOS devices when configured, otherwise the noop gateway.
    let gateway: Arc<dyn RouterControlGateway> = if config.routers.is_empty() {
        tracing::warn!("No RouterOS devices configured, using noop gateway");
        Arc::new(NoopRouterGateway::new())
    } else {
        Arc::new(MikrotikRestGateway::new(
            config.routers.clone(),
            config.gateway_timeout_secs,
        ))
    };

    let calendar = BillingCalendar::with_offset_hours(config.business_offset_hours);
    let platform = Arc::new(BillingPlatform::in_memory(gateway, calendar));

    // Seed the router store from config so intake can resolve references.
    for device in &config.routers {
        platform
            .routers
            .save(&Router::new(device.name.as_str(), device.base_url.as_str()))
            .await?;
    }

    let app = build_router(ApiState::new(platform));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("Listening on {}", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
