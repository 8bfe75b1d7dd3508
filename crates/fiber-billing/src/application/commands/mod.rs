//! Command handlers
//!
//! Application services that orchestrate the billing use cases over the
//! outbound ports.

pub mod billing;
pub mod payment;
pub mod slots;
pub mod suspension;

pub use billing::InvoiceService;
pub use payment::PaymentService;
pub use slots::SlotService;
pub use suspension::SuspensionService;

use std::sync::Arc;

use crate::domain::aggregates::{Router, Subscriber};
use crate::ports::inbound::UseCaseError;
use crate::ports::outbound::{RepositoryError, RouterRepository};

/// Resolve a subscriber's PPP account name and router device. A missing
/// account name or an unresolvable router reference is a configuration gap:
/// the remote operation is skipped, never attempted.
pub(crate) async fn resolve_router_account(
    subscriber: &Subscriber,
    routers: &Arc<dyn RouterRepository>,
) -> Result<(String, Router), UseCaseError> {
    let account = subscriber
        .router_account_name()
        .ok_or_else(|| {
            UseCaseError::ConfigurationGap(format!(
                "subscriber {} has no PPP account name",
                subscriber.sequence()
            ))
        })?
        .to_string();

    let router_ref = subscriber.router_ref().ok_or_else(|| {
        UseCaseError::ConfigurationGap(format!(
            "subscriber {} has no router reference",
            subscriber.sequence()
        ))
    })?;

    let router = routers
        .find_by_id(router_ref)
        .await
        .map_err(persistence)?
        .ok_or_else(|| {
            UseCaseError::ConfigurationGap(format!(
                "router {} of subscriber {} is not resolvable",
                router_ref,
                subscriber.sequence()
            ))
        })?;

    Ok((account, router))
}

pub(crate) fn persistence(err: RepositoryError) -> UseCaseError {
    UseCaseError::Persistence(err.to_string())
}
