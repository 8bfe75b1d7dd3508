//! Inbound ports
//!
//! The trigger surface exposed to the HTTP adapter and the external
//! scheduler: application service interfaces and their error type.

use async_trait::async_trait;
use chrono::NaiveDate;
use fiber_common::{EntityId, Money};

use crate::application::dto::{
    AccountStatusReport, InvoiceRunSummary, PaymentOutcome, SingleActionResult,
    SuspensionRunOutcome,
};
use crate::domain::aggregates::PeriodUnit;
use crate::domain::services::Proration;

/// Invoice generation use cases
#[async_trait]
pub trait BillingUseCases: Send + Sync {
    /// Run the monthly invoice batch. Per-subscriber failures are reported in
    /// the summary, never raised.
    async fn generate_monthly_invoices(&self) -> Result<InvoiceRunSummary, UseCaseError>;

    /// Pure proration preview; no side effects.
    fn preview_proration(
        &self,
        activation_date: NaiveDate,
        package_price: Money,
        unit: PeriodUnit,
    ) -> Proration;
}

/// Payment recording use cases
#[async_trait]
pub trait PaymentUseCases: Send + Sync {
    /// Mark an invoice paid and drive the billing state machine, including
    /// the auto-reinstatement attempt.
    async fn record_payment(&self, invoice_id: &EntityId) -> Result<PaymentOutcome, UseCaseError>;
}

/// Suspension engine use cases
#[async_trait]
pub trait SuspensionUseCases: Send + Sync {
    /// Run the grace-period suspension cycle. No-op off the suspension day.
    async fn run_suspension_cycle(&self) -> Result<SuspensionRunOutcome, UseCaseError>;

    /// Disable one subscriber's PPP account, addressed by id or
    /// case-insensitive name substring.
    async fn suspend_one(&self, pattern: &str) -> Result<SingleActionResult, UseCaseError>;

    /// Re-enable one subscriber's PPP account.
    async fn reinstate_one(&self, pattern: &str) -> Result<SingleActionResult, UseCaseError>;

    /// Query the device for one subscriber's PPP account state.
    async fn check_one(&self, pattern: &str) -> Result<AccountStatusReport, UseCaseError>;
}

/// Slot-accounting use cases
#[async_trait]
pub trait SlotUseCases: Send + Sync {
    /// Put the subscriber on a slot of the given ODP.
    async fn assign(&self, subscriber_id: &EntityId, odp_id: &EntityId)
        -> Result<(), UseCaseError>;

    /// Move the subscriber to another ODP as one atomic slot transfer.
    async fn reassign(
        &self,
        subscriber_id: &EntityId,
        new_odp_id: &EntityId,
    ) -> Result<(), UseCaseError>;

    /// Give the subscriber's slot back.
    async fn release(&self, subscriber_id: &EntityId) -> Result<(), UseCaseError>;
}

/// Use case errors, following the platform error taxonomy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UseCaseError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Subscriber lacks a PPP account name or a resolvable router; the
    /// remote operation was skipped, not attempted.
    #[error("configuration gap: {0}")]
    ConfigurationGap(String),

    /// The gateway call failed or timed out; retried on the next cycle.
    #[error("remote gateway failure: {0}")]
    RemoteGateway(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("validation error: {0}")]
    Validation(String),
}
