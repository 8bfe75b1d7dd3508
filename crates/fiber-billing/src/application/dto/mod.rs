//! Data Transfer Objects (DTOs)
//!
//! Run summaries and per-item outcomes crossing the application boundary.
//! Batch jobs report per-item failures here instead of raising them.

use chrono::{DateTime, NaiveDate, Utc};
use fiber_common::Money;
use serde::{Deserialize, Serialize};

// =============================================================================
// Invoice run
// =============================================================================

/// Outcome of one monthly invoice batch
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InvoiceRunSummary {
    pub created_count: usize,
    pub invoices: Vec<IssuedInvoice>,
    pub skipped: Vec<SkippedSubscriber>,
    pub failures: Vec<SkippedSubscriber>,
}

/// One invoice issued during a billing run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssuedInvoice {
    pub invoice_id: String,
    pub number: String,
    pub subscriber_id: String,
    pub subscriber_name: String,
    pub amount: Money,
    pub prorated: bool,
}

// =============================================================================
// Suspension run
// =============================================================================

/// Outcome of one suspension cycle invocation
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SuspensionRunOutcome {
    /// Gate failed: today is not the suspension day.
    NotSuspensionDay { next_run_date: NaiveDate },
    /// The cycle ran to completion (individual items may still have failed).
    Completed(SuspensionRunSummary),
}

/// Structured summary of a completed suspension cycle
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuspensionRunSummary {
    pub suspended: Vec<SuspendedSubscriber>,
    pub skipped: Vec<SkippedSubscriber>,
    pub grace_period: GracePeriod,
}

/// A subscriber suspended this cycle, with the device's raw response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuspendedSubscriber {
    pub subscriber_id: String,
    pub name: String,
    pub account: String,
    pub remote_message: String,
}

/// A subscriber left untouched this run, with the reason
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SkippedSubscriber {
    pub subscriber_id: String,
    pub name: String,
    pub reason: SkipReason,
}

/// Why a batch item was not acted upon
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Idempotency short-circuit: an invoice for this period already exists.
    AlreadyBilled,
    /// No pending invoice inside the grace window; billed outside the normal
    /// cycle, explicitly not suspended.
    NoPendingInvoiceInGraceWindow,
    /// Missing PPP account name or unresolvable router reference.
    ConfigurationGap(String),
    /// The gateway call failed or timed out; candidate again next run.
    GatewayFailure(String),
    /// The store write failed; isolated to this subscriber.
    PersistenceFailure(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyBilled => write!(f, "already billed this period"),
            Self::NoPendingInvoiceInGraceWindow => {
                write!(f, "no pending invoice in grace window")
            }
            Self::ConfigurationGap(detail) => write!(f, "configuration gap: {}", detail),
            Self::GatewayFailure(detail) => write!(f, "gateway failure: {}", detail),
            Self::PersistenceFailure(detail) => write!(f, "persistence failure: {}", detail),
        }
    }
}

/// The grace-period window a suspension cycle evaluated, as UTC instants
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GracePeriod {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

// =============================================================================
// Single-subscriber actions
// =============================================================================

/// Result of a manual suspend/reinstate action
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SingleActionResult {
    pub subscriber_id: String,
    pub name: String,
    pub account: String,
    pub router: String,
    pub message: String,
}

/// Device-side PPP account state for one subscriber
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountStatusReport {
    pub subscriber_id: String,
    pub name: String,
    pub account: String,
    pub router: String,
    pub found: bool,
    pub disabled: bool,
    pub profile: Option<String>,
    pub service: Option<String>,
}

// =============================================================================
// Payment
// =============================================================================

/// Outcome of recording a payment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub invoice_id: String,
    pub subscriber_id: String,
    /// The invoice was already paid; nothing changed.
    pub already_paid: bool,
    /// A remote enable call was made.
    pub reinstate_attempted: bool,
    /// The remote enable call succeeded and the router account is active.
    pub reinstated: bool,
    /// Remote enable failure, surfaced for operator follow-up. Payment is
    /// honored regardless.
    pub enable_failure: Option<String>,
    /// Router account not addressable (missing account name or router).
    pub configuration_gap: Option<String>,
}
