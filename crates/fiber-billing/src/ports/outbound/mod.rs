//! Outbound ports
//!
//! Interfaces the infrastructure must implement: the subscriber directory
//! store, the invoice ledger, ODP/router lookups, the router control gateway
//! and the wall clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fiber_common::EntityId;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{Invoice, Odp, Router, Subscriber};
use crate::domain::events::BillingEvent;

/// Repository result type
pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Subscriber directory store port
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Find subscriber by ID
    async fn find_by_id(&self, id: &EntityId) -> RepoResult<Option<Subscriber>>;

    /// Find by exact id, or else by case-insensitive name substring
    /// (first match wins).
    async fn find_by_id_or_name(&self, pattern: &str) -> RepoResult<Option<Subscriber>>;

    /// Subscribers eligible for monthly invoice generation.
    async fn find_billable(&self) -> RepoResult<Vec<Subscriber>>;

    /// Candidate set of the grace-period suspension engine.
    async fn find_suspension_candidates(&self) -> RepoResult<Vec<Subscriber>>;

    /// Save subscriber (insert or update)
    async fn save(&self, subscriber: &Subscriber) -> RepoResult<()>;

    /// Delete subscriber
    async fn delete(&self, id: &EntityId) -> RepoResult<()>;
}

/// Invoice ledger port
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Find invoice by ID
    async fn find_by_id(&self, id: &EntityId) -> RepoResult<Option<Invoice>>;

    /// All invoices of one subscriber, newest first.
    async fn find_by_subscriber(&self, subscriber: &EntityId) -> RepoResult<Vec<Invoice>>;

    /// A payment-kind invoice for the subscriber created within the window,
    /// if any. Drives the once-per-calendar-month idempotency check.
    async fn find_payment_in_window(
        &self,
        subscriber: &EntityId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepoResult<Option<Invoice>>;

    /// Pending invoices for the subscriber created within the window. Drives
    /// the grace-window query of the suspension engine.
    async fn find_pending_in_window(
        &self,
        subscriber: &EntityId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepoResult<Vec<Invoice>>;

    /// Append a new invoice
    async fn create(&self, invoice: &Invoice) -> RepoResult<()>;

    /// Update an existing invoice
    async fn update(&self, invoice: &Invoice) -> RepoResult<()>;

    /// Remove an invoice. Only used to compensate a failed billing unit of
    /// work; the ledger is otherwise append-only.
    async fn delete(&self, id: &EntityId) -> RepoResult<()>;
}

/// ODP store port
#[async_trait]
pub trait OdpRepository: Send + Sync {
    async fn find_by_id(&self, id: &EntityId) -> RepoResult<Option<Odp>>;
    async fn save(&self, odp: &Odp) -> RepoResult<()>;
    async fn list(&self) -> RepoResult<Vec<Odp>>;
}

/// Router store port
#[async_trait]
pub trait RouterRepository: Send + Sync {
    async fn find_by_id(&self, id: &EntityId) -> RepoResult<Option<Router>>;
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Router>>;
    async fn save(&self, router: &Router) -> RepoResult<()>;
    async fn list(&self) -> RepoResult<Vec<Router>>;
}

/// Acknowledgement from the router control gateway, carrying the device's
/// raw message for operator diagnosis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayAck {
    pub message: String,
}

/// PPP account status as reported by the device
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PppAccountStatus {
    pub found: bool,
    pub disabled: bool,
    pub profile: Option<String>,
    pub service: Option<String>,
}

/// Gateway failure. A timeout is the same outcome as an explicit error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("router {router} unreachable: {message}")]
    Unreachable { router: String, message: String },

    #[error("router {router} rejected the request: {message}")]
    Rejected { router: String, message: String },

    #[error("call to router {router} timed out after {seconds}s")]
    Timeout { router: String, seconds: u64 },
}

/// Router control gateway port. All calls are bounded by the adapter's
/// configured timeout.
#[async_trait]
pub trait RouterControlGateway: Send + Sync {
    /// Re-enable the subscriber's PPP account on the given router.
    async fn enable(&self, router: &Router, account: &str) -> Result<GatewayAck, GatewayError>;

    /// Disable the subscriber's PPP account on the given router.
    async fn disable(&self, router: &Router, account: &str) -> Result<GatewayAck, GatewayError>;

    /// Report the current state of the PPP account on the given router.
    async fn check_status(
        &self,
        router: &Router,
        account: &str,
    ) -> Result<PppAccountStatus, GatewayError>;
}

/// Wall clock port, injected so the calendar-gated jobs are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Event publisher port
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish domain events
    async fn publish(&self, events: Vec<BillingEvent>) -> RepoResult<()>;
}
