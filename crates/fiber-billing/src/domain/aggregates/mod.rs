//! Aggregates module
//!
//! Rich aggregate roots with encapsulated business logic. Subscriber owns its
//! addon items; invoices reference the subscriber; ODP slot counts are only
//! mutated through the slot-accounting operations.

pub mod addon;
pub mod invoice;
pub mod odp;
pub mod router;
pub mod subscriber;

pub use addon::{AddonCharge, AddonItem, AddonType};
pub use invoice::{Invoice, InvoiceBreakdown, InvoiceError, InvoiceKind, InvoiceStatus, PackageCharge};
pub use odp::{Odp, OdpError};
pub use router::Router;
pub use subscriber::{
    AccountStatus, BillingStatus, BillingType, PeriodUnit, RouterAccountStatus, ServiceStatus,
    Subscriber, SubscriberError,
};
