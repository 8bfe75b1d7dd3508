//! OpenFiber Subscriber Billing (OFSB)
//!
//! Billing cycle and service-suspension core for the subscriber platform.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SUBSCRIBER BILLING (OFSB)                          │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐ │
//! │  │  Proration   │  │   Invoice    │  │ Grace-Period │  │    Slot     │ │
//! │  │  Calculator  │  │  Generation  │  │  Suspension  │  │ Accounting  │ │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 SUBSCRIBER BILLING STATE                         │   │
//! │  │   unpaid ─► paid ─► unpaid | unpaid ─► suspended ─► paid          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐                  │
//! │  │  Subscriber  │  │   Invoice    │  │    Router    │                  │
//! │  │  Directory   │  │    Ledger    │  │   Gateway    │   (ports)       │
//! │  └──────────────┘  └──────────────┘  └──────────────┘                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The core registers no timers: an external scheduler owns timing and calls
//! the inbound use cases.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

// Re-exports for convenience
pub use application::dto::{
    AccountStatusReport, InvoiceRunSummary, PaymentOutcome, SingleActionResult,
    SuspensionRunOutcome, SuspensionRunSummary,
};
pub use application::{InvoiceService, PaymentService, SlotService, SuspensionService};
pub use domain::aggregates::{
    AddonItem, AddonType, BillingStatus, BillingType, Invoice, InvoiceKind, InvoiceStatus, Odp,
    PeriodUnit, Router, RouterAccountStatus, ServiceStatus, Subscriber,
};
pub use domain::services::{BillingCalendar, Proration, ProrationCalculator};
pub use fiber_common::{Currency, EntityId, Money};
pub use ports::inbound::{
    BillingUseCases, PaymentUseCases, SlotUseCases, SuspensionUseCases, UseCaseError,
};
pub use ports::outbound::{
    Clock, EventPublisher, GatewayAck, GatewayError, InvoiceRepository, OdpRepository,
    PppAccountStatus, RepositoryError, RouterControlGateway, RouterRepository,
    SubscriberRepository,
};

use std::sync::Arc;

use infrastructure::gateway::NoopRouterGateway;
use infrastructure::persistence::{
    InMemoryInvoiceRepository, InMemoryOdpRepository, InMemoryRouterRepository,
    InMemorySubscriberRepository, NoOpEventPublisher,
};
use infrastructure::SystemClock;

/// Billing platform: the wired application services plus the stores the thin
/// adapters need for subscriber intake.
pub struct BillingPlatform {
    /// Invoice generation
    pub invoicing: Arc<InvoiceService>,
    /// Payment recording and auto-reinstatement
    pub payments: Arc<PaymentService>,
    /// Grace-period suspension engine
    pub suspension: Arc<SuspensionService>,
    /// ODP slot accounting
    pub slots: Arc<SlotService>,
    /// Subscriber directory store
    pub subscribers: Arc<dyn SubscriberRepository>,
    /// Invoice ledger
    pub invoices: Arc<dyn InvoiceRepository>,
    /// ODP store
    pub odps: Arc<dyn OdpRepository>,
    /// Router store
    pub routers: Arc<dyn RouterRepository>,
}

impl BillingPlatform {
    /// Wire the platform over the given ports.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        odps: Arc<dyn OdpRepository>,
        routers: Arc<dyn RouterRepository>,
        gateway: Arc<dyn RouterControlGateway>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        calendar: BillingCalendar,
    ) -> Self {
        let invoicing = Arc::new(InvoiceService::new(
            subscribers.clone(),
            invoices.clone(),
            publisher.clone(),
            clock.clone(),
            calendar,
        ));
        let payments = Arc::new(PaymentService::new(
            subscribers.clone(),
            invoices.clone(),
            routers.clone(),
            gateway.clone(),
            publisher.clone(),
            clock.clone(),
        ));
        let suspension = Arc::new(SuspensionService::new(
            subscribers.clone(),
            invoices.clone(),
            routers.clone(),
            gateway,
            publisher.clone(),
            clock,
            calendar,
        ));
        let slots = Arc::new(SlotService::new(
            subscribers.clone(),
            odps.clone(),
            publisher,
        ));

        Self {
            invoicing,
            payments,
            suspension,
            slots,
            subscribers,
            invoices,
            odps,
            routers,
        }
    }

    /// In-memory wiring with the given gateway: the development and test
    /// deployment shape.
    pub fn in_memory(gateway: Arc<dyn RouterControlGateway>, calendar: BillingCalendar) -> Self {
        Self::new(
            Arc::new(InMemorySubscriberRepository::new()),
            Arc::new(InMemoryInvoiceRepository::new()),
            Arc::new(InMemoryOdpRepository::new()),
            Arc::new(InMemoryRouterRepository::new()),
            gateway,
            Arc::new(NoOpEventPublisher),
            Arc::new(SystemClock::new()),
            calendar,
        )
    }
}

impl Default for BillingPlatform {
    fn default() -> Self {
        Self::in_memory(Arc::new(NoopRouterGateway::new()), BillingCalendar::default())
    }
}
