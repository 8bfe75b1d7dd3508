//! Domain events raised by the billing aggregates.

use chrono::{DateTime, Utc};
use fiber_common::EntityId;
use serde::{Deserialize, Serialize};

/// Billing domain event
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BillingEvent {
    InvoiceIssued {
        subscriber_id: EntityId,
        invoice_id: EntityId,
        issued_at: DateTime<Utc>,
    },
    PaymentRecorded {
        subscriber_id: EntityId,
        paid_at: DateTime<Utc>,
    },
    ServiceSuspended {
        subscriber_id: EntityId,
        suspended_at: DateTime<Utc>,
    },
    ServiceReinstated {
        subscriber_id: EntityId,
        reinstated_at: DateTime<Utc>,
    },
    SlotAssigned {
        subscriber_id: EntityId,
        odp_id: EntityId,
    },
    SlotReleased {
        subscriber_id: EntityId,
        odp_id: EntityId,
    },
}
