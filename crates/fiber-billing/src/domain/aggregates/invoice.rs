//! Invoice Aggregate
//!
//! Billing-period invoices created by the invoice generator. An invoice is
//! immutable once paid.

use chrono::{DateTime, NaiveDate, Utc};
use fiber_common::{EntityId, Money};
use serde::{Deserialize, Serialize};

use super::addon::AddonCharge;

/// Invoice aggregate root
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Invoice {
    id: EntityId,
    number: String,
    subscriber_ref: EntityId,
    amount: Money,
    kind: InvoiceKind,
    period_from: NaiveDate,
    period_to: NaiveDate,
    status: InvoiceStatus,
    due_date: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    breakdown: InvoiceBreakdown,
    created_at: DateTime<Utc>,
}

impl Invoice {
    /// Issue a new pending invoice.
    #[allow(clippy::too_many_arguments)]
    pub fn issue(
        number: String,
        subscriber_ref: EntityId,
        amount: Money,
        kind: InvoiceKind,
        period_from: NaiveDate,
        period_to: NaiveDate,
        due_date: DateTime<Utc>,
        breakdown: InvoiceBreakdown,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntityId::new(),
            number,
            subscriber_ref,
            amount,
            kind,
            period_from,
            period_to,
            status: InvoiceStatus::Pending,
            due_date,
            paid_at: None,
            breakdown,
            created_at,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn subscriber_ref(&self) -> &EntityId {
        &self.subscriber_ref
    }

    pub fn amount(&self) -> &Money {
        &self.amount
    }

    pub fn kind(&self) -> InvoiceKind {
        self.kind
    }

    pub fn period_from(&self) -> NaiveDate {
        self.period_from
    }

    pub fn period_to(&self) -> NaiveDate {
        self.period_to
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn breakdown(&self) -> &InvoiceBreakdown {
        &self.breakdown
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvoiceStatus::Pending
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    /// Mark the invoice paid.
    pub fn mark_paid(&mut self, paid_at: DateTime<Utc>) -> Result<(), InvoiceError> {
        match self.status {
            InvoiceStatus::Paid => Err(InvoiceError::AlreadyPaid),
            InvoiceStatus::Cancelled => Err(InvoiceError::Cancelled),
            InvoiceStatus::Pending | InvoiceStatus::Overdue => {
                self.status = InvoiceStatus::Paid;
                self.paid_at = Some(paid_at);
                Ok(())
            }
        }
    }

    /// Flag a pending invoice past its due date.
    pub fn mark_overdue(&mut self) -> Result<(), InvoiceError> {
        match self.status {
            InvoiceStatus::Pending => {
                self.status = InvoiceStatus::Overdue;
                Ok(())
            }
            InvoiceStatus::Overdue => Ok(()),
            InvoiceStatus::Paid => Err(InvoiceError::AlreadyPaid),
            InvoiceStatus::Cancelled => Err(InvoiceError::Cancelled),
        }
    }

    /// Cancel the invoice. Paid invoices are immutable.
    pub fn cancel(&mut self) -> Result<(), InvoiceError> {
        match self.status {
            InvoiceStatus::Paid => Err(InvoiceError::AlreadyPaid),
            _ => {
                self.status = InvoiceStatus::Cancelled;
                Ok(())
            }
        }
    }
}

/// Transaction kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    Payment,
    Penalty,
    Discount,
    Refund,
}

/// Invoice status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

/// Structured charge breakdown persisted with the invoice
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoiceBreakdown {
    pub package: PackageCharge,
    pub addons: Vec<AddonCharge>,
    pub one_time_items: Vec<AddonCharge>,
    pub discount_total: Money,
}

/// Package charge line, annotated when prorated
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackageCharge {
    pub description: String,
    pub amount: Money,
    pub proration_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvoiceError {
    #[error("invoice is already paid")]
    AlreadyPaid,
    #[error("invoice is cancelled")]
    Cancelled,
}
