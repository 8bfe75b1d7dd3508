//! Subscriber Aggregate
//!
//! Root of the billing model. Owns the addon items and the status triad
//! (billing / service / router account) whose transitions the invoice
//! generator, the suspension engine and the payment path drive.
//!
//! # Status transitions
//!
//! | Axis                | Transition                                    | Driven by            |
//! |---------------------|-----------------------------------------------|----------------------|
//! | billing_status      | unpaid -> paid                                | payment recorded     |
//! | billing_status      | paid -> unpaid                                | next billing cycle   |
//! | billing_status      | unpaid -> suspended                           | suspension engine    |
//! | billing_status      | suspended -> paid                             | payment (reinstates) |
//! | router_account      | active -> disabled -> active                  | gateway-confirmed    |
//! | service_status      | inactive -> active                            | installation/payment |

use chrono::{DateTime, NaiveDate, Utc};
use fiber_common::{EntityId, Money};
use serde::{Deserialize, Serialize};

use crate::domain::events::BillingEvent;

use super::addon::{AddonCharge, AddonItem};

/// Subscriber aggregate root
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Subscriber {
    id: EntityId,
    sequence: String,
    name: String,
    account_status: AccountStatus,
    billing_type: BillingType,
    package_name: String,
    package_price: Money,
    discount: Money,
    addon_items: Vec<AddonItem>,
    active_period: u32,
    active_period_unit: PeriodUnit,
    active_date: Option<NaiveDate>,
    expire_date: Option<NaiveDate>,
    payment_due_date: Option<NaiveDate>,
    billing_status: BillingStatus,
    service_status: ServiceStatus,
    router_account_status: RouterAccountStatus,
    proration_applied: bool,
    proration_amount: Option<Money>,
    router_account_name: Option<String>,
    router_ref: Option<EntityId>,
    odp_ref: Option<EntityId>,
    last_billing_date: Option<DateTime<Utc>>,
    next_billing_date: Option<NaiveDate>,
    last_suspend_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip, default)]
    events: Vec<BillingEvent>,
}

impl Subscriber {
    /// Register a new subscriber. Service starts inactive (pre-installation)
    /// and billing starts unpaid.
    pub fn register(
        sequence: impl Into<String>,
        name: impl Into<String>,
        package_name: impl Into<String>,
        package_price: Money,
        billing_type: BillingType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            sequence: sequence.into(),
            name: name.into(),
            account_status: AccountStatus::Active,
            billing_type,
            package_name: package_name.into(),
            package_price,
            discount: Money::default(),
            addon_items: vec![],
            active_period: 1,
            active_period_unit: PeriodUnit::Months,
            active_date: None,
            expire_date: None,
            payment_due_date: None,
            billing_status: BillingStatus::Unpaid,
            service_status: ServiceStatus::Inactive,
            router_account_status: RouterAccountStatus::Active,
            proration_applied: false,
            proration_amount: None,
            router_account_name: None,
            router_ref: None,
            odp_ref: None,
            last_billing_date: None,
            next_billing_date: None,
            last_suspend_date: None,
            created_at: now,
            updated_at: now,
            events: vec![],
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> &EntityId {
        &self.id
    }
    pub fn sequence(&self) -> &str {
        &self.sequence
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn account_status(&self) -> AccountStatus {
        self.account_status
    }
    pub fn billing_type(&self) -> BillingType {
        self.billing_type
    }
    pub fn package_name(&self) -> &str {
        &self.package_name
    }
    pub fn package_price(&self) -> &Money {
        &self.package_price
    }
    pub fn discount(&self) -> &Money {
        &self.discount
    }
    pub fn addon_items(&self) -> &[AddonItem] {
        &self.addon_items
    }
    pub fn active_period(&self) -> u32 {
        self.active_period
    }
    pub fn active_period_unit(&self) -> PeriodUnit {
        self.active_period_unit
    }
    pub fn active_date(&self) -> Option<NaiveDate> {
        self.active_date
    }
    pub fn expire_date(&self) -> Option<NaiveDate> {
        self.expire_date
    }
    pub fn payment_due_date(&self) -> Option<NaiveDate> {
        self.payment_due_date
    }
    pub fn billing_status(&self) -> BillingStatus {
        self.billing_status
    }
    pub fn service_status(&self) -> ServiceStatus {
        self.service_status
    }
    pub fn router_account_status(&self) -> RouterAccountStatus {
        self.router_account_status
    }
    pub fn proration_applied(&self) -> bool {
        self.proration_applied
    }
    pub fn proration_amount(&self) -> Option<&Money> {
        self.proration_amount.as_ref()
    }
    pub fn router_account_name(&self) -> Option<&str> {
        self.router_account_name.as_deref()
    }
    pub fn router_ref(&self) -> Option<&EntityId> {
        self.router_ref.as_ref()
    }
    pub fn odp_ref(&self) -> Option<&EntityId> {
        self.odp_ref.as_ref()
    }
    pub fn last_billing_date(&self) -> Option<DateTime<Utc>> {
        self.last_billing_date
    }
    pub fn next_billing_date(&self) -> Option<NaiveDate> {
        self.next_billing_date
    }
    pub fn last_suspend_date(&self) -> Option<DateTime<Utc>> {
        self.last_suspend_date
    }

    /// Eligible for monthly invoice generation.
    pub fn is_billable(&self) -> bool {
        self.account_status == AccountStatus::Active
            && self.service_status == ServiceStatus::Active
    }

    /// In the candidate set of the grace-period suspension engine.
    pub fn is_suspension_candidate(&self) -> bool {
        self.account_status == AccountStatus::Active
            && self.billing_status == BillingStatus::Unpaid
            && self.service_status == ServiceStatus::Active
            && self.router_account_status != RouterAccountStatus::Disabled
    }

    /// A router account is addressable only when both the PPP account name
    /// and the router reference are present.
    pub fn has_router_account(&self) -> bool {
        self.router_account_name.is_some() && self.router_ref.is_some()
    }

    // =========================================================================
    // Setup
    // =========================================================================

    pub fn set_billing_terms(&mut self, discount: Money, period: u32, unit: PeriodUnit) {
        self.discount = discount;
        self.active_period = period.max(1);
        self.active_period_unit = unit;
        self.touch();
    }

    pub fn set_router_account(&mut self, account_name: impl Into<String>, router_ref: EntityId) {
        self.router_account_name = Some(account_name.into());
        self.router_ref = Some(router_ref);
        self.touch();
    }

    pub fn add_addon(&mut self, item: AddonItem) {
        self.addon_items.push(item);
        self.touch();
    }

    pub fn set_payment_due_date(&mut self, date: NaiveDate) {
        self.payment_due_date = Some(date);
        self.touch();
    }

    pub fn set_expire_date(&mut self, date: NaiveDate) {
        self.expire_date = Some(date);
        self.touch();
    }

    // =========================================================================
    // Business Operations
    // =========================================================================

    /// Installation complete: the service goes live.
    pub fn activate_service(&mut self, date: NaiveDate) {
        self.service_status = ServiceStatus::Active;
        if self.active_date.is_none() {
            self.active_date = Some(date);
        }
        self.touch();
    }

    /// Retire the record. Archived subscribers are invisible to both engines.
    pub fn archive(&mut self) {
        self.account_status = AccountStatus::Archived;
        self.touch();
    }

    /// Record the outcome of the proration calculator so the first-month
    /// fraction is only ever charged once.
    pub fn apply_proration(&mut self, amount: Money) {
        self.proration_applied = true;
        self.proration_amount = Some(amount);
        self.touch();
    }

    /// Collect addon charges for the next invoice. Monthly items charge every
    /// cycle; unpaid one-time items charge now and are marked billed so they
    /// never appear again.
    pub fn bill_addons(&mut self) -> (Vec<AddonCharge>, Vec<AddonCharge>) {
        let mut monthly = Vec::new();
        let mut one_time = Vec::new();
        for item in self.addon_items.iter_mut() {
            if !item.is_billable() {
                continue;
            }
            match item.item_type() {
                super::addon::AddonType::Monthly => monthly.push(item.as_charge()),
                super::addon::AddonType::OneTime => {
                    one_time.push(item.as_charge());
                    item.mark_billed();
                }
            }
        }
        if !one_time.is_empty() {
            self.touch();
        }
        (monthly, one_time)
    }

    /// A new billing-period invoice was issued for this subscriber.
    pub fn begin_billing_cycle(
        &mut self,
        invoice_id: EntityId,
        billed_at: DateTime<Utc>,
        next_billing_date: NaiveDate,
    ) -> Result<(), SubscriberError> {
        if self.account_status == AccountStatus::Archived {
            return Err(SubscriberError::Archived);
        }
        self.last_billing_date = Some(billed_at);
        self.next_billing_date = Some(next_billing_date);
        self.billing_status = BillingStatus::Unpaid;
        self.touch();
        self.raise_event(BillingEvent::InvoiceIssued {
            subscriber_id: self.id.clone(),
            invoice_id,
            issued_at: billed_at,
        });
        Ok(())
    }

    /// Payment received. Billing flips to paid and the service is (re)opened
    /// locally regardless of remote reachability; the router account axis is
    /// confirmed separately via [`Subscriber::confirm_router_enabled`].
    pub fn record_payment(&mut self, paid_at: DateTime<Utc>) {
        if self.billing_status == BillingStatus::Paid {
            return;
        }
        self.billing_status = BillingStatus::Paid;
        self.service_status = ServiceStatus::Active;
        self.touch();
        self.raise_event(BillingEvent::PaymentRecorded {
            subscriber_id: self.id.clone(),
            paid_at,
        });
    }

    /// The gateway confirmed the PPP account was disabled. Idempotent:
    /// re-running the cycle on an already suspended subscriber is a no-op.
    pub fn suspend(&mut self, suspended_at: DateTime<Utc>) {
        if self.billing_status == BillingStatus::Suspended
            && self.router_account_status == RouterAccountStatus::Disabled
        {
            return;
        }
        self.billing_status = BillingStatus::Suspended;
        self.router_account_status = RouterAccountStatus::Disabled;
        self.last_suspend_date = Some(suspended_at);
        self.touch();
        self.raise_event(BillingEvent::ServiceSuspended {
            subscriber_id: self.id.clone(),
            suspended_at,
        });
    }

    /// The gateway confirmed the PPP account was enabled.
    pub fn confirm_router_enabled(&mut self, reinstated_at: DateTime<Utc>) {
        if self.router_account_status == RouterAccountStatus::Active {
            return;
        }
        self.router_account_status = RouterAccountStatus::Active;
        self.touch();
        self.raise_event(BillingEvent::ServiceReinstated {
            subscriber_id: self.id.clone(),
            reinstated_at,
        });
    }

    /// Slot-accounting: this subscriber now occupies a slot on the given ODP.
    pub(crate) fn attach_odp(&mut self, odp_id: EntityId) {
        self.odp_ref = Some(odp_id.clone());
        self.touch();
        self.raise_event(BillingEvent::SlotAssigned {
            subscriber_id: self.id.clone(),
            odp_id,
        });
    }

    /// Slot-accounting: the subscriber's slot was given back.
    pub(crate) fn detach_odp(&mut self) {
        if let Some(odp_id) = self.odp_ref.take() {
            self.touch();
            self.raise_event(BillingEvent::SlotReleased {
                subscriber_id: self.id.clone(),
                odp_id,
            });
        }
    }

    // =========================================================================
    // Domain Events
    // =========================================================================

    /// Get and clear accumulated domain events
    pub fn take_events(&mut self) -> Vec<BillingEvent> {
        std::mem::take(&mut self.events)
    }

    fn raise_event(&mut self, event: BillingEvent) {
        self.events.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Archived,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    Unpaid,
    Paid,
    Suspended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Active,
    Inactive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterAccountStatus {
    Active,
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingType {
    Prepaid,
    Postpaid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodUnit {
    Days,
    Months,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriberError {
    #[error("subscriber is archived")]
    Archived,
}
