//! Monthly invoice generation.
//!
//! One invoice of kind payment per subscriber per calendar month. Each
//! subscriber is its own unit of work: the invoice is created first, then the
//! mutated subscriber (proration markers, one-time addon marks, billing
//! dates) is saved; if that save fails the invoice is deleted again, so the
//! two commit together or not at all.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fiber_common::Money;
use tracing::{debug, info, warn};

use crate::application::dto::{InvoiceRunSummary, IssuedInvoice, SkipReason, SkippedSubscriber};
use crate::domain::aggregates::{
    Invoice, InvoiceBreakdown, InvoiceKind, PackageCharge, PeriodUnit, Subscriber,
};
use crate::domain::services::{BillingCalendar, Proration, ProrationCalculator};
use crate::ports::inbound::{BillingUseCases, UseCaseError};
use crate::ports::outbound::{
    Clock, EventPublisher, InvoiceRepository, SubscriberRepository,
};

use super::persistence;

enum BillOutcome {
    Issued(Box<Invoice>, bool),
    AlreadyBilled,
}

/// Invoice generation application service
pub struct InvoiceService {
    subscribers: Arc<dyn SubscriberRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    calendar: BillingCalendar,
    sequence: AtomicU64,
}

impl InvoiceService {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        calendar: BillingCalendar,
    ) -> Self {
        Self {
            subscribers,
            invoices,
            publisher,
            clock,
            calendar,
            sequence: AtomicU64::new(1000),
        }
    }

    fn next_number(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("INV-{:06}", seq)
    }

    /// Bill one subscriber for the month containing `today`.
    async fn bill_subscriber(
        &self,
        subscriber: &mut Subscriber,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Result<BillOutcome, UseCaseError> {
        let (window_from, window_to) = self.calendar.month_window(today);

        // Idempotency: at most one payment invoice per calendar month.
        if self
            .invoices
            .find_payment_in_window(subscriber.id(), window_from, window_to)
            .await
            .map_err(persistence)?
            .is_some()
        {
            return Ok(BillOutcome::AlreadyBilled);
        }

        // Base amount: package price, prorated once for mid-month activation.
        let mut proration_note = None;
        let base_amount = match subscriber.active_date() {
            Some(active_date) if !subscriber.proration_applied() => {
                let proration = ProrationCalculator::calculate(
                    active_date,
                    subscriber.package_price(),
                    subscriber.active_period_unit(),
                );
                if proration.applied {
                    subscriber.apply_proration(proration.amount.clone());
                    proration_note = proration.note();
                    proration.amount
                } else {
                    subscriber.package_price().clone()
                }
            }
            _ => subscriber.package_price().clone(),
        };
        let prorated = proration_note.is_some();

        // Addons: monthly items every cycle, one-time items exactly once.
        let (addons, one_time_items) = subscriber.bill_addons();

        let mut total = base_amount.clone();
        for charge in addons.iter().chain(one_time_items.iter()) {
            total = total
                .add(&charge.amount)
                .map_err(|e| UseCaseError::Validation(e.to_string()))?;
        }
        total = total
            .subtract(subscriber.discount())
            .map_err(|e| UseCaseError::Validation(e.to_string()))?;
        let amount = total.max_zero();

        let (period_from, period_to) = self.calendar.month_bounds(today);
        let breakdown = InvoiceBreakdown {
            package: PackageCharge {
                description: subscriber.package_name().to_string(),
                amount: base_amount,
                proration_note,
            },
            addons,
            one_time_items,
            discount_total: subscriber.discount().clone(),
        };

        let invoice = Invoice::issue(
            self.next_number(),
            subscriber.id().clone(),
            amount,
            InvoiceKind::Payment,
            period_from,
            period_to,
            self.calendar.due_date(today),
            breakdown,
            now,
        );

        self.invoices.create(&invoice).await.map_err(persistence)?;

        subscriber
            .begin_billing_cycle(
                invoice.id().clone(),
                now,
                self.calendar.first_of_next_month(today),
            )
            .map_err(|e| UseCaseError::Validation(e.to_string()))?;

        if let Err(save_err) = self.subscribers.save(subscriber).await {
            // Compensate: the invoice must not survive without the
            // subscriber-side marks (addon billed flags, proration markers).
            if let Err(delete_err) = self.invoices.delete(invoice.id()).await {
                warn!(
                    invoice = invoice.number(),
                    error = %delete_err,
                    "failed to delete invoice while compensating a failed subscriber save"
                );
            }
            return Err(persistence(save_err));
        }

        if let Err(e) = self.publisher.publish(subscriber.take_events()).await {
            debug!(error = %e, "event publish failed");
        }

        Ok(BillOutcome::Issued(Box::new(invoice), prorated))
    }
}

#[async_trait]
impl BillingUseCases for InvoiceService {
    async fn generate_monthly_invoices(&self) -> Result<InvoiceRunSummary, UseCaseError> {
        let now = self.clock.now();
        let today = self.calendar.business_date(now);

        let billable = self
            .subscribers
            .find_billable()
            .await
            .map_err(persistence)?;

        info!(count = billable.len(), %today, "starting monthly invoice run");

        let mut summary = InvoiceRunSummary::default();
        for mut subscriber in billable {
            match self.bill_subscriber(&mut subscriber, now, today).await {
                Ok(BillOutcome::Issued(invoice, prorated)) => {
                    debug!(
                        subscriber = subscriber.sequence(),
                        invoice = invoice.number(),
                        amount = %invoice.amount(),
                        "invoice issued"
                    );
                    summary.invoices.push(IssuedInvoice {
                        invoice_id: invoice.id().to_string(),
                        number: invoice.number().to_string(),
                        subscriber_id: subscriber.id().to_string(),
                        subscriber_name: subscriber.name().to_string(),
                        amount: invoice.amount().clone(),
                        prorated,
                    });
                }
                Ok(BillOutcome::AlreadyBilled) => {
                    summary.skipped.push(SkippedSubscriber {
                        subscriber_id: subscriber.id().to_string(),
                        name: subscriber.name().to_string(),
                        reason: SkipReason::AlreadyBilled,
                    });
                }
                // A failure on one subscriber must not abort the others.
                Err(err) => {
                    warn!(
                        subscriber = subscriber.sequence(),
                        error = %err,
                        "invoice generation failed for subscriber"
                    );
                    summary.failures.push(SkippedSubscriber {
                        subscriber_id: subscriber.id().to_string(),
                        name: subscriber.name().to_string(),
                        reason: SkipReason::PersistenceFailure(err.to_string()),
                    });
                }
            }
        }
        summary.created_count = summary.invoices.len();

        info!(
            created = summary.created_count,
            skipped = summary.skipped.len(),
            failures = summary.failures.len(),
            "monthly invoice run finished"
        );
        Ok(summary)
    }

    fn preview_proration(
        &self,
        activation_date: NaiveDate,
        package_price: Money,
        unit: PeriodUnit,
    ) -> Proration {
        ProrationCalculator::calculate(activation_date, &package_price, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{AddonItem, BillingStatus, BillingType, InvoiceStatus};
    use crate::infrastructure::persistence::{
        InMemoryInvoiceRepository, InMemorySubscriberRepository, NoOpEventPublisher,
    };
    use crate::infrastructure::FixedClock;
    use chrono::TimeZone;

    fn service(
        subscribers: Arc<InMemorySubscriberRepository>,
        invoices: Arc<InMemoryInvoiceRepository>,
        now: DateTime<Utc>,
    ) -> InvoiceService {
        InvoiceService::new(
            subscribers,
            invoices,
            Arc::new(NoOpEventPublisher),
            Arc::new(FixedClock::new(now)),
            BillingCalendar::with_offset_hours(7),
        )
    }

    fn active_subscriber(activated: NaiveDate) -> Subscriber {
        let mut sub = Subscriber::register(
            "CUST-0001",
            "Budi Santoso",
            "Home 20 Mbps",
            Money::from_units(300_000),
            BillingType::Prepaid,
        );
        sub.activate_service(activated);
        sub
    }

    fn june_first() -> DateTime<Utc> {
        // 1 June 2024, 09:00 WIB.
        Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_generates_one_invoice_per_subscriber() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let sub = active_subscriber(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let sub_id = sub.id().clone();
        subscribers.save(&sub).await.unwrap();

        let svc = service(subscribers.clone(), invoices.clone(), june_first());
        let summary = svc.generate_monthly_invoices().await.unwrap();

        assert_eq!(summary.created_count, 1);
        assert!(summary.skipped.is_empty());

        let stored = invoices.find_by_subscriber(&sub_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status(), InvoiceStatus::Pending);
        assert_eq!(stored[0].amount(), &Money::from_units(300_000));

        let updated = subscribers.find_by_id(&sub_id).await.unwrap().unwrap();
        assert_eq!(updated.billing_status(), BillingStatus::Unpaid);
        assert!(updated.last_billing_date().is_some());
        assert_eq!(
            updated.next_billing_date(),
            Some(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
        );
    }

    #[tokio::test]
    async fn test_second_run_same_month_is_idempotent() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let sub = active_subscriber(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let sub_id = sub.id().clone();
        subscribers.save(&sub).await.unwrap();

        let svc = service(subscribers.clone(), invoices.clone(), june_first());
        svc.generate_monthly_invoices().await.unwrap();
        let second = svc.generate_monthly_invoices().await.unwrap();

        assert_eq!(second.created_count, 0);
        assert_eq!(second.skipped.len(), 1);
        assert!(matches!(second.skipped[0].reason, SkipReason::AlreadyBilled));
        assert_eq!(
            invoices.find_by_subscriber(&sub_id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_prorated_first_invoice() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        // Activated on the 20th of a 30-day month.
        let sub = active_subscriber(NaiveDate::from_ymd_opt(2024, 6, 20).unwrap());
        let sub_id = sub.id().clone();
        subscribers.save(&sub).await.unwrap();

        // Billing run inside June.
        let now = Utc.with_ymd_and_hms(2024, 6, 20, 2, 0, 0).unwrap();
        let svc = service(subscribers.clone(), invoices.clone(), now);
        let summary = svc.generate_monthly_invoices().await.unwrap();

        assert_eq!(summary.created_count, 1);
        assert!(summary.invoices[0].prorated);
        assert_eq!(summary.invoices[0].amount, Money::from_units(110_000));

        let stored = &invoices.find_by_subscriber(&sub_id).await.unwrap()[0];
        assert_eq!(
            stored.breakdown().package.proration_note.as_deref(),
            Some("prorata 11/30 days")
        );

        let updated = subscribers.find_by_id(&sub_id).await.unwrap().unwrap();
        assert!(updated.proration_applied());
        assert_eq!(
            updated.proration_amount(),
            Some(&Money::from_units(110_000))
        );
    }

    #[tokio::test]
    async fn test_proration_charged_only_once() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let sub = active_subscriber(NaiveDate::from_ymd_opt(2024, 6, 20).unwrap());
        subscribers.save(&sub).await.unwrap();

        let june = Utc.with_ymd_and_hms(2024, 6, 20, 2, 0, 0).unwrap();
        service(subscribers.clone(), invoices.clone(), june)
            .generate_monthly_invoices()
            .await
            .unwrap();

        // Next month bills the full package price.
        let july = Utc.with_ymd_and_hms(2024, 7, 1, 2, 0, 0).unwrap();
        let summary = service(subscribers.clone(), invoices.clone(), july)
            .generate_monthly_invoices()
            .await
            .unwrap();

        assert_eq!(summary.created_count, 1);
        assert!(!summary.invoices[0].prorated);
        assert_eq!(summary.invoices[0].amount, Money::from_units(300_000));
    }

    #[tokio::test]
    async fn test_addons_and_discount_fold_into_total() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let mut sub = active_subscriber(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        sub.set_billing_terms(Money::from_units(50_000), 1, PeriodUnit::Months);
        sub.add_addon(AddonItem::monthly("Static IP", Money::from_units(25_000), 1));
        sub.add_addon(AddonItem::one_time(
            "Installation fee",
            Money::from_units(150_000),
            1,
        ));
        let sub_id = sub.id().clone();
        subscribers.save(&sub).await.unwrap();

        let svc = service(subscribers.clone(), invoices.clone(), june_first());
        let summary = svc.generate_monthly_invoices().await.unwrap();

        // 300000 + 25000 + 150000 - 50000
        assert_eq!(summary.invoices[0].amount, Money::from_units(425_000));

        let stored = &invoices.find_by_subscriber(&sub_id).await.unwrap()[0];
        assert_eq!(stored.breakdown().addons.len(), 1);
        assert_eq!(stored.breakdown().one_time_items.len(), 1);

        // The one-time item is now marked paid on the subscriber.
        let updated = subscribers.find_by_id(&sub_id).await.unwrap().unwrap();
        assert!(updated
            .addon_items()
            .iter()
            .filter(|i| !i.is_billable())
            .count()
            == 1);
    }

    #[tokio::test]
    async fn test_one_time_item_not_billed_twice() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let mut sub = active_subscriber(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        sub.add_addon(AddonItem::one_time(
            "Installation fee",
            Money::from_units(150_000),
            1,
        ));
        let sub_id = sub.id().clone();
        subscribers.save(&sub).await.unwrap();

        service(subscribers.clone(), invoices.clone(), june_first())
            .generate_monthly_invoices()
            .await
            .unwrap();

        let july = Utc.with_ymd_and_hms(2024, 7, 1, 2, 0, 0).unwrap();
        let summary = service(subscribers.clone(), invoices.clone(), july)
            .generate_monthly_invoices()
            .await
            .unwrap();

        // Second invoice is the bare package price.
        assert_eq!(summary.invoices[0].amount, Money::from_units(300_000));
        let stored = invoices.find_by_subscriber(&sub_id).await.unwrap();
        let newest = stored
            .iter()
            .max_by_key(|i| i.created_at())
            .unwrap();
        assert!(newest.breakdown().one_time_items.is_empty());
    }

    #[tokio::test]
    async fn test_discount_never_goes_negative() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let mut sub = active_subscriber(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        sub.set_billing_terms(Money::from_units(500_000), 1, PeriodUnit::Months);
        subscribers.save(&sub).await.unwrap();

        let svc = service(subscribers.clone(), invoices.clone(), june_first());
        let summary = svc.generate_monthly_invoices().await.unwrap();

        assert!(summary.invoices[0].amount.is_zero());
    }

    #[tokio::test]
    async fn test_inactive_subscribers_are_not_billed() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        // Registered but never installed.
        let sub = Subscriber::register(
            "CUST-0009",
            "Pending Install",
            "Home 20 Mbps",
            Money::from_units(300_000),
            BillingType::Prepaid,
        );
        subscribers.save(&sub).await.unwrap();

        let svc = service(subscribers.clone(), invoices.clone(), june_first());
        let summary = svc.generate_monthly_invoices().await.unwrap();
        assert_eq!(summary.created_count, 0);
    }

    #[test]
    fn test_preview_is_pure() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let svc = service(subscribers, invoices, june_first());

        let preview = svc.preview_proration(
            NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(),
            Money::from_units(300_000),
            PeriodUnit::Months,
        );
        assert!(preview.applied);
        assert_eq!(preview.amount, Money::from_units(110_000));
    }
}
