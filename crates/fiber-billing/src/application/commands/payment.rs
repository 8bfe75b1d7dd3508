//! Payment recording and auto-reinstatement.
//!
//! Marking an invoice paid drives the billing state machine. The asymmetry is
//! deliberate and specified: payment acknowledgement never blocks on the
//! remote enable call, but the router account axis only flips on confirmed
//! remote success.

use std::sync::Arc;

use async_trait::async_trait;
use fiber_common::EntityId;
use tracing::{debug, info, warn};

use crate::application::dto::PaymentOutcome;
use crate::ports::inbound::{PaymentUseCases, UseCaseError};
use crate::ports::outbound::{
    Clock, EventPublisher, InvoiceRepository, RouterControlGateway, RouterRepository,
    SubscriberRepository,
};

use super::{persistence, resolve_router_account};

/// Payment application service
pub struct PaymentService {
    subscribers: Arc<dyn SubscriberRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    routers: Arc<dyn RouterRepository>,
    gateway: Arc<dyn RouterControlGateway>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
}

impl PaymentService {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        routers: Arc<dyn RouterRepository>,
        gateway: Arc<dyn RouterControlGateway>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscribers,
            invoices,
            routers,
            gateway,
            publisher,
            clock,
        }
    }
}

#[async_trait]
impl PaymentUseCases for PaymentService {
    async fn record_payment(&self, invoice_id: &EntityId) -> Result<PaymentOutcome, UseCaseError> {
        let mut invoice = self
            .invoices
            .find_by_id(invoice_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| UseCaseError::NotFound(format!("invoice {}", invoice_id)))?;

        let subscriber_id = invoice.subscriber_ref().clone();

        // Idempotency short-circuit: safe to record twice.
        if invoice.is_paid() {
            return Ok(PaymentOutcome {
                invoice_id: invoice_id.to_string(),
                subscriber_id: subscriber_id.to_string(),
                already_paid: true,
                reinstate_attempted: false,
                reinstated: false,
                enable_failure: None,
                configuration_gap: None,
            });
        }

        let now = self.clock.now();
        invoice
            .mark_paid(now)
            .map_err(|e| UseCaseError::Validation(e.to_string()))?;
        self.invoices.update(&invoice).await.map_err(persistence)?;

        let mut subscriber = self
            .subscribers
            .find_by_id(&subscriber_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| UseCaseError::NotFound(format!("subscriber {}", subscriber_id)))?;

        // Payment is honored regardless of remote reachability.
        subscriber.record_payment(now);

        let mut reinstate_attempted = false;
        let mut reinstated = false;
        let mut enable_failure = None;
        let mut configuration_gap = None;

        match resolve_router_account(&subscriber, &self.routers).await {
            Ok((account, router)) => {
                reinstate_attempted = true;
                match self.gateway.enable(&router, &account).await {
                    Ok(ack) => {
                        subscriber.confirm_router_enabled(now);
                        reinstated = true;
                        info!(
                            subscriber = subscriber.sequence(),
                            account = %account,
                            router = router.name(),
                            "PPP account re-enabled on payment"
                        );
                        debug!(message = %ack.message, "gateway response");
                    }
                    Err(err) => {
                        // Surfaced for operator follow-up; the router axis
                        // stays untouched.
                        warn!(
                            subscriber = subscriber.sequence(),
                            error = %err,
                            "enable failed after payment"
                        );
                        enable_failure = Some(err.to_string());
                    }
                }
            }
            Err(UseCaseError::ConfigurationGap(gap)) => {
                debug!(
                    subscriber = subscriber.sequence(),
                    gap = %gap,
                    "reinstatement skipped"
                );
                configuration_gap = Some(gap);
            }
            Err(other) => return Err(other),
        }

        self.subscribers
            .save(&subscriber)
            .await
            .map_err(persistence)?;

        if let Err(e) = self.publisher.publish(subscriber.take_events()).await {
            debug!(error = %e, "event publish failed");
        }

        Ok(PaymentOutcome {
            invoice_id: invoice_id.to_string(),
            subscriber_id: subscriber_id.to_string(),
            already_paid: false,
            reinstate_attempted,
            reinstated,
            enable_failure,
            configuration_gap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{
        BillingStatus, BillingType, Invoice, InvoiceBreakdown, InvoiceKind, PackageCharge, Router,
        RouterAccountStatus, ServiceStatus, Subscriber,
    };
    use crate::infrastructure::gateway::{NoopRouterGateway, RecordingGateway};
    use crate::infrastructure::persistence::{
        InMemoryInvoiceRepository, InMemoryRouterRepository, InMemorySubscriberRepository,
        NoOpEventPublisher,
    };
    use crate::infrastructure::FixedClock;
    use chrono::{NaiveDate, TimeZone, Utc};
    use fiber_common::Money;

    struct Fixture {
        subscribers: Arc<InMemorySubscriberRepository>,
        invoices: Arc<InMemoryInvoiceRepository>,
        routers: Arc<InMemoryRouterRepository>,
        subscriber_id: EntityId,
        invoice_id: EntityId,
    }

    async fn fixture(suspended: bool, with_router: bool) -> Fixture {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let routers = Arc::new(InMemoryRouterRepository::new());

        let mut sub = Subscriber::register(
            "CUST-0001",
            "Budi Santoso",
            "Home 20 Mbps",
            Money::from_units(300_000),
            BillingType::Prepaid,
        );
        sub.activate_service(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        if with_router {
            let router = Router::new("mikrotik-core-1", "10.0.0.1");
            sub.set_router_account("budi@ppp", router.id().clone());
            routers.save(&router).await.unwrap();
        }
        if suspended {
            sub.suspend(Utc::now());
        }

        let invoice = Invoice::issue(
            "INV-001001".into(),
            sub.id().clone(),
            Money::from_units(300_000),
            InvoiceKind::Payment,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 4, 17, 0, 0).unwrap(),
            InvoiceBreakdown {
                package: PackageCharge {
                    description: "Home 20 Mbps".into(),
                    amount: Money::from_units(300_000),
                    proration_note: None,
                },
                addons: vec![],
                one_time_items: vec![],
                discount_total: Money::from_units(0),
            },
            Utc::now(),
        );

        let subscriber_id = sub.id().clone();
        let invoice_id = invoice.id().clone();
        subscribers.save(&sub).await.unwrap();
        invoices.create(&invoice).await.unwrap();

        Fixture {
            subscribers,
            invoices,
            routers,
            subscriber_id,
            invoice_id,
        }
    }

    fn service(f: &Fixture, gateway: Arc<dyn RouterControlGateway>) -> PaymentService {
        PaymentService::new(
            f.subscribers.clone(),
            f.invoices.clone(),
            f.routers.clone(),
            gateway,
            Arc::new(NoOpEventPublisher),
            Arc::new(FixedClock::new(Utc::now())),
        )
    }

    #[tokio::test]
    async fn test_payment_reinstates_suspended_subscriber() {
        let f = fixture(true, true).await;
        let svc = service(&f, Arc::new(NoopRouterGateway::new()));

        let outcome = svc.record_payment(&f.invoice_id).await.unwrap();
        assert!(outcome.reinstate_attempted);
        assert!(outcome.reinstated);
        assert!(outcome.enable_failure.is_none());

        let sub = f
            .subscribers
            .find_by_id(&f.subscriber_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sub.billing_status(), BillingStatus::Paid);
        assert_eq!(sub.service_status(), ServiceStatus::Active);
        assert_eq!(sub.router_account_status(), RouterAccountStatus::Active);

        let invoice = f.invoices.find_by_id(&f.invoice_id).await.unwrap().unwrap();
        assert!(invoice.is_paid());
    }

    #[tokio::test]
    async fn test_enable_failure_does_not_block_payment() {
        let f = fixture(true, true).await;
        let gateway = Arc::new(RecordingGateway::failing("link down"));
        let svc = service(&f, gateway);

        let outcome = svc.record_payment(&f.invoice_id).await.unwrap();
        assert!(outcome.reinstate_attempted);
        assert!(!outcome.reinstated);
        assert!(outcome.enable_failure.is_some());

        // Payment is honored; the router axis stays disabled.
        let sub = f
            .subscribers
            .find_by_id(&f.subscriber_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sub.billing_status(), BillingStatus::Paid);
        assert_eq!(sub.service_status(), ServiceStatus::Active);
        assert_eq!(sub.router_account_status(), RouterAccountStatus::Disabled);
    }

    #[tokio::test]
    async fn test_missing_router_is_a_configuration_gap() {
        let f = fixture(false, false).await;
        let svc = service(&f, Arc::new(NoopRouterGateway::new()));

        let outcome = svc.record_payment(&f.invoice_id).await.unwrap();
        assert!(!outcome.reinstate_attempted);
        assert!(outcome.configuration_gap.is_some());

        let sub = f
            .subscribers
            .find_by_id(&f.subscriber_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sub.billing_status(), BillingStatus::Paid);
    }

    #[tokio::test]
    async fn test_double_recording_is_a_noop() {
        let f = fixture(false, true).await;
        let gateway = Arc::new(RecordingGateway::succeeding());
        let svc = service(&f, gateway.clone());

        svc.record_payment(&f.invoice_id).await.unwrap();
        let second = svc.record_payment(&f.invoice_id).await.unwrap();

        assert!(second.already_paid);
        assert!(!second.reinstate_attempted);
        // Only the first call reached the device.
        assert_eq!(gateway.enable_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_invoice_is_reported() {
        let f = fixture(false, true).await;
        let svc = service(&f, Arc::new(NoopRouterGateway::new()));

        let err = svc.record_payment(&EntityId::new()).await.unwrap_err();
        assert!(matches!(err, UseCaseError::NotFound(_)));
    }
}
