//! Grace-period suspension engine.
//!
//! Runs on the 6th of the month, business time. Only subscribers with a
//! pending invoice created inside the grace window (1st through 5th) are
//! suspended; local state changes only after the gateway confirms the remote
//! disable, so a failed candidate is picked up again on the next cycle.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::application::dto::{
    AccountStatusReport, GracePeriod, SingleActionResult, SkipReason, SkippedSubscriber,
    SuspendedSubscriber, SuspensionRunOutcome, SuspensionRunSummary,
};
use crate::domain::aggregates::Subscriber;
use crate::domain::services::BillingCalendar;
use crate::ports::inbound::{SuspensionUseCases, UseCaseError};
use crate::ports::outbound::{
    Clock, EventPublisher, InvoiceRepository, RouterControlGateway, RouterRepository,
    SubscriberRepository,
};

use super::{persistence, resolve_router_account};

enum CandidateOutcome {
    Suspended { account: String, remote_message: String },
    Skipped(SkipReason),
}

/// Suspension engine application service
pub struct SuspensionService {
    subscribers: Arc<dyn SubscriberRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    routers: Arc<dyn RouterRepository>,
    gateway: Arc<dyn RouterControlGateway>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    calendar: BillingCalendar,
}

impl SuspensionService {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        routers: Arc<dyn RouterRepository>,
        gateway: Arc<dyn RouterControlGateway>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        calendar: BillingCalendar,
    ) -> Self {
        Self {
            subscribers,
            invoices,
            routers,
            gateway,
            publisher,
            clock,
            calendar,
        }
    }

    async fn process_candidate(
        &self,
        subscriber: &mut Subscriber,
        now: DateTime<Utc>,
        grace_from: DateTime<Utc>,
        grace_to: DateTime<Utc>,
    ) -> CandidateOutcome {
        // No unpaid bill inside the grace window: billed outside the normal
        // cycle, explicitly not suspended.
        let pending = match self
            .invoices
            .find_pending_in_window(subscriber.id(), grace_from, grace_to)
            .await
        {
            Ok(pending) => pending,
            Err(err) => return CandidateOutcome::Skipped(SkipReason::PersistenceFailure(err.to_string())),
        };
        if pending.is_empty() {
            return CandidateOutcome::Skipped(SkipReason::NoPendingInvoiceInGraceWindow);
        }

        let (account, router) = match resolve_router_account(subscriber, &self.routers).await {
            Ok(resolved) => resolved,
            Err(UseCaseError::ConfigurationGap(gap)) => {
                return CandidateOutcome::Skipped(SkipReason::ConfigurationGap(gap));
            }
            Err(err) => {
                return CandidateOutcome::Skipped(SkipReason::PersistenceFailure(err.to_string()));
            }
        };

        match self.gateway.disable(&router, &account).await {
            Ok(ack) => {
                subscriber.suspend(now);
                if let Err(err) = self.subscribers.save(subscriber).await {
                    // The remote disable stands; local state stays unpaid so
                    // the subscriber remains a candidate next run (the remote
                    // call is idempotent).
                    warn!(
                        subscriber = subscriber.sequence(),
                        error = %err,
                        "failed to persist suspension after remote success"
                    );
                    return CandidateOutcome::Skipped(SkipReason::PersistenceFailure(
                        err.to_string(),
                    ));
                }
                if let Err(e) = self.publisher.publish(subscriber.take_events()).await {
                    debug!(error = %e, "event publish failed");
                }
                CandidateOutcome::Suspended {
                    account,
                    remote_message: ack.message,
                }
            }
            // Local state only changes on confirmed remote success.
            Err(err) => {
                warn!(
                    subscriber = subscriber.sequence(),
                    router = router.name(),
                    error = %err,
                    "disable failed, subscriber stays unpaid"
                );
                CandidateOutcome::Skipped(SkipReason::GatewayFailure(err.to_string()))
            }
        }
    }

    async fn find_target(&self, pattern: &str) -> Result<Subscriber, UseCaseError> {
        self.subscribers
            .find_by_id_or_name(pattern)
            .await
            .map_err(persistence)?
            .ok_or_else(|| {
                UseCaseError::NotFound(format!("no subscriber matching \"{}\"", pattern))
            })
    }
}

#[async_trait]
impl SuspensionUseCases for SuspensionService {
    async fn run_suspension_cycle(&self) -> Result<SuspensionRunOutcome, UseCaseError> {
        let now = self.clock.now();

        // Gate: only the 6th of the month, business time.
        if !self.calendar.is_suspension_day(now) {
            let next_run_date = self.calendar.next_suspension_run(now);
            info!(%next_run_date, "not suspension day, skipping cycle");
            return Ok(SuspensionRunOutcome::NotSuspensionDay { next_run_date });
        }

        let today = self.calendar.business_date(now);
        let (grace_from, grace_to) = self.calendar.grace_window(today);

        let candidates = self
            .subscribers
            .find_suspension_candidates()
            .await
            .map_err(persistence)?;

        info!(count = candidates.len(), "starting suspension cycle");

        let mut suspended = Vec::new();
        let mut skipped = Vec::new();
        for mut subscriber in candidates {
            match self
                .process_candidate(&mut subscriber, now, grace_from, grace_to)
                .await
            {
                CandidateOutcome::Suspended {
                    account,
                    remote_message,
                } => suspended.push(SuspendedSubscriber {
                    subscriber_id: subscriber.id().to_string(),
                    name: subscriber.name().to_string(),
                    account,
                    remote_message,
                }),
                CandidateOutcome::Skipped(reason) => skipped.push(SkippedSubscriber {
                    subscriber_id: subscriber.id().to_string(),
                    name: subscriber.name().to_string(),
                    reason,
                }),
            }
        }

        info!(
            suspended = suspended.len(),
            skipped = skipped.len(),
            "suspension cycle finished"
        );

        Ok(SuspensionRunOutcome::Completed(SuspensionRunSummary {
            suspended,
            skipped,
            grace_period: GracePeriod {
                from: grace_from,
                to: grace_to,
            },
        }))
    }

    async fn suspend_one(&self, pattern: &str) -> Result<SingleActionResult, UseCaseError> {
        let mut subscriber = self.find_target(pattern).await?;
        let (account, router) = resolve_router_account(&subscriber, &self.routers).await?;

        let ack = self
            .gateway
            .disable(&router, &account)
            .await
            .map_err(|e| UseCaseError::RemoteGateway(e.to_string()))?;

        subscriber.suspend(self.clock.now());
        self.subscribers
            .save(&subscriber)
            .await
            .map_err(persistence)?;
        if let Err(e) = self.publisher.publish(subscriber.take_events()).await {
            debug!(error = %e, "event publish failed");
        }

        info!(
            subscriber = subscriber.sequence(),
            account = %account,
            router = router.name(),
            "PPP account disabled manually"
        );

        Ok(SingleActionResult {
            subscriber_id: subscriber.id().to_string(),
            name: subscriber.name().to_string(),
            account,
            router: router.name().to_string(),
            message: ack.message,
        })
    }

    async fn reinstate_one(&self, pattern: &str) -> Result<SingleActionResult, UseCaseError> {
        let mut subscriber = self.find_target(pattern).await?;
        let (account, router) = resolve_router_account(&subscriber, &self.routers).await?;

        let ack = self
            .gateway
            .enable(&router, &account)
            .await
            .map_err(|e| UseCaseError::RemoteGateway(e.to_string()))?;

        // Manual reinstatement restores access only; billing status is the
        // payment path's business.
        subscriber.confirm_router_enabled(self.clock.now());
        self.subscribers
            .save(&subscriber)
            .await
            .map_err(persistence)?;
        if let Err(e) = self.publisher.publish(subscriber.take_events()).await {
            debug!(error = %e, "event publish failed");
        }

        info!(
            subscriber = subscriber.sequence(),
            account = %account,
            router = router.name(),
            "PPP account enabled manually"
        );

        Ok(SingleActionResult {
            subscriber_id: subscriber.id().to_string(),
            name: subscriber.name().to_string(),
            account,
            router: router.name().to_string(),
            message: ack.message,
        })
    }

    async fn check_one(&self, pattern: &str) -> Result<AccountStatusReport, UseCaseError> {
        let subscriber = self.find_target(pattern).await?;
        let (account, router) = resolve_router_account(&subscriber, &self.routers).await?;

        let status = self
            .gateway
            .check_status(&router, &account)
            .await
            .map_err(|e| UseCaseError::RemoteGateway(e.to_string()))?;

        Ok(AccountStatusReport {
            subscriber_id: subscriber.id().to_string(),
            name: subscriber.name().to_string(),
            account,
            router: router.name().to_string(),
            found: status.found,
            disabled: status.disabled,
            profile: status.profile,
            service: status.service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{
        BillingStatus, BillingType, Invoice, InvoiceBreakdown, InvoiceKind, PackageCharge, Router,
        RouterAccountStatus,
    };
    use crate::infrastructure::gateway::{NoopRouterGateway, RecordingGateway};
    use crate::infrastructure::persistence::{
        InMemoryInvoiceRepository, InMemoryRouterRepository, InMemorySubscriberRepository,
        NoOpEventPublisher,
    };
    use crate::infrastructure::FixedClock;
    use chrono::{NaiveDate, TimeZone};
    use fiber_common::{EntityId, Money};

    // 6 June 2024, 00:01 WIB.
    fn suspension_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 5, 17, 1, 0).unwrap()
    }

    struct Fixture {
        subscribers: Arc<InMemorySubscriberRepository>,
        invoices: Arc<InMemoryInvoiceRepository>,
        routers: Arc<InMemoryRouterRepository>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                subscribers: Arc::new(InMemorySubscriberRepository::new()),
                invoices: Arc::new(InMemoryInvoiceRepository::new()),
                routers: Arc::new(InMemoryRouterRepository::new()),
            }
        }

        fn service(
            &self,
            gateway: Arc<dyn RouterControlGateway>,
            now: DateTime<Utc>,
        ) -> SuspensionService {
            SuspensionService::new(
                self.subscribers.clone(),
                self.invoices.clone(),
                self.routers.clone(),
                gateway,
                Arc::new(NoOpEventPublisher),
                Arc::new(FixedClock::new(now)),
                BillingCalendar::with_offset_hours(7),
            )
        }

        /// Unpaid subscriber with a router account, optionally with a pending
        /// invoice created on the 3rd of June (inside the grace window).
        async fn unpaid_subscriber(&self, name: &str, with_invoice: bool) -> EntityId {
            let router = Router::new("mikrotik-core-1", "10.0.0.1");
            let mut sub = Subscriber::register(
                format!("CUST-{}", name),
                name,
                "Home 20 Mbps",
                Money::from_units(300_000),
                BillingType::Prepaid,
            );
            sub.activate_service(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
            sub.set_router_account(format!("{}@ppp", name), router.id().clone());
            self.routers.save(&router).await.unwrap();

            if with_invoice {
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
                    // Created on the 3rd of June, business time.
                    Utc.with_ymd_and_hms(2024, 6, 3, 2, 0, 0).unwrap(),
                );
                self.invoices.create(&invoice).await.unwrap();
            }

            let id = sub.id().clone();
            self.subscribers.save(&sub).await.unwrap();
            id
        }
    }

    #[tokio::test]
    async fn test_gate_rejects_other_days() {
        let f = Fixture::new();
        f.unpaid_subscriber("budi", true).await;

        // 10 June, well past the suspension day.
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 2, 0, 0).unwrap();
        let svc = f.service(Arc::new(NoopRouterGateway::new()), now);

        let outcome = svc.run_suspension_cycle().await.unwrap();
        match outcome {
            SuspensionRunOutcome::NotSuspensionDay { next_run_date } => {
                assert_eq!(next_run_date, NaiveDate::from_ymd_opt(2024, 7, 6).unwrap());
            }
            SuspensionRunOutcome::Completed(_) => panic!("cycle ran off the suspension day"),
        }

        // No state change happened.
        let subs = f.subscribers.find_suspension_candidates().await.unwrap();
        assert_eq!(subs.len(), 1);
    }

    #[tokio::test]
    async fn test_suspends_unpaid_with_grace_invoice() {
        let f = Fixture::new();
        let id = f.unpaid_subscriber("budi", true).await;

        let svc = f.service(Arc::new(NoopRouterGateway::new()), suspension_instant());
        let outcome = svc.run_suspension_cycle().await.unwrap();

        let summary = match outcome {
            SuspensionRunOutcome::Completed(summary) => summary,
            _ => panic!("expected a completed cycle"),
        };
        assert_eq!(summary.suspended.len(), 1);
        assert!(summary.skipped.is_empty());

        let sub = f.subscribers.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(sub.billing_status(), BillingStatus::Suspended);
        assert_eq!(sub.router_account_status(), RouterAccountStatus::Disabled);
        assert!(sub.last_suspend_date().is_some());
    }

    #[tokio::test]
    async fn test_no_grace_invoice_is_skipped() {
        let f = Fixture::new();
        let id = f.unpaid_subscriber("budi", false).await;

        let svc = f.service(Arc::new(NoopRouterGateway::new()), suspension_instant());
        let outcome = svc.run_suspension_cycle().await.unwrap();

        let summary = match outcome {
            SuspensionRunOutcome::Completed(summary) => summary,
            _ => panic!("expected a completed cycle"),
        };
        assert!(summary.suspended.is_empty());
        assert!(matches!(
            summary.skipped[0].reason,
            SkipReason::NoPendingInvoiceInGraceWindow
        ));

        let sub = f.subscribers.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(sub.billing_status(), BillingStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_state_untouched() {
        let f = Fixture::new();
        let id = f.unpaid_subscriber("budi", true).await;

        let gateway = Arc::new(RecordingGateway::failing("timeout"));
        let svc = f.service(gateway, suspension_instant());
        let outcome = svc.run_suspension_cycle().await.unwrap();

        let summary = match outcome {
            SuspensionRunOutcome::Completed(summary) => summary,
            _ => panic!("expected a completed cycle"),
        };
        assert!(summary.suspended.is_empty());
        assert!(matches!(
            summary.skipped[0].reason,
            SkipReason::GatewayFailure(_)
        ));

        // Still a candidate for the next run.
        let sub = f.subscribers.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(sub.billing_status(), BillingStatus::Unpaid);
        assert_eq!(sub.router_account_status(), RouterAccountStatus::Active);
    }

    #[tokio::test]
    async fn test_missing_router_reported_as_configuration_gap() {
        let f = Fixture::new();
        // Subscriber with an invoice but no router account at all.
        {
            let mut sub = Subscriber::register(
                "CUST-gap",
                "No Router",
                "Home 20 Mbps",
                Money::from_units(300_000),
                BillingType::Prepaid,
            );
            sub.activate_service(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
            let invoice = Invoice::issue(
                "INV-001002".into(),
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
                Utc.with_ymd_and_hms(2024, 6, 3, 2, 0, 0).unwrap(),
            );
            f.invoices.create(&invoice).await.unwrap();
            f.subscribers.save(&sub).await.unwrap();
        }

        let gateway = Arc::new(RecordingGateway::succeeding());
        let svc = f.service(gateway.clone(), suspension_instant());
        let outcome = svc.run_suspension_cycle().await.unwrap();

        let summary = match outcome {
            SuspensionRunOutcome::Completed(summary) => summary,
            _ => panic!("expected a completed cycle"),
        };
        assert!(matches!(
            summary.skipped[0].reason,
            SkipReason::ConfigurationGap(_)
        ));
        // The gateway was never called: skipped, not attempted.
        assert_eq!(gateway.disable_calls(), 0);
    }

    #[tokio::test]
    async fn test_rerun_same_day_has_no_further_effect() {
        let f = Fixture::new();
        f.unpaid_subscriber("budi", true).await;

        let gateway = Arc::new(RecordingGateway::succeeding());
        let svc = f.service(gateway.clone(), suspension_instant());

        svc.run_suspension_cycle().await.unwrap();
        let second = svc.run_suspension_cycle().await.unwrap();

        // Suspended subscribers leave the candidate set, so the rerun touches
        // nobody.
        match second {
            SuspensionRunOutcome::Completed(summary) => {
                assert!(summary.suspended.is_empty());
                assert!(summary.skipped.is_empty());
            }
            _ => panic!("expected a completed cycle"),
        }
        assert_eq!(gateway.disable_calls(), 1);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_batch() {
        let f = Fixture::new();
        f.unpaid_subscriber("alpha", true).await;
        f.unpaid_subscriber("beta", true).await;

        // Device rejects alpha's account but accepts beta's.
        let gateway = Arc::new(RecordingGateway::failing_for("alpha@ppp", "unknown secret"));
        let svc = f.service(gateway, suspension_instant());
        let outcome = svc.run_suspension_cycle().await.unwrap();

        let summary = match outcome {
            SuspensionRunOutcome::Completed(summary) => summary,
            _ => panic!("expected a completed cycle"),
        };
        assert_eq!(summary.suspended.len(), 1);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.suspended[0].account, "beta@ppp");
    }

    #[tokio::test]
    async fn test_suspend_one_by_name_pattern() {
        let f = Fixture::new();
        let id = f.unpaid_subscriber("Budi Santoso", true).await;

        let svc = f.service(
            Arc::new(NoopRouterGateway::new()),
            suspension_instant(),
        );
        // Case-insensitive substring match.
        let result = svc.suspend_one("budi").await.unwrap();
        assert_eq!(result.account, "Budi Santoso@ppp");

        let sub = f.subscribers.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(sub.billing_status(), BillingStatus::Suspended);
    }

    #[tokio::test]
    async fn test_suspend_one_unknown_pattern_is_not_found() {
        let f = Fixture::new();
        let svc = f.service(Arc::new(NoopRouterGateway::new()), suspension_instant());

        let err = svc.suspend_one("nobody").await.unwrap_err();
        assert!(matches!(err, UseCaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reinstate_one_restores_router_axis_only() {
        let f = Fixture::new();
        let id = f.unpaid_subscriber("budi", true).await;

        let svc = f.service(Arc::new(NoopRouterGateway::new()), suspension_instant());
        svc.suspend_one("budi").await.unwrap();
        svc.reinstate_one("budi").await.unwrap();

        let sub = f.subscribers.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(sub.router_account_status(), RouterAccountStatus::Active);
        // Billing is still the payment path's business.
        assert_eq!(sub.billing_status(), BillingStatus::Suspended);
    }
}
