//! In-memory repository implementations for testing and development.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fiber_common::EntityId;
use parking_lot::RwLock;

use crate::domain::aggregates::{Invoice, InvoiceKind, InvoiceStatus, Odp, Router, Subscriber};
use crate::domain::events::BillingEvent;
use crate::ports::outbound::{
    EventPublisher, InvoiceRepository, OdpRepository, RepoResult, RouterRepository,
    SubscriberRepository,
};

/// In-memory subscriber directory
#[derive(Default)]
pub struct InMemorySubscriberRepository {
    subscribers: RwLock<HashMap<String, Subscriber>>,
}

impl InMemorySubscriberRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriberRepository for InMemorySubscriberRepository {
    async fn find_by_id(&self, id: &EntityId) -> RepoResult<Option<Subscriber>> {
        let subscribers = self.subscribers.read();
        Ok(subscribers.get(id.as_str()).cloned())
    }

    async fn find_by_id_or_name(&self, pattern: &str) -> RepoResult<Option<Subscriber>> {
        let subscribers = self.subscribers.read();
        if let Some(subscriber) = subscribers.get(pattern) {
            return Ok(Some(subscriber.clone()));
        }
        let needle = pattern.to_lowercase();
        // Deterministic "first match": lowest sequence number wins.
        let mut matches: Vec<_> = subscribers
            .values()
            .filter(|s| s.name().to_lowercase().contains(&needle))
            .collect();
        matches.sort_by(|a, b| a.sequence().cmp(b.sequence()));
        Ok(matches.first().map(|s| (*s).clone()))
    }

    async fn find_billable(&self) -> RepoResult<Vec<Subscriber>> {
        let subscribers = self.subscribers.read();
        Ok(subscribers
            .values()
            .filter(|s| s.is_billable())
            .cloned()
            .collect())
    }

    async fn find_suspension_candidates(&self) -> RepoResult<Vec<Subscriber>> {
        let subscribers = self.subscribers.read();
        Ok(subscribers
            .values()
            .filter(|s| s.is_suspension_candidate())
            .cloned()
            .collect())
    }

    async fn save(&self, subscriber: &Subscriber) -> RepoResult<()> {
        let mut subscribers = self.subscribers.write();
        subscribers.insert(subscriber.id().to_string(), subscriber.clone());
        Ok(())
    }

    async fn delete(&self, id: &EntityId) -> RepoResult<()> {
        let mut subscribers = self.subscribers.write();
        subscribers.remove(id.as_str());
        Ok(())
    }
}

/// In-memory invoice ledger
#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    invoices: RwLock<HashMap<String, Invoice>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn find_by_id(&self, id: &EntityId) -> RepoResult<Option<Invoice>> {
        let invoices = self.invoices.read();
        Ok(invoices.get(id.as_str()).cloned())
    }

    async fn find_by_subscriber(&self, subscriber: &EntityId) -> RepoResult<Vec<Invoice>> {
        let invoices = self.invoices.read();
        let mut found: Vec<_> = invoices
            .values()
            .filter(|i| i.subscriber_ref() == subscriber)
            .cloned()
            .collect();
        found.sort_by_key(|i| std::cmp::Reverse(i.created_at()));
        Ok(found)
    }

    async fn find_payment_in_window(
        &self,
        subscriber: &EntityId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepoResult<Option<Invoice>> {
        let invoices = self.invoices.read();
        Ok(invoices
            .values()
            .find(|i| {
                i.subscriber_ref() == subscriber
                    && i.kind() == InvoiceKind::Payment
                    && i.created_at() >= from
                    && i.created_at() <= to
            })
            .cloned())
    }

    async fn find_pending_in_window(
        &self,
        subscriber: &EntityId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepoResult<Vec<Invoice>> {
        let invoices = self.invoices.read();
        Ok(invoices
            .values()
            .filter(|i| {
                i.subscriber_ref() == subscriber
                    && i.status() == InvoiceStatus::Pending
                    && i.created_at() >= from
                    && i.created_at() <= to
            })
            .cloned()
            .collect())
    }

    async fn create(&self, invoice: &Invoice) -> RepoResult<()> {
        let mut invoices = self.invoices.write();
        invoices.insert(invoice.id().to_string(), invoice.clone());
        Ok(())
    }

    async fn update(&self, invoice: &Invoice) -> RepoResult<()> {
        let mut invoices = self.invoices.write();
        invoices.insert(invoice.id().to_string(), invoice.clone());
        Ok(())
    }

    async fn delete(&self, id: &EntityId) -> RepoResult<()> {
        let mut invoices = self.invoices.write();
        invoices.remove(id.as_str());
        Ok(())
    }
}

/// In-memory ODP store
#[derive(Default)]
pub struct InMemoryOdpRepository {
    odps: RwLock<HashMap<String, Odp>>,
}

impl InMemoryOdpRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OdpRepository for InMemoryOdpRepository {
    async fn find_by_id(&self, id: &EntityId) -> RepoResult<Option<Odp>> {
        let odps = self.odps.read();
        Ok(odps.get(id.as_str()).cloned())
    }

    async fn save(&self, odp: &Odp) -> RepoResult<()> {
        let mut odps = self.odps.write();
        odps.insert(odp.id().to_string(), odp.clone());
        Ok(())
    }

    async fn list(&self) -> RepoResult<Vec<Odp>> {
        let odps = self.odps.read();
        let mut all: Vec<_> = odps.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(all)
    }
}

/// In-memory router store
#[derive(Default)]
pub struct InMemoryRouterRepository {
    routers: RwLock<HashMap<String, Router>>,
}

impl InMemoryRouterRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RouterRepository for InMemoryRouterRepository {
    async fn find_by_id(&self, id: &EntityId) -> RepoResult<Option<Router>> {
        let routers = self.routers.read();
        Ok(routers.get(id.as_str()).cloned())
    }

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Router>> {
        let routers = self.routers.read();
        Ok(routers
            .values()
            .find(|r| r.name().eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn save(&self, router: &Router) -> RepoResult<()> {
        let mut routers = self.routers.write();
        routers.insert(router.id().to_string(), router.clone());
        Ok(())
    }

    async fn list(&self) -> RepoResult<Vec<Router>> {
        let routers = self.routers.read();
        let mut all: Vec<_> = routers.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(all)
    }
}

/// No-op event publisher for testing
#[derive(Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _events: Vec<BillingEvent>) -> RepoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{
        BillingType, InvoiceBreakdown, PackageCharge,
    };
    use chrono::{NaiveDate, TimeZone};
    use fiber_common::Money;

    fn subscriber(sequence: &str, name: &str) -> Subscriber {
        Subscriber::register(
            sequence,
            name,
            "Home 20 Mbps",
            Money::from_units(300_000),
            BillingType::Prepaid,
        )
    }

    #[tokio::test]
    async fn test_subscriber_save_and_find() {
        let repo = InMemorySubscriberRepository::new();
        let sub = subscriber("CUST-0001", "Budi Santoso");
        repo.save(&sub).await.unwrap();

        let found = repo.find_by_id(sub.id()).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().name(), "Budi Santoso");
    }

    #[tokio::test]
    async fn test_find_by_id_or_name() {
        let repo = InMemorySubscriberRepository::new();
        let sub = subscriber("CUST-0001", "Budi Santoso");
        repo.save(&sub).await.unwrap();
        repo.save(&subscriber("CUST-0002", "Siti Rahma"))
            .await
            .unwrap();

        // Exact id.
        let by_id = repo
            .find_by_id_or_name(sub.id().as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.id(), sub.id());

        // Case-insensitive substring.
        let by_name = repo.find_by_id_or_name("SANTOSO").await.unwrap().unwrap();
        assert_eq!(by_name.name(), "Budi Santoso");

        assert!(repo.find_by_id_or_name("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_match_is_deterministic() {
        let repo = InMemorySubscriberRepository::new();
        repo.save(&subscriber("CUST-0002", "Andi Wijaya"))
            .await
            .unwrap();
        repo.save(&subscriber("CUST-0001", "Andi Pratama"))
            .await
            .unwrap();

        let found = repo.find_by_id_or_name("andi").await.unwrap().unwrap();
        assert_eq!(found.sequence(), "CUST-0001");
    }

    #[tokio::test]
    async fn test_invoice_window_queries() {
        let repo = InMemoryInvoiceRepository::new();
        let subscriber_id = EntityId::new();

        let created = Utc.with_ymd_and_hms(2024, 6, 3, 2, 0, 0).unwrap();
        let invoice = Invoice::issue(
            "INV-001001".into(),
            subscriber_id.clone(),
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
            created,
        );
        repo.create(&invoice).await.unwrap();

        let window_from = Utc.with_ymd_and_hms(2024, 5, 31, 17, 0, 0).unwrap();
        let window_to = Utc.with_ymd_and_hms(2024, 6, 5, 16, 59, 59).unwrap();

        let payment = repo
            .find_payment_in_window(&subscriber_id, window_from, window_to)
            .await
            .unwrap();
        assert!(payment.is_some());

        let pending = repo
            .find_pending_in_window(&subscriber_id, window_from, window_to)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);

        // Outside the window.
        let later_from = Utc.with_ymd_and_hms(2024, 6, 30, 17, 0, 0).unwrap();
        let later_to = Utc.with_ymd_and_hms(2024, 7, 5, 16, 59, 59).unwrap();
        assert!(repo
            .find_payment_in_window(&subscriber_id, later_from, later_to)
            .await
            .unwrap()
            .is_none());

        // Paid invoices leave the pending query.
        let mut paid = invoice.clone();
        paid.mark_paid(Utc::now()).unwrap();
        repo.update(&paid).await.unwrap();
        assert!(repo
            .find_pending_in_window(&subscriber_id, window_from, window_to)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_router_find_by_name() {
        let repo = InMemoryRouterRepository::new();
        repo.save(&Router::new("mikrotik-core-1", "10.0.0.1"))
            .await
            .unwrap();

        let found = repo.find_by_name("MIKROTIK-CORE-1").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().host(), "10.0.0.1");
    }
}
