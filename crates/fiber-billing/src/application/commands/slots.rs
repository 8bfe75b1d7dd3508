//! ODP slot accounting.
//!
//! Slot counts are only ever mutated here. Each operation spans one ODP (or
//! two, for a reassignment) and the subscriber; the writes commit together or
//! are compensated, so 0 <= used_slots <= total_slots survives every path.

use std::sync::Arc;

use async_trait::async_trait;
use fiber_common::EntityId;
use tracing::{debug, info, warn};

use crate::domain::aggregates::{Odp, Subscriber};
use crate::ports::inbound::{SlotUseCases, UseCaseError};
use crate::ports::outbound::{EventPublisher, OdpRepository, SubscriberRepository};

use super::persistence;

/// Slot-accounting application service
pub struct SlotService {
    subscribers: Arc<dyn SubscriberRepository>,
    odps: Arc<dyn OdpRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl SlotService {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        odps: Arc<dyn OdpRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            subscribers,
            odps,
            publisher,
        }
    }

    async fn load_subscriber(&self, id: &EntityId) -> Result<Subscriber, UseCaseError> {
        self.subscribers
            .find_by_id(id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| UseCaseError::NotFound(format!("subscriber {}", id)))
    }

    async fn load_odp(&self, id: &EntityId) -> Result<Odp, UseCaseError> {
        self.odps
            .find_by_id(id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| UseCaseError::NotFound(format!("ODP {}", id)))
    }

    async fn publish(&self, subscriber: &mut Subscriber) {
        if let Err(e) = self.publisher.publish(subscriber.take_events()).await {
            debug!(error = %e, "event publish failed");
        }
    }

    /// Occupy a slot and attach it to the subscriber; roll the slot back if
    /// the subscriber write fails.
    async fn occupy_and_attach(
        &self,
        subscriber: &mut Subscriber,
        odp: &mut Odp,
    ) -> Result<(), UseCaseError> {
        odp.occupy_slot()
            .map_err(|e| UseCaseError::CapacityExceeded(e.to_string()))?;
        self.odps.save(odp).await.map_err(persistence)?;

        subscriber.attach_odp(odp.id().clone());
        if let Err(err) = self.subscribers.save(subscriber).await {
            odp.release_slot();
            if let Err(rollback_err) = self.odps.save(odp).await {
                warn!(
                    odp = odp.name(),
                    error = %rollback_err,
                    "failed to roll back slot occupation"
                );
            }
            return Err(persistence(err));
        }
        Ok(())
    }
}

#[async_trait]
impl SlotUseCases for SlotService {
    async fn assign(
        &self,
        subscriber_id: &EntityId,
        odp_id: &EntityId,
    ) -> Result<(), UseCaseError> {
        let mut subscriber = self.load_subscriber(subscriber_id).await?;

        if subscriber.odp_ref() == Some(odp_id) {
            return Ok(());
        }
        if subscriber.odp_ref().is_some() {
            return Err(UseCaseError::Validation(format!(
                "subscriber {} already holds a slot; use reassign",
                subscriber.sequence()
            )));
        }

        let mut odp = self.load_odp(odp_id).await?;
        self.occupy_and_attach(&mut subscriber, &mut odp).await?;
        self.publish(&mut subscriber).await;

        info!(
            subscriber = subscriber.sequence(),
            odp = odp.name(),
            used = odp.used_slots(),
            total = odp.total_slots(),
            "slot assigned"
        );
        Ok(())
    }

    async fn reassign(
        &self,
        subscriber_id: &EntityId,
        new_odp_id: &EntityId,
    ) -> Result<(), UseCaseError> {
        let mut subscriber = self.load_subscriber(subscriber_id).await?;

        let old_odp_id = match subscriber.odp_ref() {
            Some(old) if old == new_odp_id => return Ok(()),
            Some(old) => old.clone(),
            None => return self.assign(subscriber_id, new_odp_id).await,
        };

        // Occupy the new slot first: if the new ODP is full the subscriber
        // keeps its original slot and nothing has changed.
        let mut new_odp = self.load_odp(new_odp_id).await?;
        new_odp
            .occupy_slot()
            .map_err(|e| UseCaseError::CapacityExceeded(e.to_string()))?;
        self.odps.save(&new_odp).await.map_err(persistence)?;

        subscriber.detach_odp();
        subscriber.attach_odp(new_odp.id().clone());
        if let Err(err) = self.subscribers.save(&subscriber).await {
            // Give the new slot back; the subscriber keeps the old one.
            new_odp.release_slot();
            if let Err(rollback_err) = self.odps.save(&new_odp).await {
                warn!(
                    odp = new_odp.name(),
                    error = %rollback_err,
                    "failed to roll back slot transfer"
                );
            }
            return Err(persistence(err));
        }

        // The move is committed; give the old slot back.
        if let Ok(mut old_odp) = self.load_odp(&old_odp_id).await {
            old_odp.release_slot();
            if let Err(err) = self.odps.save(&old_odp).await {
                warn!(
                    odp = old_odp.name(),
                    error = %err,
                    "failed to release old slot after transfer"
                );
            }
        }

        self.publish(&mut subscriber).await;
        info!(
            subscriber = subscriber.sequence(),
            odp = new_odp.name(),
            "slot transferred"
        );
        Ok(())
    }

    async fn release(&self, subscriber_id: &EntityId) -> Result<(), UseCaseError> {
        let mut subscriber = self.load_subscriber(subscriber_id).await?;

        let odp_id = match subscriber.odp_ref() {
            Some(odp_id) => odp_id.clone(),
            None => return Ok(()),
        };

        // Release always succeeds; a dangling ODP reference still clears.
        if let Ok(mut odp) = self.load_odp(&odp_id).await {
            odp.release_slot();
            self.odps.save(&odp).await.map_err(persistence)?;
        }

        subscriber.detach_odp();
        self.subscribers
            .save(&subscriber)
            .await
            .map_err(persistence)?;
        self.publish(&mut subscriber).await;

        info!(subscriber = subscriber.sequence(), "slot released");
        Ok(())
    }
}
