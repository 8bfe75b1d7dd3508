//! Optical Distribution Point Aggregate
//!
//! Slot capacity bookkeeping. The invariant 0 <= used_slots <= total_slots
//! holds after every operation; available_slots is always recomputed from the
//! other two, never stored.

use fiber_common::EntityId;
use serde::{Deserialize, Serialize};

/// ODP aggregate root
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Odp {
    id: EntityId,
    name: String,
    total_slots: u32,
    used_slots: u32,
}

impl Odp {
    pub fn new(name: impl Into<String>, total_slots: u32) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            total_slots: total_slots.max(1),
            used_slots: 0,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total_slots(&self) -> u32 {
        self.total_slots
    }

    pub fn used_slots(&self) -> u32 {
        self.used_slots
    }

    /// Free slots, recomputed: total - used.
    pub fn available_slots(&self) -> u32 {
        self.total_slots.saturating_sub(self.used_slots)
    }

    pub fn has_capacity(&self) -> bool {
        self.available_slots() > 0
    }

    /// Take one slot. Fails when the ODP is full.
    pub fn occupy_slot(&mut self) -> Result<(), OdpError> {
        if self.available_slots() == 0 {
            return Err(OdpError::CapacityExceeded {
                odp: self.name.clone(),
                total_slots: self.total_slots,
            });
        }
        self.used_slots += 1;
        Ok(())
    }

    /// Give one slot back. Always succeeds; clamps against data drift so the
    /// count never leaves [0, total_slots].
    pub fn release_slot(&mut self) {
        self.used_slots = self.used_slots.saturating_sub(1).min(self.total_slots);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OdpError {
    #[error("ODP {odp} has no free slot ({total_slots} total)")]
    CapacityExceeded { odp: String, total_slots: u32 },
}
