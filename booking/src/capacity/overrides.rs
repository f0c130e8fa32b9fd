//! Capacity override store.
//!
//! Staff can replace an event's base capacity without touching the event record.
//! Lowering the cap below current occupancy is allowed: the write succeeds and the
//! returned outcome carries an [`OverbookingWarning`]. Existing reservations are
//! never evicted.

use super::{CapacityModel, CapacitySnapshot};
use crate::error::Result;
use crate::types::{CapacityOverride, Event, EventId};
use serde::{Deserialize, Serialize};

/// Capacity in force for `event`
#[must_use]
pub fn effective_capacity(event: &Event, capacity_override: Option<&CapacityOverride>) -> u32 {
    match capacity_override {
        Some(o) if o.enabled && o.event_id == event.id => o.capacity,
        _ => event.base_capacity,
    }
}

/// Operator-facing warning raised when an override leaves the event overbooked
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverbookingWarning {
    /// Persons above the new effective capacity
    pub overbooked_by: u32,
    /// Confirmed and checked-in persons at the time of the write
    pub confirmed_persons: u32,
    /// Effective capacity after the write
    pub effective_capacity: u32,
}

/// Result of an override write
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideOutcome {
    /// Stored override
    pub capacity_override: CapacityOverride,
    /// Occupancy after the write
    pub snapshot: CapacitySnapshot,
    /// Set when the event is overbooked under the new capacity
    pub warning: Option<OverbookingWarning>,
}

impl CapacityModel {
    /// Current override for an event, if any
    ///
    /// # Errors
    ///
    /// Returns a repository error if the store fails.
    pub async fn capacity_override(&self, event_id: &EventId) -> Result<Option<CapacityOverride>> {
        Ok(self.repository.get_capacity_override(event_id).await?)
    }

    /// Store an override for an event.
    ///
    /// Never refuses a lower capacity; overbooking is reported through
    /// [`OverrideOutcome::warning`].
    ///
    /// # Errors
    ///
    /// Returns `EventNotFound` for an unknown event, or a repository error.
    #[tracing::instrument(skip(self))]
    pub async fn set_override(
        &self,
        event_id: EventId,
        capacity: u32,
        enabled: bool,
    ) -> Result<OverrideOutcome> {
        let event = self.load_event(&event_id).await?;
        let capacity_override = self
            .repository
            .set_capacity_override(CapacityOverride {
                event_id,
                capacity,
                enabled,
            })
            .await?;

        let snapshot = self.snapshot_for(&event, None).await?;
        let warning = snapshot.is_overbooked.then_some(OverbookingWarning {
            overbooked_by: snapshot.overbooked_by,
            confirmed_persons: snapshot.booked_persons,
            effective_capacity: snapshot.effective_capacity,
        });

        if let Some(warning) = &warning {
            tracing::warn!(
                event_id = %event_id,
                capacity,
                overbooked_by = warning.overbooked_by,
                confirmed_persons = warning.confirmed_persons,
                "Capacity override leaves event overbooked"
            );
        } else {
            tracing::info!(event_id = %event_id, capacity, enabled, "Capacity override stored");
        }
        crate::metrics::record_capacity_override(warning.is_some());

        Ok(OverrideOutcome {
            capacity_override,
            snapshot,
            warning,
        })
    }

    /// Remove the override for an event, returning the one that was stored
    ///
    /// # Errors
    ///
    /// Returns a repository error if the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn clear_override(&self, event_id: EventId) -> Result<Option<CapacityOverride>> {
        let removed = self.repository.clear_capacity_override(&event_id).await?;
        tracing::info!(
            event_id = %event_id,
            removed = removed.is_some(),
            "Capacity override cleared"
        );
        Ok(removed)
    }
}
