//! Customer-facing availability.

use super::{CapacityModel, CapacitySnapshot};
use crate::error::Result;
use crate::types::{Event, EventId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Booking state shown to customers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    /// Plenty of room
    Open,
    /// Utilization at or above the soft warning threshold
    Limited,
    /// No remaining capacity
    Full,
    /// Event switched off
    Closed,
    /// Admission window has ended
    Cutoff,
    /// Request-type event, every booking is reviewed
    Request,
    /// Admission window has not started
    NotYetOpen,
}

/// Availability summary for one event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Event
    pub event_id: EventId,
    /// Whether a submission would currently be admitted as a reservation
    pub is_available: bool,
    /// Remaining capacity
    pub remaining_capacity: u32,
    /// Booking state
    pub booking_status: BookingStatus,
    /// Active waitlist entries
    pub waitlist_count: usize,
}

impl Availability {
    /// Classify a snapshot at `now`
    #[must_use]
    pub fn assess(
        event: &Event,
        snapshot: &CapacitySnapshot,
        now: DateTime<Utc>,
        soft_warning_percent: u32,
    ) -> Self {
        let booking_status = if !event.is_active {
            BookingStatus::Closed
        } else if event.booking_opens_at.is_some_and(|opens| now < opens) {
            BookingStatus::NotYetOpen
        } else if event.booking_closes_at.is_some_and(|closes| now > closes) {
            BookingStatus::Cutoff
        } else if event.event_type.is_request() {
            BookingStatus::Request
        } else if snapshot.remaining_capacity == 0 || event.waitlist_active {
            BookingStatus::Full
        } else if snapshot.utilization_percent >= soft_warning_percent {
            BookingStatus::Limited
        } else {
            BookingStatus::Open
        };

        Self {
            event_id: event.id,
            is_available: matches!(
                booking_status,
                BookingStatus::Open | BookingStatus::Limited | BookingStatus::Request
            ),
            remaining_capacity: snapshot.remaining_capacity,
            booking_status,
            waitlist_count: snapshot.waitlist_count,
        }
    }
}

impl CapacityModel {
    /// Availability of an event right now
    ///
    /// # Errors
    ///
    /// Returns `EventNotFound` for an unknown event, or a repository error.
    pub async fn availability(&self, event_id: &EventId) -> Result<Availability> {
        let event = self.load_event(event_id).await?;
        let snapshot = self.snapshot_for(&event, None).await?;
        Ok(Availability::assess(
            &event,
            &snapshot,
            self.clock.now(),
            self.soft_warning_percent,
        ))
    }
}
