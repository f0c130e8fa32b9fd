//! Capacity model.
//!
//! Loads an event's reservations, waitlist and override from the repository and
//! derives a [`CapacitySnapshot`]. Reads take no locks: a snapshot is a
//! point-in-time view, and only admission decisions need it to be fresh (they take
//! the event lock before computing one).

mod availability;
mod overrides;
mod snapshot;

pub use availability::{Availability, BookingStatus};
pub use overrides::{effective_capacity, OverbookingWarning, OverrideOutcome};
pub use snapshot::CapacitySnapshot;

use crate::error::{BookingError, Result};
use crate::repository::BookingRepository;
use crate::types::{Event, EventId, ReservationId};
use std::sync::Arc;
use venue_booking_core::environment::Clock;

/// Derives occupancy for events from repository state
#[derive(Clone)]
pub struct CapacityModel {
    repository: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
    soft_warning_percent: u32,
}

impl CapacityModel {
    /// Create a capacity model
    ///
    /// `soft_warning_percent` is the utilization at which availability is reported
    /// as [`BookingStatus::Limited`].
    #[must_use]
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
        soft_warning_percent: u32,
    ) -> Self {
        Self {
            repository,
            clock,
            soft_warning_percent,
        }
    }

    /// Occupancy snapshot for an event.
    ///
    /// `exclude` leaves one reservation out of the totals, which answers "what
    /// would occupancy be without this one" for edits and restores.
    ///
    /// # Errors
    ///
    /// Returns `EventNotFound` for an unknown event, or a repository error.
    pub async fn compute_capacity(
        &self,
        event_id: &EventId,
        exclude: Option<&ReservationId>,
    ) -> Result<CapacitySnapshot> {
        let event = self.load_event(event_id).await?;
        self.snapshot_for(&event, exclude).await
    }

    pub(crate) async fn load_event(&self, event_id: &EventId) -> Result<Event> {
        self.repository
            .get_event(event_id)
            .await?
            .ok_or(BookingError::EventNotFound(*event_id))
    }

    pub(crate) async fn snapshot_for(
        &self,
        event: &Event,
        exclude: Option<&ReservationId>,
    ) -> Result<CapacitySnapshot> {
        let capacity_override = self.repository.get_capacity_override(&event.id).await?;
        let reservations = self.repository.list_reservations_by_event(&event.id).await?;
        let waitlist = self.repository.list_waitlist_by_event(&event.id).await?;

        let snapshot = CapacitySnapshot::compute(
            event,
            capacity_override.as_ref(),
            &reservations,
            &waitlist,
            exclude,
        );

        tracing::debug!(
            event_id = %event.id,
            effective_capacity = snapshot.effective_capacity,
            total_booked = snapshot.total_booked,
            remaining = snapshot.remaining_capacity,
            waitlist_persons = snapshot.waitlist_persons,
            "Capacity snapshot computed"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::repository::InMemoryBookingRepository;
    use crate::types::{EventType, ReservationStatus};
    use chrono::NaiveDate;
    use venue_booking_testing::test_clock;

    #[tokio::test]
    async fn test_compute_capacity_reads_repository_state() {
        let repository = Arc::new(InMemoryBookingRepository::new());
        let event = Event::new(
            NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            EventType::Weekday,
            10,
        );
        repository.save_event(event.clone()).await.unwrap();
        let confirmed = fixtures::reservation(&event, "a@x.com", 7, ReservationStatus::Confirmed);
        repository.create_reservation(confirmed.clone()).await.unwrap();

        let model = CapacityModel::new(repository.clone(), Arc::new(test_clock()), 80);

        let snapshot = model.compute_capacity(&event.id, None).await.unwrap();
        assert_eq!(snapshot.remaining_capacity, 3);

        let preview = model.compute_capacity(&event.id, Some(&confirmed.id)).await.unwrap();
        assert_eq!(preview.remaining_capacity, 10);
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let model = CapacityModel::new(
            Arc::new(InMemoryBookingRepository::new()),
            Arc::new(test_clock()),
            80,
        );
        let missing = EventId::new();
        let err = model.compute_capacity(&missing, None).await.unwrap_err();
        assert_eq!(err, BookingError::EventNotFound(missing));
    }
}
