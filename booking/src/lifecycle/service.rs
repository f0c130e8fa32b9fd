use super::actions::{LifecycleAction, LifecycleEnvironment, LifecycleState};
use super::reducer::LifecycleReducer;
use crate::admission::live_duplicate;
use crate::capacity::CapacityModel;
use crate::config::AdmissionConfig;
use crate::error::{BookingError, Result};
use crate::locks::BookingLocks;
use crate::repository::BookingRepository;
use crate::types::{Reservation, ReservationId, ReservationStatus, WaitlistEntry};
use std::sync::Arc;
use venue_booking_core::environment::Clock;
use venue_booking_core::run_to_completion;

/// Staff-facing reservation transitions.
///
/// Each call loads the reservation under its lock, drives [`LifecycleReducer`]
/// to completion and returns the stored result. Commands that re-check capacity
/// also hold the event lock so they are serialized with admission.
#[derive(Clone)]
pub struct LifecycleService {
    repository: Arc<dyn BookingRepository>,
    capacity: CapacityModel,
    locks: Arc<BookingLocks>,
    environment: LifecycleEnvironment,
    reducer: LifecycleReducer,
    config: AdmissionConfig,
}

impl LifecycleService {
    /// Create a lifecycle service
    #[must_use]
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        capacity: CapacityModel,
        locks: Arc<BookingLocks>,
        clock: Arc<dyn Clock>,
        config: AdmissionConfig,
    ) -> Self {
        Self {
            environment: LifecycleEnvironment::new(clock, Arc::clone(&repository)),
            repository,
            capacity,
            locks,
            reducer: LifecycleReducer::new(),
            config,
        }
    }

    /// `pending|request → confirmed`
    ///
    /// # Errors
    ///
    /// `ReservationNotFound`, `InvalidTransition` or a repository error.
    pub async fn confirm(&self, id: ReservationId) -> Result<Reservation> {
        self.transition(id, LifecycleAction::Confirm).await
    }

    /// `pending|request|confirmed → rejected`, releasing the party's seats
    ///
    /// # Errors
    ///
    /// `ReservationNotFound`, `InvalidTransition` or a repository error.
    pub async fn reject(&self, id: ReservationId) -> Result<Reservation> {
        self.transition(id, LifecycleAction::Reject).await
    }

    /// `pending|request → waitlist`, registering the party on the event's waitlist
    ///
    /// # Errors
    ///
    /// `ReservationNotFound`, `InvalidTransition` or a repository error. A failed
    /// reservation write removes the waitlist entry again.
    pub async fn move_to_waitlist(
        &self,
        id: ReservationId,
    ) -> Result<(Reservation, WaitlistEntry)> {
        let state = self.dispatch(id, LifecycleAction::MoveToWaitlist).await?;
        let entry = state.waitlist_entry.ok_or_else(|| {
            BookingError::Internal("move to waitlist produced no entry".to_string())
        })?;
        Self::record(&state.reservation, "waitlist");
        Ok((state.reservation, entry))
    }

    /// `confirmed → checked-in`
    ///
    /// # Errors
    ///
    /// `ReservationNotFound`, `InvalidTransition` or a repository error.
    pub async fn check_in(
        &self,
        id: ReservationId,
        operator: impl Into<String> + Send,
    ) -> Result<Reservation> {
        self.transition(
            id,
            LifecycleAction::CheckIn {
                operator: operator.into(),
            },
        )
        .await
    }

    /// `checked-in → confirmed`
    ///
    /// # Errors
    ///
    /// `ReservationNotFound`, `InvalidTransition` or a repository error.
    pub async fn undo_check_in(&self, id: ReservationId) -> Result<Reservation> {
        self.transition(id, LifecycleAction::UndoCheckIn).await
    }

    /// Cancel a live reservation. Cancelling a rejected or cancelled one changes nothing.
    ///
    /// A reservation sitting in `waitlist` also withdraws the waitlist entry it
    /// was moved into; if the reservation write fails the entry is put back.
    ///
    /// # Errors
    ///
    /// `ReservationNotFound`, `InvalidTransition` (archived) or a repository error.
    pub async fn cancel(&self, id: ReservationId) -> Result<Reservation> {
        self.transition(id, LifecycleAction::Cancel).await
    }

    /// Soft-delete a rejected or cancelled reservation
    ///
    /// # Errors
    ///
    /// `ReservationNotFound`, `InvalidTransition` or a repository error.
    pub async fn archive(
        &self,
        id: ReservationId,
        operator: impl Into<String> + Send,
    ) -> Result<Reservation> {
        self.transition(
            id,
            LifecycleAction::Archive {
                operator: operator.into(),
            },
        )
        .await
    }

    /// Un-archive a reservation.
    ///
    /// With `target` of `pending`, `request` or `confirmed` the reservation is
    /// reactivated under the same capacity rule and duplicate guard as intake. A
    /// refused restore leaves the reservation archived.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded`, `DuplicateReservation`, `InvalidTransition`,
    /// `InvalidRequest` (unsupported target), `ReservationNotFound` or a
    /// repository error.
    pub async fn restore(
        &self,
        id: ReservationId,
        target: Option<ReservationStatus>,
    ) -> Result<Reservation> {
        self.transition(id, LifecycleAction::Restore { target }).await
    }

    /// Staff correction of the party size, re-validated against capacity with
    /// this reservation excluded
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` (reservation unchanged), `InvalidRequest`,
    /// `InvalidTransition`, `ReservationNotFound` or a repository error.
    pub async fn change_party_size(&self, id: ReservationId, persons: u32) -> Result<Reservation> {
        if let Some(max) = self.config.max_persons_per_reservation {
            if persons > max {
                return Err(BookingError::InvalidRequest(format!(
                    "number of persons must be at most {max}"
                )));
            }
        }
        self.transition(id, LifecycleAction::ChangePartySize { persons })
            .await
    }

    /// Permanently remove a rejected or cancelled reservation
    ///
    /// # Errors
    ///
    /// `ReservationNotFound`, `InvalidTransition` or a repository error.
    pub async fn delete(&self, id: ReservationId) -> Result<()> {
        let state = self.dispatch(id, LifecycleAction::Delete).await?;
        crate::metrics::record_transition("deleted");
        tracing::info!(reservation_id = %state.reservation.id, "Reservation deleted");
        Ok(())
    }

    async fn transition(&self, id: ReservationId, action: LifecycleAction) -> Result<Reservation> {
        let name = action.name();
        let state = self.dispatch(id, action).await?;
        Self::record(&state.reservation, name);
        Ok(state.reservation)
    }

    #[tracing::instrument(skip(self, action), fields(action = action.name()))]
    async fn dispatch(&self, id: ReservationId, action: LifecycleAction) -> Result<LifecycleState> {
        let _event_guard = if action.needs_event_lock() {
            let event_id = self.load(&id).await?.event_id;
            Some(self.locks.events.lock(&event_id).await)
        } else {
            None
        };
        let _reservation_guard = self.locks.reservations.lock(&id).await;

        let reservation = self.load(&id).await?;
        let mut state = if action.needs_capacity() {
            let event = self.capacity.load_event(&reservation.event_id).await?;
            let snapshot = self.capacity.snapshot_for(&event, Some(&id)).await?;
            let conflict =
                live_duplicate(self.repository.as_ref(), &event.id, &reservation.email, Some(&id))
                    .await?;
            LifecycleState::new(reservation)
                .with_capacity(event, snapshot)
                .with_conflict(conflict)
        } else if action == LifecycleAction::Cancel
            && reservation.status == ReservationStatus::Waitlist
        {
            let linked = self.linked_entry(&reservation).await?;
            LifecycleState::new(reservation).with_linked_entry(linked)
        } else {
            LifecycleState::new(reservation)
        };

        run_to_completion(&self.reducer, &mut state, action, &self.environment).await;

        match state.last_error.take() {
            Some(error) => {
                crate::metrics::record_rejection(error.code());
                if error.is_user_error() {
                    tracing::info!(reservation_id = %id, code = error.code(), "Transition refused");
                } else {
                    tracing::warn!(reservation_id = %id, error = %error, "Transition failed");
                }
                Err(error)
            },
            None => Ok(state),
        }
    }

    // Active entry created when this reservation was moved to the waitlist
    async fn linked_entry(&self, reservation: &Reservation) -> Result<Option<WaitlistEntry>> {
        Ok(self
            .repository
            .list_waitlist_by_event(&reservation.event_id)
            .await?
            .into_iter()
            .find(|e| e.source_reservation_id == Some(reservation.id) && e.status.is_active()))
    }

    async fn load(&self, id: &ReservationId) -> Result<Reservation> {
        self.repository
            .get_reservation(id)
            .await?
            .ok_or(BookingError::ReservationNotFound(*id))
    }

    fn record(reservation: &Reservation, action: &'static str) {
        crate::metrics::record_transition(reservation.status.as_str());
        tracing::info!(
            reservation_id = %reservation.id,
            event_id = %reservation.event_id,
            persons = reservation.number_of_persons,
            status = %reservation.status,
            archived = reservation.is_archived(),
            action,
            "Reservation transitioned"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::repository::InMemoryBookingRepository;
    use crate::types::{Event, EventType, WaitlistStatus};
    use chrono::NaiveDate;
    use venue_booking_testing::{test_clock, test_epoch};

    struct Harness {
        service: LifecycleService,
        repository: Arc<InMemoryBookingRepository>,
        event: Event,
    }

    async fn harness(capacity: u32) -> Harness {
        let repository = Arc::new(InMemoryBookingRepository::new());
        let clock: Arc<dyn Clock> = Arc::new(test_clock());
        let event = Event::new(
            NaiveDate::from_ymd_opt(2025, 3, 8).unwrap(),
            EventType::Weekend,
            capacity,
        );
        repository.save_event(event.clone()).await.unwrap();
        let service = LifecycleService::new(
            repository.clone(),
            CapacityModel::new(repository.clone(), clock.clone(), 80),
            Arc::new(BookingLocks::new()),
            clock,
            AdmissionConfig::default(),
        );
        Harness {
            service,
            repository,
            event,
        }
    }

    async fn stored(
        harness: &Harness,
        email: &str,
        persons: u32,
        status: ReservationStatus,
    ) -> Reservation {
        let reservation = fixtures::reservation(&harness.event, email, persons, status);
        harness.repository.create_reservation(reservation.clone()).await.unwrap();
        reservation
    }

    #[tokio::test]
    async fn test_check_in_and_undo() {
        let harness = harness(10).await;
        let reservation = stored(&harness, "a@x.com", 2, ReservationStatus::Pending).await;

        harness.service.confirm(reservation.id).await.unwrap();
        let checked_in = harness.service.check_in(reservation.id, "door").await.unwrap();
        assert_eq!(checked_in.status, ReservationStatus::CheckedIn);
        assert_eq!(checked_in.checked_in_at, Some(test_epoch()));
        assert_eq!(checked_in.checked_in_by.as_deref(), Some("door"));

        let undone = harness.service.undo_check_in(reservation.id).await.unwrap();
        assert_eq!(undone.status, ReservationStatus::Confirmed);
        assert!(undone.checked_in_at.is_none());

        let from_store = harness
            .repository
            .get_reservation(&reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(from_store, undone);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_reservation_unchanged() {
        let harness = harness(10).await;
        let reservation = stored(&harness, "a@x.com", 2, ReservationStatus::Pending).await;
        harness.repository.set_fail_writes(true);

        let err = harness.service.confirm(reservation.id).await.unwrap_err();
        assert_eq!(err.code(), "repository");

        harness.repository.set_fail_writes(false);
        let from_store = harness
            .repository
            .get_reservation(&reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(from_store.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn test_party_size_change_is_checked_without_self() {
        let harness = harness(10).await;
        stored(&harness, "other@x.com", 4, ReservationStatus::Confirmed).await;
        let reservation = stored(&harness, "a@x.com", 4, ReservationStatus::Pending).await;

        let grown = harness.service.change_party_size(reservation.id, 6).await.unwrap();
        assert_eq!(grown.number_of_persons, 6);

        let err = harness.service.change_party_size(reservation.id, 7).await.unwrap_err();
        assert_eq!(
            err,
            BookingError::CapacityExceeded {
                event_id: harness.event.id,
                requested: 7,
                remaining: 6,
            }
        );
        let from_store = harness
            .repository
            .get_reservation(&reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(from_store.number_of_persons, 6);
    }

    #[tokio::test]
    async fn test_archive_restore_and_delete() {
        let harness = harness(10).await;
        let reservation = stored(&harness, "a@x.com", 3, ReservationStatus::Pending).await;

        let err = harness.service.archive(reservation.id, "staff").await.unwrap_err();
        assert_eq!(err.code(), "invalid_transition");

        harness.service.cancel(reservation.id).await.unwrap();
        let archived = harness.service.archive(reservation.id, "staff").await.unwrap();
        assert!(archived.is_archived());
        assert_eq!(archived.archived_by.as_deref(), Some("staff"));

        let restored = harness
            .service
            .restore(reservation.id, Some(ReservationStatus::Confirmed))
            .await
            .unwrap();
        assert_eq!(restored.status, ReservationStatus::Confirmed);
        assert!(!restored.is_archived());

        harness.service.cancel(reservation.id).await.unwrap();
        harness.service.delete(reservation.id).await.unwrap();
        let err = harness.service.confirm(reservation.id).await.unwrap_err();
        assert_eq!(err, BookingError::ReservationNotFound(reservation.id));
    }

    #[tokio::test]
    async fn test_move_to_waitlist_releases_capacity() {
        let harness = harness(5).await;
        let reservation = stored(&harness, "a@x.com", 5, ReservationStatus::Pending).await;

        let (moved, entry) = harness.service.move_to_waitlist(reservation.id).await.unwrap();
        assert_eq!(moved.status, ReservationStatus::Waitlist);
        assert_eq!(entry.status, WaitlistStatus::Pending);

        let snapshot = harness
            .service
            .capacity
            .compute_capacity(&harness.event.id, None)
            .await
            .unwrap();
        assert_eq!(snapshot.remaining_capacity, 5);
        assert_eq!(snapshot.waitlist_persons, 5);
    }

    #[tokio::test]
    async fn test_party_size_cap_from_config() {
        let mut harness = harness(50).await;
        harness.service.config.max_persons_per_reservation = Some(8);
        let reservation = stored(&harness, "a@x.com", 2, ReservationStatus::Pending).await;

        let err = harness.service.change_party_size(reservation.id, 9).await.unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }

    #[tokio::test]
    async fn test_cancel_after_check_in_releases_capacity() {
        let harness = harness(10).await;
        let reservation = stored(&harness, "a@x.com", 6, ReservationStatus::Pending).await;
        harness.service.confirm(reservation.id).await.unwrap();
        harness.service.check_in(reservation.id, "door").await.unwrap();

        let occupied = harness
            .service
            .capacity
            .compute_capacity(&harness.event.id, None)
            .await
            .unwrap();
        assert_eq!(occupied.booked_persons, 6);
        assert_eq!(occupied.remaining_capacity, 4);

        let cancelled = harness.service.cancel(reservation.id).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);

        let released = harness
            .service
            .capacity
            .compute_capacity(&harness.event.id, None)
            .await
            .unwrap();
        assert_eq!(released.total_booked, 0);
        assert_eq!(released.remaining_capacity, 10);
    }

    #[tokio::test]
    async fn test_cancel_of_waitlisted_reservation_withdraws_its_entry() {
        let harness = harness(5).await;
        let reservation = stored(&harness, "a@x.com", 4, ReservationStatus::Pending).await;
        let (_, entry) = harness.service.move_to_waitlist(reservation.id).await.unwrap();

        let cancelled = harness.service.cancel(reservation.id).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);

        let entry = harness.repository.get_waitlist_entry(&entry.id).await.unwrap().unwrap();
        assert_eq!(entry.status, WaitlistStatus::Removed);

        let snapshot = harness
            .service
            .capacity
            .compute_capacity(&harness.event.id, None)
            .await
            .unwrap();
        assert_eq!(snapshot.waitlist_persons, 0);
        assert_eq!(snapshot.waitlist_count, 0);
        assert_eq!(snapshot.total_booked, 0);
    }
}
