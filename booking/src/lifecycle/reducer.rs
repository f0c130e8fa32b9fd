use super::actions::{LifecycleAction, LifecycleEnvironment, LifecycleState};
use crate::error::BookingError;
use crate::types::{
    Reservation, ReservationId, ReservationStatus, WaitlistEntry, WaitlistEntryId, WaitlistStatus,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use venue_booking_core::{effect::Effect, reducer::Reducer, smallvec, try_effect, SmallVec};

/// What an accepted command writes
enum Plan {
    Update(Reservation),
    MoveToWaitlist(Reservation, WaitlistEntry),
    /// Cancel a `waitlist` reservation: (reservation, withdrawn entry, entry as stored)
    CancelWaitlisted(Reservation, WaitlistEntry, WaitlistEntry),
    Delete(ReservationId),
    Unchanged,
}

/// Reducer enforcing the reservation transition table
///
/// | From | Command | To |
/// |---|---|---|
/// | `pending`, `request` | confirm / reject / waitlist | `confirmed` / `rejected` / `waitlist` |
/// | `confirmed` | reject | `rejected` |
/// | `confirmed` | check in | `checked-in` |
/// | `checked-in` | undo check-in | `confirmed` |
/// | any live status | cancel | `cancelled` |
/// | `waitlist` | cancel | `cancelled`, its waitlist entry `removed` |
/// | `rejected`, `cancelled` | archive / delete | archived / removed |
/// | archived | restore | same status, or `pending`/`request`/`confirmed` if capacity allows |
///
/// An archived reservation accepts nothing but restore and delete.
#[derive(Clone, Debug)]
pub struct LifecycleReducer;

impl LifecycleReducer {
    /// Creates a new `LifecycleReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn invalid(from: &str, action: &LifecycleAction) -> BookingError {
        BookingError::InvalidTransition {
            from: from.to_string(),
            attempted: action.name(),
        }
    }

    fn require(
        reservation: &Reservation,
        action: &LifecycleAction,
        allowed: impl Fn(ReservationStatus) -> bool,
    ) -> Result<(), BookingError> {
        if allowed(reservation.status) {
            Ok(())
        } else {
            Err(Self::invalid(reservation.status.as_str(), action))
        }
    }

    /// Applies the intake capacity rule to `persons`, returning the over-capacity
    /// flag for request-type events where capacity is advisory.
    fn check_room(state: &LifecycleState, persons: u32) -> Result<bool, BookingError> {
        let (Some(event), Some(snapshot)) = (&state.event, &state.capacity) else {
            return Err(BookingError::Internal(
                "capacity context was not loaded".to_string(),
            ));
        };
        let fits = snapshot.has_room_for(persons);
        if event.event_type.is_request() {
            return Ok(!fits);
        }
        if fits {
            Ok(false)
        } else {
            Err(BookingError::CapacityExceeded {
                event_id: event.id,
                requested: persons,
                remaining: snapshot.remaining_capacity,
            })
        }
    }

    fn waitlist_entry_for(reservation: &Reservation, now: DateTime<Utc>) -> WaitlistEntry {
        WaitlistEntry {
            id: WaitlistEntryId::new(),
            event_id: reservation.event_id,
            email: reservation.email.clone(),
            customer: reservation.customer.clone(),
            number_of_persons: reservation.number_of_persons,
            status: WaitlistStatus::Pending,
            created_at: now,
            updated_at: now,
            contacted_at: None,
            contacted_by: None,
            source_reservation_id: Some(reservation.id),
            converted_reservation_id: None,
        }
    }

    /// Validates a command and decides what to write
    #[allow(clippy::too_many_lines)] // One arm per command
    fn plan(
        state: &LifecycleState,
        action: &LifecycleAction,
        now: DateTime<Utc>,
    ) -> Result<Plan, BookingError> {
        let current = &state.reservation;
        if state.deleted {
            return Err(BookingError::ReservationNotFound(current.id));
        }
        if current.is_archived()
            && !matches!(action, LifecycleAction::Restore { .. } | LifecycleAction::Delete)
        {
            return Err(Self::invalid("archived", action));
        }

        let mut next = current.clone();
        next.updated_at = now;

        match action {
            LifecycleAction::Confirm => {
                Self::require(current, action, ReservationStatus::is_awaiting_review)?;
                next.status = ReservationStatus::Confirmed;
                Ok(Plan::Update(next))
            },
            LifecycleAction::Reject => {
                Self::require(current, action, |s| {
                    s.is_awaiting_review() || s == ReservationStatus::Confirmed
                })?;
                next.status = ReservationStatus::Rejected;
                Ok(Plan::Update(next))
            },
            LifecycleAction::MoveToWaitlist => {
                Self::require(current, action, ReservationStatus::is_awaiting_review)?;
                next.status = ReservationStatus::Waitlist;
                let entry = Self::waitlist_entry_for(current, now);
                Ok(Plan::MoveToWaitlist(next, entry))
            },
            LifecycleAction::CheckIn { operator } => {
                Self::require(current, action, |s| s == ReservationStatus::Confirmed)?;
                next.status = ReservationStatus::CheckedIn;
                next.checked_in_at = Some(now);
                next.checked_in_by = Some(operator.clone());
                Ok(Plan::Update(next))
            },
            LifecycleAction::UndoCheckIn => {
                Self::require(current, action, |s| s == ReservationStatus::CheckedIn)?;
                next.status = ReservationStatus::Confirmed;
                next.checked_in_at = None;
                next.checked_in_by = None;
                Ok(Plan::Update(next))
            },
            LifecycleAction::Cancel => {
                // Nothing left to release
                if current.status.is_terminal() {
                    return Ok(Plan::Unchanged);
                }
                next.status = ReservationStatus::Cancelled;
                match &state.linked_entry {
                    Some(entry)
                        if current.status == ReservationStatus::Waitlist
                            && entry.status.is_active() =>
                    {
                        let mut withdrawn = entry.clone();
                        withdrawn.status = WaitlistStatus::Removed;
                        withdrawn.updated_at = now;
                        Ok(Plan::CancelWaitlisted(next, withdrawn, entry.clone()))
                    },
                    _ => Ok(Plan::Update(next)),
                }
            },
            LifecycleAction::Archive { operator } => {
                Self::require(current, action, ReservationStatus::is_terminal)?;
                next.archived_at = Some(now);
                next.archived_by = Some(operator.clone());
                Ok(Plan::Update(next))
            },
            LifecycleAction::Restore { target } => {
                if !current.is_archived() {
                    return Err(Self::invalid(current.status.as_str(), action));
                }
                next.archived_at = None;
                next.archived_by = None;
                match target {
                    None => {},
                    Some(
                        status @ (ReservationStatus::Pending
                        | ReservationStatus::Request
                        | ReservationStatus::Confirmed),
                    ) => {
                        if let Some(existing) = state.conflicting_reservation {
                            return Err(BookingError::DuplicateReservation {
                                event_id: current.event_id,
                                existing,
                            });
                        }
                        next.requested_over_capacity =
                            Self::check_room(state, current.number_of_persons)?;
                        next.status = *status;
                    },
                    Some(other) => {
                        return Err(BookingError::InvalidRequest(format!(
                            "a reservation cannot be restored to {other}"
                        )));
                    },
                }
                Ok(Plan::Update(next))
            },
            LifecycleAction::ChangePartySize { persons } => {
                if *persons == 0 {
                    return Err(BookingError::InvalidRequest(
                        "number of persons must be at least 1".to_string(),
                    ));
                }
                Self::require(current, action, |s| !s.is_terminal())?;
                if current.status.is_capacity_consuming() {
                    next.requested_over_capacity = Self::check_room(state, *persons)?;
                }
                next.number_of_persons = *persons;
                Ok(Plan::Update(next))
            },
            LifecycleAction::Delete => {
                Self::require(current, action, ReservationStatus::is_terminal)?;
                Ok(Plan::Delete(current.id))
            },
            feedback => Err(BookingError::Internal(format!(
                "'{}' is not a lifecycle command",
                feedback.name()
            ))),
        }
    }

    fn persist(env: &LifecycleEnvironment, reservation: Reservation) -> Effect<LifecycleAction> {
        let repository = Arc::clone(&env.repository);
        try_effect! {
            future: async move { repository.update_reservation(reservation).await },
            on_success: |saved| Some(LifecycleAction::Persisted { reservation: saved }),
            on_error: |error| Some(LifecycleAction::PersistenceFailed { error })
        }
    }
}

impl Default for LifecycleReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for LifecycleReducer {
    type State = LifecycleState;
    type Action = LifecycleAction;
    type Environment = LifecycleEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            LifecycleAction::Persisted { reservation } => {
                state.reservation = reservation;
                state.last_error = None;
                SmallVec::new()
            },

            LifecycleAction::WaitlistEntryCreated { entry, reservation } => {
                let entry_id = entry.id;
                state.waitlist_entry = Some(entry);
                let repository = Arc::clone(&env.repository);
                smallvec![try_effect! {
                    future: async move { repository.update_reservation(reservation).await },
                    on_success: |saved| Some(LifecycleAction::Persisted { reservation: saved }),
                    on_error: |error| Some(LifecycleAction::MoveToWaitlistFailed {
                        entry_id,
                        error,
                    })
                }]
            },

            LifecycleAction::Deleted { .. } => {
                state.deleted = true;
                state.last_error = None;
                SmallVec::new()
            },

            LifecycleAction::PersistenceFailed { error } => {
                state.last_error = Some(BookingError::Repository(error));
                SmallVec::new()
            },

            // Compensate: the entry must not outlive the failed status change
            LifecycleAction::MoveToWaitlistFailed { entry_id, error } => {
                state.waitlist_entry = None;
                state.last_error = Some(BookingError::Repository(error));
                let repository = Arc::clone(&env.repository);
                smallvec![Effect::Future(Box::pin(async move {
                    if let Err(rollback) = repository.delete_waitlist_entry(&entry_id).await {
                        tracing::error!(
                            waitlist_entry_id = %entry_id,
                            error = %rollback,
                            "Failed to remove waitlist entry after aborted move"
                        );
                    }
                    None
                }))]
            },

            LifecycleAction::WaitlistEntryWithdrawn {
                previous,
                reservation,
            } => {
                let repository = Arc::clone(&env.repository);
                smallvec![try_effect! {
                    future: async move { repository.update_reservation(reservation).await },
                    on_success: |saved| Some(LifecycleAction::Persisted { reservation: saved }),
                    on_error: |error| Some(LifecycleAction::CancelFailed {
                        entry: previous,
                        error,
                    })
                }]
            },

            // Compensate: the entry stays on the waitlist while the reservation does
            LifecycleAction::CancelFailed { entry, error } => {
                state.last_error = Some(BookingError::Repository(error));
                let repository = Arc::clone(&env.repository);
                smallvec![Effect::Future(Box::pin(async move {
                    let entry_id = entry.id;
                    if let Err(rollback) = repository.update_waitlist_entry(entry).await {
                        tracing::error!(
                            waitlist_entry_id = %entry_id,
                            error = %rollback,
                            "Failed to restore waitlist entry after aborted cancel"
                        );
                    }
                    None
                }))]
            },

            LifecycleAction::ValidationFailed { error } => {
                state.last_error = Some(error);
                SmallVec::new()
            },

            command => match Self::plan(state, &command, env.now()) {
                Err(error) => {
                    self.reduce(state, LifecycleAction::ValidationFailed { error }, env)
                },
                Ok(Plan::Unchanged) => {
                    state.last_error = None;
                    SmallVec::new()
                },
                Ok(Plan::Update(next)) => smallvec![Self::persist(env, next)],
                Ok(Plan::MoveToWaitlist(next, entry)) => {
                    let repository = Arc::clone(&env.repository);
                    smallvec![try_effect! {
                        future: async move { repository.create_waitlist_entry(entry).await },
                        on_success: |stored| Some(LifecycleAction::WaitlistEntryCreated {
                            entry: stored,
                            reservation: next,
                        }),
                        on_error: |error| Some(LifecycleAction::PersistenceFailed { error })
                    }]
                },
                Ok(Plan::CancelWaitlisted(next, withdrawn, previous)) => {
                    let repository = Arc::clone(&env.repository);
                    smallvec![try_effect! {
                        future: async move { repository.update_waitlist_entry(withdrawn).await },
                        on_success: |_stored| Some(LifecycleAction::WaitlistEntryWithdrawn {
                            previous,
                            reservation: next,
                        }),
                        on_error: |error| Some(LifecycleAction::PersistenceFailed { error })
                    }]
                },
                Ok(Plan::Delete(reservation_id)) => {
                    let repository = Arc::clone(&env.repository);
                    smallvec![try_effect! {
                        future: async move { repository.delete_reservation(&reservation_id).await },
                        on_success: |_unit| Some(LifecycleAction::Deleted { reservation_id }),
                        on_error: |error| Some(LifecycleAction::PersistenceFailed { error })
                    }]
                },
            },
        }
    }
}
