use crate::capacity::CapacitySnapshot;
use crate::error::{BookingError, RepositoryError};
use crate::repository::BookingRepository;
use crate::types::{
    Event, Reservation, ReservationId, ReservationStatus, WaitlistEntry, WaitlistEntryId,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use venue_booking_core::environment::Clock;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the reservation lifecycle
///
/// Commands come from staff. Events are fed back by the repository effects the
/// reducer emits; state only changes once a write has been acknowledged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleAction {
    // Commands
    /// `pending|request → confirmed`
    Confirm,
    /// `pending|request|confirmed → rejected`
    Reject,
    /// `pending|request → waitlist`, registering a waitlist entry for the party
    MoveToWaitlist,
    /// `confirmed → checked-in`
    CheckIn {
        /// Staff member at the door
        operator: String,
    },
    /// `checked-in → confirmed`
    UndoCheckIn,
    /// Any live status `→ cancelled`
    Cancel,
    /// Soft-delete a rejected or cancelled reservation
    Archive {
        /// Staff member archiving
        operator: String,
    },
    /// Clear the archive marker, optionally reactivating the reservation
    Restore {
        /// `None` keeps the terminal status; `pending`, `request` or `confirmed`
        /// reactivate it subject to the intake capacity rule
        target: Option<ReservationStatus>,
    },
    /// Staff correction of the party size
    ChangePartySize {
        /// New number of persons
        persons: u32,
    },
    /// Remove a rejected or cancelled reservation for good
    Delete,

    // Events
    /// The repository stored the new reservation state
    Persisted {
        /// Reservation as stored
        reservation: Reservation,
    },
    /// The waitlist entry for a move to the waitlist was stored
    WaitlistEntryCreated {
        /// Entry as stored
        entry: WaitlistEntry,
        /// Reservation state to write next
        reservation: Reservation,
    },
    /// The reservation was removed from the repository
    Deleted {
        /// Removed reservation
        reservation_id: ReservationId,
    },
    /// A repository write failed; nothing changed
    PersistenceFailed {
        /// Repository error
        error: RepositoryError,
    },
    /// The reservation write after creating a waitlist entry failed
    MoveToWaitlistFailed {
        /// Entry to remove again
        entry_id: WaitlistEntryId,
        /// Repository error
        error: RepositoryError,
    },
    /// The waitlist entry of a cancelled `waitlist` reservation was withdrawn
    WaitlistEntryWithdrawn {
        /// Entry as it was before the withdrawal
        previous: WaitlistEntry,
        /// Reservation state to write next
        reservation: Reservation,
    },
    /// The reservation write after withdrawing its waitlist entry failed
    CancelFailed {
        /// Entry to put back
        entry: WaitlistEntry,
        /// Repository error
        error: RepositoryError,
    },
    /// A command was refused
    ValidationFailed {
        /// Why
        error: BookingError,
    },
}

impl LifecycleAction {
    /// Verb used in logs and `InvalidTransition` messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Reject => "reject",
            Self::MoveToWaitlist => "waitlist",
            Self::CheckIn { .. } => "check in",
            Self::UndoCheckIn => "undo the check-in of",
            Self::Cancel => "cancel",
            Self::Archive { .. } => "archive",
            Self::Restore { .. } => "restore",
            Self::ChangePartySize { .. } => "change the party size of",
            Self::Delete => "delete",
            Self::Persisted { .. } => "persisted",
            Self::WaitlistEntryCreated { .. } => "waitlist entry created",
            Self::Deleted { .. } => "deleted",
            Self::PersistenceFailed { .. } => "persistence failed",
            Self::MoveToWaitlistFailed { .. } => "move to waitlist failed",
            Self::WaitlistEntryWithdrawn { .. } => "waitlist entry withdrawn",
            Self::CancelFailed { .. } => "cancel failed",
            Self::ValidationFailed { .. } => "validation failed",
        }
    }

    /// Commands whose outcome depends on the event's occupancy
    #[must_use]
    pub const fn needs_capacity(&self) -> bool {
        matches!(
            self,
            Self::Restore { target: Some(_) } | Self::ChangePartySize { .. }
        )
    }

    /// Commands that run under the event lock: the capacity-dependent ones,
    /// plus cancel, which may withdraw a waitlist entry
    #[must_use]
    pub const fn needs_event_lock(&self) -> bool {
        self.needs_capacity() || matches!(self, Self::Cancel)
    }
}

// ============================================================================
// State
// ============================================================================

/// One reservation plus the context its transitions are validated against
#[derive(Clone, Debug)]
pub struct LifecycleState {
    /// Reservation as last stored
    pub reservation: Reservation,
    /// Event, loaded for capacity-dependent commands
    pub event: Option<Event>,
    /// Occupancy with this reservation excluded
    pub capacity: Option<CapacitySnapshot>,
    /// Another live reservation with the same email on the same event
    pub conflicting_reservation: Option<ReservationId>,
    /// Entry created by a move to the waitlist
    pub waitlist_entry: Option<WaitlistEntry>,
    /// Active entry that a `waitlist` reservation was moved into
    pub linked_entry: Option<WaitlistEntry>,
    /// Set once the reservation has been removed
    pub deleted: bool,
    /// Error from the last command, if it was refused or failed
    pub last_error: Option<BookingError>,
}

impl LifecycleState {
    /// State for a reservation with no capacity context
    #[must_use]
    pub const fn new(reservation: Reservation) -> Self {
        Self {
            reservation,
            event: None,
            capacity: None,
            conflicting_reservation: None,
            waitlist_entry: None,
            linked_entry: None,
            deleted: false,
            last_error: None,
        }
    }

    /// Attach the event and its occupancy (computed without this reservation)
    #[must_use]
    pub fn with_capacity(mut self, event: Event, capacity: CapacitySnapshot) -> Self {
        self.event = Some(event);
        self.capacity = Some(capacity);
        self
    }

    /// Attach the live reservation that would conflict on reactivation
    #[must_use]
    pub fn with_conflict(mut self, conflicting: Option<ReservationId>) -> Self {
        self.conflicting_reservation = conflicting;
        self
    }

    /// Attach the active waitlist entry this reservation was moved into
    #[must_use]
    pub fn with_linked_entry(mut self, entry: Option<WaitlistEntry>) -> Self {
        self.linked_entry = entry;
        self
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the lifecycle reducer
#[derive(Clone)]
pub struct LifecycleEnvironment {
    /// Clock for `updated_at` and operator timestamps
    pub clock: Arc<dyn Clock>,
    /// Where transitions are written
    pub repository: Arc<dyn BookingRepository>,
}

impl LifecycleEnvironment {
    /// Creates a new `LifecycleEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, repository: Arc<dyn BookingRepository>) -> Self {
        Self { clock, repository }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
