//! Error types for the booking engine.
//!
//! [`BookingError`] is the typed taxonomy every public operation returns. Collaborator
//! failures have their own small enums and are folded into it at the boundary.

use crate::types::{EventId, ReservationId, WaitlistEntryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, BookingError>;

/// Booking engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// The identity submitted too often and is temporarily blocked
    #[error("Too many attempts. Try again in {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds until the block lifts
        retry_after_secs: u64,
    },

    /// Referenced event does not exist
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// Event exists but is switched off
    #[error("Event {0} is not accepting reservations")]
    EventNotActive(EventId),

    /// Admission window has not started
    #[error("Booking for event {event_id} opens at {opens_at}")]
    BookingNotYetOpen {
        /// Event
        event_id: EventId,
        /// Window start
        opens_at: DateTime<Utc>,
    },

    /// Admission window has ended
    #[error("Booking for event {event_id} closed at {closed_at}")]
    BookingClosed {
        /// Event
        event_id: EventId,
        /// Window end
        closed_at: DateTime<Utc>,
    },

    /// The email already holds a live reservation for this event
    #[error("A reservation for this event already exists for this email ({existing})")]
    DuplicateReservation {
        /// Event
        event_id: EventId,
        /// The reservation that blocks this one
        existing: ReservationId,
    },

    /// Not enough remaining capacity and no automatic fallback applies
    #[error("Capacity exceeded for event {event_id}: requested {requested}, remaining {remaining}")]
    CapacityExceeded {
        /// Event
        event_id: EventId,
        /// Persons asked for
        requested: u32,
        /// Persons still available
        remaining: u32,
    },

    /// Price could not be computed; nothing was stored
    #[error("Pricing unavailable: {0}")]
    PricingUnavailable(String),

    /// Referenced reservation does not exist
    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// Referenced waitlist entry does not exist
    #[error("Waitlist entry not found: {0}")]
    WaitlistEntryNotFound(WaitlistEntryId),

    /// Transition not permitted from the current status
    #[error("Cannot {attempted} a reservation that is {from}")]
    InvalidTransition {
        /// Current status (or `archived`)
        from: String,
        /// Attempted operation
        attempted: &'static str,
    },

    /// Malformed request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Persistence collaborator failed
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invariant violation inside the engine
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Machine-readable follow-up a caller can offer the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorHint {
    /// Retry the same submission later
    RetryAfter {
        /// Seconds to wait
        seconds: u64,
    },
    /// Offer the event's waitlist instead
    JoinWaitlist {
        /// Event
        event_id: EventId,
    },
    /// Point the user at the reservation they already have
    ExistingReservation {
        /// Existing reservation
        reservation_id: ReservationId,
    },
}

impl BookingError {
    /// Stable machine code for this error kind
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::EventNotFound(_) => "event_not_found",
            Self::EventNotActive(_) => "event_not_active",
            Self::BookingNotYetOpen { .. } => "booking_not_yet_open",
            Self::BookingClosed { .. } => "booking_closed",
            Self::DuplicateReservation { .. } => "duplicate_reservation",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::PricingUnavailable(_) => "pricing_unavailable",
            Self::ReservationNotFound(_) => "reservation_not_found",
            Self::WaitlistEntryNotFound(_) => "waitlist_entry_not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Repository(_) => "repository",
            Self::Internal(_) => "internal",
        }
    }

    /// Check if this error is caused by the caller's input or the event's state
    ///
    /// User errors are surfaced to the caller for messaging and are not defects.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(
            self,
            Self::PricingUnavailable(_) | Self::Repository(_) | Self::Internal(_)
        )
    }

    /// Check if retrying the same call later may succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::PricingUnavailable(_)
                | Self::Repository(RepositoryError::Unavailable(_))
        )
    }

    /// Retry or redirect hint for the caller, if this kind carries one
    #[must_use]
    pub const fn hint(&self) -> Option<ErrorHint> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(ErrorHint::RetryAfter {
                seconds: *retry_after_secs,
            }),
            Self::BookingClosed { event_id, .. } | Self::CapacityExceeded { event_id, .. } => {
                Some(ErrorHint::JoinWaitlist {
                    event_id: *event_id,
                })
            },
            Self::DuplicateReservation { existing, .. } => Some(ErrorHint::ExistingReservation {
                reservation_id: *existing,
            }),
            _ => None,
        }
    }
}

/// Persistence collaborator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Backing store cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Update or delete targeted a missing record
    #[error("{entity} {id} not found")]
    NotFound {
        /// Record kind
        entity: &'static str,
        /// Record ID
        id: String,
    },

    /// Create collided with an existing record
    #[error("{entity} {id} already exists")]
    Conflict {
        /// Record kind
        entity: &'static str,
        /// Record ID
        id: String,
    },
}

/// Pricing collaborator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// No rate configured for the event
    #[error("no rate configured for {0} events")]
    NoRate(String),

    /// Total does not fit in the money type
    #[error("price overflow")]
    Overflow,

    /// Upstream pricing source failed
    #[error("pricing source unavailable: {0}")]
    Unavailable(String),
}

impl From<PricingError> for BookingError {
    fn from(error: PricingError) -> Self {
        Self::PricingUnavailable(error.to_string())
    }
}

/// Rate limiter errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// Identity is blocked
    #[error("blocked for {retry_after_secs} seconds")]
    Blocked {
        /// Seconds until the block lifts
        retry_after_secs: u64,
    },
}

impl From<RateLimitError> for BookingError {
    fn from(error: RateLimitError) -> Self {
        match error {
            RateLimitError::Blocked { retry_after_secs } => Self::RateLimited { retry_after_secs },
        }
    }
}
