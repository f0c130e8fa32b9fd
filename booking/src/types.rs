//! Domain types for the venue booking engine.
//!
//! Value objects and entities shared by admission, capacity accounting and the
//! reservation lifecycle. Occupancy figures are not stored on any of them; they are
//! derived from reservation statuses by [`crate::capacity`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a reservation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// Creates a new random `ReservationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ReservationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a waitlist entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaitlistEntryId(Uuid);

impl WaitlistEntryId {
    /// Creates a new random `WaitlistEntryId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WaitlistEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WaitlistEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Event
// ============================================================================

/// Kind of bookable slot
///
/// `Request` events are always reviewed by staff; capacity is advisory for them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    /// Regular weekday show
    Weekday,
    /// Weekend show
    Weekend,
    /// Afternoon show
    Matinee,
    /// Discounted show for care workers
    CareHeroes,
    /// On-request slot, every reservation goes to manual review
    Request,
}

impl EventType {
    /// Whether capacity checks are advisory only for this type
    #[must_use]
    pub const fn is_request(self) -> bool {
        matches!(self, Self::Request)
    }

    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weekday => "weekday",
            Self::Weekend => "weekend",
            Self::Matinee => "matinee",
            Self::CareHeroes => "care-heroes",
            Self::Request => "request",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bookable time slot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// Calendar date of the show
    pub date: NaiveDate,
    /// Event type
    pub event_type: EventType,
    /// Capacity before any override
    pub base_capacity: u32,
    /// Inactive events accept no submissions
    pub is_active: bool,
    /// Submissions before this instant are refused
    pub booking_opens_at: Option<DateTime<Utc>>,
    /// Submissions after this instant are refused
    pub booking_closes_at: Option<DateTime<Utc>>,
    /// Staff switched the event to waitlist-only intake
    pub waitlist_active: bool,
}

impl Event {
    /// Creates an active event without a booking window
    #[must_use]
    pub fn new(date: NaiveDate, event_type: EventType, base_capacity: u32) -> Self {
        Self {
            id: EventId::new(),
            date,
            event_type,
            base_capacity,
            is_active: true,
            booking_opens_at: None,
            booking_closes_at: None,
            waitlist_active: false,
        }
    }

    /// Bounds the admission window
    #[must_use]
    pub fn with_booking_window(
        mut self,
        opens_at: Option<DateTime<Utc>>,
        closes_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.booking_opens_at = opens_at;
        self.booking_closes_at = closes_at;
        self
    }
}

// ============================================================================
// Reservation
// ============================================================================

/// Reservation status
///
/// Exactly one status holds at a time. The archived flag is orthogonal and only
/// applies to `Rejected`/`Cancelled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReservationStatus {
    /// Awaiting staff confirmation
    Pending,
    /// Awaiting manual review on a request-type event
    Request,
    /// Confirmed by staff
    Confirmed,
    /// Guest arrived
    CheckedIn,
    /// Moved to the waitlist by staff
    Waitlist,
    /// Refused by staff
    Rejected,
    /// Cancelled
    Cancelled,
}

impl ReservationStatus {
    /// Stable wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Request => "request",
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked-in",
            Self::Waitlist => "waitlist",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether persons in this status count against capacity
    #[must_use]
    pub const fn is_capacity_consuming(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Request | Self::Confirmed | Self::CheckedIn
        )
    }

    /// `Rejected` and `Cancelled` end a reservation
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }

    /// Awaiting a staff decision
    #[must_use]
    pub const fn is_awaiting_review(self) -> bool {
        matches!(self, Self::Pending | Self::Request)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Customer fields stored opaquely alongside a reservation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Contact name
    pub name: String,
    /// Phone number
    pub phone: Option<String>,
    /// Free-form remarks from the booking form
    pub notes: Option<String>,
}

/// One customer's booking against one event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Reservation ID
    pub id: ReservationId,
    /// Event this reservation is for
    pub event_id: EventId,
    /// Intake identity (normalized to lowercase)
    pub email: String,
    /// Party size
    pub number_of_persons: u32,
    /// Current status
    pub status: ReservationStatus,
    /// Customer details
    pub customer: CustomerProfile,
    /// Price quoted at intake
    pub total_price: Money,
    /// Request-type booking that exceeded remaining capacity when submitted
    pub requested_over_capacity: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    pub archived_at: Option<DateTime<Utc>>,
    /// Operator who archived
    pub archived_by: Option<String>,
    /// Arrival time
    pub checked_in_at: Option<DateTime<Utc>>,
    /// Operator who checked the guest in
    pub checked_in_by: Option<String>,
}

impl Reservation {
    /// Soft-deleted
    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// Whether this reservation blocks another submission with the same email
    #[must_use]
    pub const fn blocks_duplicates(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Persons this reservation holds against capacity
    #[must_use]
    pub const fn consumed_persons(&self) -> u32 {
        if self.status.is_capacity_consuming() {
            self.number_of_persons
        } else {
            0
        }
    }
}

// ============================================================================
// Waitlist
// ============================================================================

/// Waitlist entry status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitlistStatus {
    /// Waiting
    Pending,
    /// Staff reached out to the customer
    Contacted,
    /// Promoted to a reservation
    Converted,
    /// Dropped from the list
    Removed,
}

impl WaitlistStatus {
    /// Stable wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Contacted => "contacted",
            Self::Converted => "converted",
            Self::Removed => "removed",
        }
    }

    /// Entries still waiting for a seat
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Contacted)
    }
}

impl fmt::Display for WaitlistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Demand that could not be admitted directly
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    /// Entry ID
    pub id: WaitlistEntryId,
    /// Event the customer wants
    pub event_id: EventId,
    /// Customer email (normalized)
    pub email: String,
    /// Customer details
    pub customer: CustomerProfile,
    /// Party size
    pub number_of_persons: u32,
    /// Current status
    pub status: WaitlistStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// When staff contacted the customer
    pub contacted_at: Option<DateTime<Utc>>,
    /// Operator who contacted the customer
    pub contacted_by: Option<String>,
    /// Reservation that staff moved to the waitlist, if the entry came from one
    pub source_reservation_id: Option<ReservationId>,
    /// Reservation created on promotion
    pub converted_reservation_id: Option<ReservationId>,
}

// ============================================================================
// Capacity override
// ============================================================================

/// Admin-set capacity ceiling for one event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityOverride {
    /// Event the override applies to
    pub event_id: EventId,
    /// Replacement capacity
    pub capacity: u32,
    /// Disabled overrides are kept but ignored
    pub enabled: bool,
}

// ============================================================================
// Intake request
// ============================================================================

/// Incoming reservation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Target event
    pub event_id: EventId,
    /// Customer email, the intake identity
    pub email: String,
    /// Party size
    pub number_of_persons: u32,
    /// Passed through to storage unchanged
    pub customer: CustomerProfile,
}

impl BookingRequest {
    /// Creates a request with an empty customer profile
    #[must_use]
    pub fn new(event_id: EventId, email: impl Into<String>, number_of_persons: u32) -> Self {
        Self {
            event_id,
            email: email.into(),
            number_of_persons,
            customer: CustomerProfile::default(),
        }
    }

    /// Attach customer details
    #[must_use]
    pub fn with_customer(mut self, customer: CustomerProfile) -> Self {
        self.customer = customer;
        self
    }

    /// Email as used for rate limiting and duplicate detection
    #[must_use]
    pub fn identity(&self) -> String {
        normalize_email(&self.email)
    }
}

/// Trim and lowercase an email so `A@X.com ` and `a@x.com` are the same identity
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_money_display_and_multiply() {
        let price = Money::from_cents(2_450);
        assert_eq!(price.to_string(), "24.50");
        assert_eq!(price.checked_multiply(3), Some(Money::from_cents(7_350)));
        assert_eq!(Money::from_cents(u64::MAX).checked_multiply(2), None);
    }

    #[test]
    fn test_status_classification() {
        use ReservationStatus::*;
        for status in [Pending, Request, Confirmed, CheckedIn] {
            assert!(status.is_capacity_consuming(), "{status}");
            assert!(!status.is_terminal(), "{status}");
        }
        assert!(!Waitlist.is_capacity_consuming());
        assert!(!Waitlist.is_terminal());
        assert!(Rejected.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn test_status_serializes_with_wire_names() {
        let json = serde_json::to_string(&ReservationStatus::CheckedIn).unwrap();
        assert_eq!(json, "\"checked-in\"");
        let parsed: EventType = serde_json::from_str("\"care-heroes\"").unwrap();
        assert_eq!(parsed, EventType::CareHeroes);
    }

    #[test]
    fn test_identity_is_normalized() {
        let request = BookingRequest::new(EventId::new(), "  Guest@Example.COM ", 2);
        assert_eq!(request.identity(), "guest@example.com");
    }

    #[test]
    fn test_waitlist_status_active() {
        assert!(WaitlistStatus::Pending.is_active());
        assert!(WaitlistStatus::Contacted.is_active());
        assert!(!WaitlistStatus::Converted.is_active());
        assert!(!WaitlistStatus::Removed.is_active());
    }
}
