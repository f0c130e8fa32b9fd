//! Persistence interface.
//!
//! The engine talks to storage only through [`BookingRepository`]. Any backing
//! store works as long as reads for a single event are strongly consistent with
//! the writes that preceded them. Errors are returned as [`RepositoryError`] and
//! re-raised unchanged by the engine; retries belong to the implementation.

mod memory;

pub use memory::InMemoryBookingRepository;

use crate::error::RepositoryError;
use crate::types::{
    CapacityOverride, Event, EventId, Reservation, ReservationId, WaitlistEntry, WaitlistEntryId,
};
use async_trait::async_trait;

/// Result alias for repository calls
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Storage for events, reservations, waitlist entries and capacity overrides
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Load an event
    async fn get_event(&self, id: &EventId) -> RepositoryResult<Option<Event>>;

    /// Create or replace an event
    async fn save_event(&self, event: Event) -> RepositoryResult<Event>;

    /// All events, ordered by date
    async fn list_events(&self) -> RepositoryResult<Vec<Event>>;

    /// Load a reservation
    async fn get_reservation(&self, id: &ReservationId) -> RepositoryResult<Option<Reservation>>;

    /// Reservations for an event in creation order
    async fn list_reservations_by_event(
        &self,
        event_id: &EventId,
    ) -> RepositoryResult<Vec<Reservation>>;

    /// Store a new reservation
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if the ID is taken.
    async fn create_reservation(&self, reservation: Reservation) -> RepositoryResult<Reservation>;

    /// Replace an existing reservation
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the reservation does not exist.
    async fn update_reservation(&self, reservation: Reservation) -> RepositoryResult<Reservation>;

    /// Remove a reservation permanently
    async fn delete_reservation(&self, id: &ReservationId) -> RepositoryResult<()>;

    /// Load a waitlist entry
    async fn get_waitlist_entry(
        &self,
        id: &WaitlistEntryId,
    ) -> RepositoryResult<Option<WaitlistEntry>>;

    /// Waitlist entries for an event in creation order
    async fn list_waitlist_by_event(&self, event_id: &EventId)
    -> RepositoryResult<Vec<WaitlistEntry>>;

    /// Store a new waitlist entry
    async fn create_waitlist_entry(&self, entry: WaitlistEntry) -> RepositoryResult<WaitlistEntry>;

    /// Replace an existing waitlist entry
    async fn update_waitlist_entry(&self, entry: WaitlistEntry) -> RepositoryResult<WaitlistEntry>;

    /// Remove a waitlist entry permanently
    async fn delete_waitlist_entry(&self, id: &WaitlistEntryId) -> RepositoryResult<()>;

    /// Override stored for an event
    async fn get_capacity_override(
        &self,
        event_id: &EventId,
    ) -> RepositoryResult<Option<CapacityOverride>>;

    /// Create or replace the override for `capacity_override.event_id`
    async fn set_capacity_override(
        &self,
        capacity_override: CapacityOverride,
    ) -> RepositoryResult<CapacityOverride>;

    /// Remove the override for an event, returning it
    async fn clear_capacity_override(
        &self,
        event_id: &EventId,
    ) -> RepositoryResult<Option<CapacityOverride>>;
}
