//! In-memory repository.
//!
//! Backs the demo binary and the test suite. Writes can be made to fail on demand
//! to exercise the engine's all-or-nothing guarantees.

use super::{BookingRepository, RepositoryResult};
use crate::error::RepositoryError;
use crate::types::{
    CapacityOverride, Event, EventId, Reservation, ReservationId, WaitlistEntry, WaitlistEntryId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

// Rows carry their insertion sequence so listings keep creation order even when
// the clock is frozen.
#[derive(Debug, Default)]
struct Tables {
    sequence: u64,
    events: HashMap<EventId, Event>,
    reservations: HashMap<ReservationId, (u64, Reservation)>,
    waitlist: HashMap<WaitlistEntryId, (u64, WaitlistEntry)>,
    overrides: HashMap<EventId, CapacityOverride>,
}

impl Tables {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

/// `HashMap`-backed [`BookingRepository`]
#[derive(Debug, Default)]
pub struct InMemoryBookingRepository {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
    fail_reservation_writes: AtomicBool,
    fail_waitlist_writes: AtomicBool,
}

impl InMemoryBookingRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`RepositoryError::Unavailable`]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make reservation writes fail while other tables keep working
    pub fn set_fail_reservation_writes(&self, fail: bool) {
        self.fail_reservation_writes.store(fail, Ordering::SeqCst);
    }

    /// Make waitlist writes fail while other tables keep working
    pub fn set_fail_waitlist_writes(&self, fail: bool) {
        self.fail_waitlist_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored reservations across all events
    pub async fn reservation_count(&self) -> usize {
        self.tables.read().await.reservations.len()
    }

    /// Number of stored waitlist entries across all events
    pub async fn waitlist_count(&self) -> usize {
        self.tables.read().await.waitlist.len()
    }

    fn check_writable(&self) -> RepositoryResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "in-memory store rejecting writes".to_string(),
            ));
        }
        Ok(())
    }

    fn check_reservations_writable(&self) -> RepositoryResult<()> {
        self.check_writable()?;
        if self.fail_reservation_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "in-memory store rejecting reservation writes".to_string(),
            ));
        }
        Ok(())
    }

    fn check_waitlist_writable(&self) -> RepositoryResult<()> {
        self.check_writable()?;
        if self.fail_waitlist_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "in-memory store rejecting waitlist writes".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn get_event(&self, id: &EventId) -> RepositoryResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(id).cloned())
    }

    async fn save_event(&self, event: Event) -> RepositoryResult<Event> {
        self.check_writable()?;
        self.tables
            .write()
            .await
            .events
            .insert(event.id, event.clone());
        Ok(event)
    }

    async fn list_events(&self) -> RepositoryResult<Vec<Event>> {
        let mut events: Vec<Event> = self.tables.read().await.events.values().cloned().collect();
        events.sort_by_key(|e| e.date);
        Ok(events)
    }

    async fn get_reservation(&self, id: &ReservationId) -> RepositoryResult<Option<Reservation>> {
        Ok(self
            .tables
            .read()
            .await
            .reservations
            .get(id)
            .map(|(_, r)| r.clone()))
    }

    async fn list_reservations_by_event(
        &self,
        event_id: &EventId,
    ) -> RepositoryResult<Vec<Reservation>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&(u64, Reservation)> = tables
            .reservations
            .values()
            .filter(|(_, r)| &r.event_id == event_id)
            .collect();
        rows.sort_by_key(|(sequence, _)| *sequence);
        Ok(rows.into_iter().map(|(_, r)| r.clone()).collect())
    }

    async fn create_reservation(&self, reservation: Reservation) -> RepositoryResult<Reservation> {
        self.check_reservations_writable()?;
        let mut tables = self.tables.write().await;
        if tables.reservations.contains_key(&reservation.id) {
            return Err(RepositoryError::Conflict {
                entity: "reservation",
                id: reservation.id.to_string(),
            });
        }
        let sequence = tables.next_sequence();
        tables
            .reservations
            .insert(reservation.id, (sequence, reservation.clone()));
        Ok(reservation)
    }

    async fn update_reservation(&self, reservation: Reservation) -> RepositoryResult<Reservation> {
        self.check_reservations_writable()?;
        let mut tables = self.tables.write().await;
        let Some((_, stored)) = tables.reservations.get_mut(&reservation.id) else {
            return Err(RepositoryError::NotFound {
                entity: "reservation",
                id: reservation.id.to_string(),
            });
        };
        *stored = reservation.clone();
        Ok(reservation)
    }

    async fn delete_reservation(&self, id: &ReservationId) -> RepositoryResult<()> {
        self.check_reservations_writable()?;
        self.tables
            .write()
            .await
            .reservations
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "reservation",
                id: id.to_string(),
            })
    }

    async fn get_waitlist_entry(
        &self,
        id: &WaitlistEntryId,
    ) -> RepositoryResult<Option<WaitlistEntry>> {
        Ok(self
            .tables
            .read()
            .await
            .waitlist
            .get(id)
            .map(|(_, w)| w.clone()))
    }

    async fn list_waitlist_by_event(
        &self,
        event_id: &EventId,
    ) -> RepositoryResult<Vec<WaitlistEntry>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&(u64, WaitlistEntry)> = tables
            .waitlist
            .values()
            .filter(|(_, w)| &w.event_id == event_id)
            .collect();
        rows.sort_by_key(|(sequence, _)| *sequence);
        Ok(rows.into_iter().map(|(_, w)| w.clone()).collect())
    }

    async fn create_waitlist_entry(&self, entry: WaitlistEntry) -> RepositoryResult<WaitlistEntry> {
        self.check_waitlist_writable()?;
        let mut tables = self.tables.write().await;
        if tables.waitlist.contains_key(&entry.id) {
            return Err(RepositoryError::Conflict {
                entity: "waitlist entry",
                id: entry.id.to_string(),
            });
        }
        let sequence = tables.next_sequence();
        tables.waitlist.insert(entry.id, (sequence, entry.clone()));
        Ok(entry)
    }

    async fn update_waitlist_entry(&self, entry: WaitlistEntry) -> RepositoryResult<WaitlistEntry> {
        self.check_waitlist_writable()?;
        let mut tables = self.tables.write().await;
        let Some((_, stored)) = tables.waitlist.get_mut(&entry.id) else {
            return Err(RepositoryError::NotFound {
                entity: "waitlist entry",
                id: entry.id.to_string(),
            });
        };
        *stored = entry.clone();
        Ok(entry)
    }

    async fn delete_waitlist_entry(&self, id: &WaitlistEntryId) -> RepositoryResult<()> {
        self.check_waitlist_writable()?;
        self.tables
            .write()
            .await
            .waitlist
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "waitlist entry",
                id: id.to_string(),
            })
    }

    async fn get_capacity_override(
        &self,
        event_id: &EventId,
    ) -> RepositoryResult<Option<CapacityOverride>> {
        Ok(self.tables.read().await.overrides.get(event_id).copied())
    }

    async fn set_capacity_override(
        &self,
        capacity_override: CapacityOverride,
    ) -> RepositoryResult<CapacityOverride> {
        self.check_writable()?;
        self.tables
            .write()
            .await
            .overrides
            .insert(capacity_override.event_id, capacity_override);
        Ok(capacity_override)
    }

    async fn clear_capacity_override(
        &self,
        event_id: &EventId,
    ) -> RepositoryResult<Option<CapacityOverride>> {
        self.check_writable()?;
        Ok(self.tables.write().await.overrides.remove(event_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::types::{EventType, ReservationStatus};
    use chrono::NaiveDate;

    fn event() -> Event {
        Event::new(NaiveDate::from_ymd_opt(2025, 9, 9).unwrap(), EventType::Matinee, 40)
    }

    #[tokio::test]
    async fn test_reservations_are_scoped_to_their_event() {
        let repository = InMemoryBookingRepository::new();
        let first = event();
        let second = event();
        repository
            .create_reservation(fixtures::reservation(
                &first,
                "a@x.com",
                2,
                ReservationStatus::Pending,
            ))
            .await
            .unwrap();
        repository
            .create_reservation(fixtures::reservation(
                &second,
                "b@x.com",
                3,
                ReservationStatus::Pending,
            ))
            .await
            .unwrap();

        let listed = repository.list_reservations_by_event(&first.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].email, "a@x.com");
    }

    #[tokio::test]
    async fn test_update_of_missing_reservation_is_not_found() {
        let repository = InMemoryBookingRepository::new();
        let reservation = fixtures::reservation(&event(), "a@x.com", 2, ReservationStatus::Pending);
        let err = repository.update_reservation(reservation).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { entity: "reservation", .. }));
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let repository = InMemoryBookingRepository::new();
        let reservation = fixtures::reservation(&event(), "a@x.com", 2, ReservationStatus::Pending);
        repository.create_reservation(reservation.clone()).await.unwrap();
        let err = repository.create_reservation(reservation).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_failing_writes_leave_reads_working() {
        let repository = InMemoryBookingRepository::new();
        let event = event();
        repository.save_event(event.clone()).await.unwrap();
        repository.set_fail_writes(true);

        let err = repository.save_event(event.clone()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Unavailable(_)));
        assert!(repository.get_event(&event.id).await.unwrap().is_some());

        repository.set_fail_writes(false);
        assert!(repository.save_event(event).await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_waitlist_writes_spare_reservations() {
        let repository = InMemoryBookingRepository::new();
        let event = event();
        repository.set_fail_waitlist_writes(true);

        let entry = fixtures::waitlist_entry(&event, "a@x.com", 2);
        let err = repository.create_waitlist_entry(entry).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Unavailable(_)));

        let reservation = fixtures::reservation(&event, "a@x.com", 2, ReservationStatus::Pending);
        assert!(repository.create_reservation(reservation).await.is_ok());
    }

    #[tokio::test]
    async fn test_override_round_trip() {
        let repository = InMemoryBookingRepository::new();
        let event_id = EventId::new();
        let capacity_override = CapacityOverride {
            event_id,
            capacity: 12,
            enabled: true,
        };
        repository.set_capacity_override(capacity_override).await.unwrap();
        assert_eq!(
            repository.get_capacity_override(&event_id).await.unwrap(),
            Some(capacity_override)
        );
        assert_eq!(
            repository.clear_capacity_override(&event_id).await.unwrap(),
            Some(capacity_override)
        );
        assert_eq!(repository.get_capacity_override(&event_id).await.unwrap(), None);
    }
}
