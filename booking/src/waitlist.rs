//! Staff operations on an event's waitlist.
//!
//! The engine never promotes automatically. Staff list the queue, record that a
//! customer was contacted, drop entries, and promote through
//! [`BookingEngine::promote_waitlist_entry`](crate::BookingEngine::promote_waitlist_entry).

use crate::error::{BookingError, Result};
use crate::locks::BookingLocks;
use crate::repository::BookingRepository;
use crate::types::{EventId, ReservationStatus, WaitlistEntry, WaitlistEntryId, WaitlistStatus};
use std::sync::Arc;
use venue_booking_core::environment::Clock;

/// Waitlist queue management
#[derive(Clone)]
pub struct WaitlistService {
    repository: Arc<dyn BookingRepository>,
    locks: Arc<BookingLocks>,
    clock: Arc<dyn Clock>,
}

impl WaitlistService {
    /// Create a waitlist service
    #[must_use]
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        locks: Arc<BookingLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            locks,
            clock,
        }
    }

    /// Entries for an event in arrival order, including converted and removed ones
    ///
    /// # Errors
    ///
    /// Returns `EventNotFound` for an unknown event, or a repository error.
    pub async fn list(&self, event_id: &EventId) -> Result<Vec<WaitlistEntry>> {
        if self.repository.get_event(event_id).await?.is_none() {
            return Err(BookingError::EventNotFound(*event_id));
        }
        Ok(self.repository.list_waitlist_by_event(event_id).await?)
    }

    /// `pending → contacted`, recording who reached out and when
    ///
    /// # Errors
    ///
    /// `WaitlistEntryNotFound`, `InvalidTransition` or a repository error.
    pub async fn mark_contacted(
        &self,
        entry_id: WaitlistEntryId,
        operator: impl Into<String> + Send,
    ) -> Result<WaitlistEntry> {
        let operator = operator.into();
        self.update(entry_id, "mark as contacted", |entry, now| {
            if entry.status != WaitlistStatus::Pending {
                return false;
            }
            entry.status = WaitlistStatus::Contacted;
            entry.contacted_at = Some(now);
            entry.contacted_by = Some(operator);
            true
        })
        .await
    }

    /// `pending|contacted → removed`
    ///
    /// An entry created by moving a reservation to the waitlist takes that
    /// reservation with it: a source still in `waitlist` is cancelled first, and
    /// restored if the entry write then fails.
    ///
    /// # Errors
    ///
    /// `WaitlistEntryNotFound`, `InvalidTransition` or a repository error.
    pub async fn remove(&self, entry_id: WaitlistEntryId) -> Result<WaitlistEntry> {
        let event_id = self.load(&entry_id).await?.event_id;
        let _event_guard = self.locks.events.lock(&event_id).await;

        let mut entry = self.load(&entry_id).await?;
        if !entry.status.is_active() {
            return Err(BookingError::InvalidTransition {
                from: entry.status.to_string(),
                attempted: "remove",
            });
        }

        let _source_guard = match entry.source_reservation_id {
            Some(id) => Some(self.locks.reservations.lock(&id).await),
            None => None,
        };
        let source = match entry.source_reservation_id {
            Some(id) => self
                .repository
                .get_reservation(&id)
                .await?
                .filter(|r| r.status == ReservationStatus::Waitlist && !r.is_archived()),
            None => None,
        };

        let now = self.clock.now();
        let cancelled = match &source {
            Some(previous) => {
                let mut cancelled = previous.clone();
                cancelled.status = ReservationStatus::Cancelled;
                cancelled.updated_at = now;
                Some(self.repository.update_reservation(cancelled).await?)
            },
            None => None,
        };

        let from = entry.status;
        entry.status = WaitlistStatus::Removed;
        entry.updated_at = now;
        let entry = match self.repository.update_waitlist_entry(entry).await {
            Ok(entry) => entry,
            Err(error) => {
                if let Some(previous) = source {
                    let reservation_id = previous.id;
                    if let Err(rollback) = self.repository.update_reservation(previous).await {
                        tracing::error!(
                            reservation_id = %reservation_id,
                            error = %rollback,
                            "Failed to restore reservation after aborted waitlist removal"
                        );
                    }
                }
                return Err(error.into());
            },
        };

        if let Some(reservation) = cancelled {
            crate::metrics::record_transition(reservation.status.as_str());
            tracing::info!(
                reservation_id = %reservation.id,
                event_id = %reservation.event_id,
                "Waitlisted reservation cancelled with its entry"
            );
        }
        tracing::info!(
            waitlist_entry_id = %entry.id,
            event_id = %entry.event_id,
            from = %from,
            to = %entry.status,
            "Waitlist entry updated"
        );
        Ok(entry)
    }

    async fn update<F>(
        &self,
        entry_id: WaitlistEntryId,
        attempted: &'static str,
        apply: F,
    ) -> Result<WaitlistEntry>
    where
        F: FnOnce(&mut WaitlistEntry, chrono::DateTime<chrono::Utc>) -> bool + Send,
    {
        let event_id = self.load(&entry_id).await?.event_id;
        let _event_guard = self.locks.events.lock(&event_id).await;

        let mut entry = self.load(&entry_id).await?;
        let from = entry.status;
        let now = self.clock.now();
        if !apply(&mut entry, now) {
            return Err(BookingError::InvalidTransition {
                from: from.to_string(),
                attempted,
            });
        }
        entry.updated_at = now;

        let entry = self.repository.update_waitlist_entry(entry).await?;
        tracing::info!(
            waitlist_entry_id = %entry.id,
            event_id = %entry.event_id,
            from = %from,
            to = %entry.status,
            "Waitlist entry updated"
        );
        Ok(entry)
    }

    async fn load(&self, entry_id: &WaitlistEntryId) -> Result<WaitlistEntry> {
        self.repository
            .get_waitlist_entry(entry_id)
            .await?
            .ok_or(BookingError::WaitlistEntryNotFound(*entry_id))
    }
}
