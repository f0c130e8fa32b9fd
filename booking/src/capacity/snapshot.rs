//! Occupancy snapshot.
//!
//! A pure computation over an event, its optional override and its reservations
//! and waitlist entries. Nothing here is cached; recomputing is the only way to
//! learn the current occupancy.

use super::overrides::effective_capacity;
use crate::types::{
    CapacityOverride, Event, EventId, Reservation, ReservationId, ReservationStatus, WaitlistEntry,
};
use serde::{Deserialize, Serialize};

/// Point-in-time occupancy of one event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    /// Event
    pub event_id: EventId,
    /// Capacity stored on the event
    pub base_capacity: u32,
    /// Capacity after applying an enabled override
    pub effective_capacity: u32,
    /// Whether an enabled override is in force
    pub override_active: bool,
    /// Persons in confirmed and checked-in reservations
    pub booked_persons: u32,
    /// Persons in pending and request reservations
    pub pending_persons: u32,
    /// `booked_persons + pending_persons`
    pub total_booked: u32,
    /// Persons on the active waitlist
    pub waitlist_persons: u32,
    /// `max(0, effective_capacity - total_booked)`
    pub remaining_capacity: u32,
    /// `total_booked > effective_capacity`
    pub is_overbooked: bool,
    /// `max(0, total_booked - effective_capacity)`
    pub overbooked_by: u32,
    /// `round(100 * total_booked / effective_capacity)`, 0 for zero capacity
    pub utilization_percent: u32,
    /// Number of confirmed and checked-in reservations
    pub confirmed_count: usize,
    /// Number of pending and request reservations
    pub pending_count: usize,
    /// Number of active waitlist entries
    pub waitlist_count: usize,
}

impl CapacitySnapshot {
    /// Compute the snapshot for `event`.
    ///
    /// Reservations and entries belonging to other events are ignored, as is the
    /// reservation named by `exclude`.
    #[must_use]
    pub fn compute(
        event: &Event,
        capacity_override: Option<&CapacityOverride>,
        reservations: &[Reservation],
        waitlist: &[WaitlistEntry],
        exclude: Option<&ReservationId>,
    ) -> Self {
        let effective = effective_capacity(event, capacity_override);

        let mut booked: u64 = 0;
        let mut pending: u64 = 0;
        let mut confirmed_count = 0;
        let mut pending_count = 0;
        for reservation in reservations
            .iter()
            .filter(|r| r.event_id == event.id)
            .filter(|r| Some(&r.id) != exclude)
        {
            match reservation.status {
                ReservationStatus::Confirmed | ReservationStatus::CheckedIn => {
                    booked += u64::from(reservation.number_of_persons);
                    confirmed_count += 1;
                },
                ReservationStatus::Pending | ReservationStatus::Request => {
                    pending += u64::from(reservation.number_of_persons);
                    pending_count += 1;
                },
                ReservationStatus::Waitlist
                | ReservationStatus::Rejected
                | ReservationStatus::Cancelled => {},
            }
        }

        let active_waitlist = waitlist
            .iter()
            .filter(|w| w.event_id == event.id && w.status.is_active());
        let waitlist_persons: u64 = active_waitlist
            .clone()
            .map(|w| u64::from(w.number_of_persons))
            .sum();
        let waitlist_count = active_waitlist.count();

        let total = booked + pending;
        let capacity = u64::from(effective);
        let utilization = if capacity == 0 {
            0
        } else {
            (200 * total + capacity) / (2 * capacity)
        };

        Self {
            event_id: event.id,
            base_capacity: event.base_capacity,
            effective_capacity: effective,
            override_active: effective_override(event, capacity_override),
            booked_persons: saturate(booked),
            pending_persons: saturate(pending),
            total_booked: saturate(total),
            waitlist_persons: saturate(waitlist_persons),
            remaining_capacity: saturate(capacity.saturating_sub(total)),
            is_overbooked: total > capacity,
            overbooked_by: saturate(total.saturating_sub(capacity)),
            utilization_percent: saturate(utilization),
            confirmed_count,
            pending_count,
            waitlist_count,
        }
    }

    /// Whether `persons` more fit without exceeding effective capacity
    #[must_use]
    pub const fn has_room_for(&self, persons: u32) -> bool {
        self.remaining_capacity >= persons
    }
}

fn effective_override(event: &Event, capacity_override: Option<&CapacityOverride>) -> bool {
    capacity_override.is_some_and(|o| o.enabled && o.event_id == event.id)
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
