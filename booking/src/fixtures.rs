//! Record builders shared by unit tests.

use crate::types::{
    CustomerProfile, Event, Money, Reservation, ReservationId, ReservationStatus, WaitlistEntry,
    WaitlistEntryId, WaitlistStatus,
};
use chrono::Utc;

pub fn reservation(
    event: &Event,
    email: &str,
    persons: u32,
    status: ReservationStatus,
) -> Reservation {
    let now = Utc::now();
    Reservation {
        id: ReservationId::new(),
        event_id: event.id,
        email: email.to_string(),
        number_of_persons: persons,
        status,
        customer: CustomerProfile::default(),
        total_price: Money::default(),
        requested_over_capacity: false,
        created_at: now,
        updated_at: now,
        archived_at: None,
        archived_by: None,
        checked_in_at: None,
        checked_in_by: None,
    }
}

pub fn waitlist_entry(event: &Event, email: &str, persons: u32) -> WaitlistEntry {
    let now = Utc::now();
    WaitlistEntry {
        id: WaitlistEntryId::new(),
        event_id: event.id,
        email: email.to_string(),
        customer: CustomerProfile::default(),
        number_of_persons: persons,
        status: WaitlistStatus::Pending,
        created_at: now,
        updated_at: now,
        contacted_at: None,
        contacted_by: None,
        source_reservation_id: None,
        converted_reservation_id: None,
    }
}
