//! # Venue Booking
//!
//! Reservation admission and capacity engine for finite-capacity venue events.
//!
//! Customers submit booking requests against dated events. The engine decides
//! whether each request is admitted (`pending`, or `request` for manually
//! reviewed event types), registered on the waitlist, or refused, and staff then
//! move reservations through a fixed lifecycle.
//!
//! # Architecture
//!
//! ```text
//!  BookingRequest
//!        │
//!        ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ RateLimiter  │──▶│  Admission   │──▶│   Pricing    │
//! └──────────────┘   │  Controller  │   └──────────────┘
//!                    └──────┬───────┘
//!                           │ event lock
//!                           ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Lifecycle   │──▶│  Capacity    │◀──│   Waitlist   │
//! │  (reducer)   │   │    Model     │   │   Service    │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        └──────────────────┼──────────────────┘
//!                           ▼
//!                  ┌─────────────────┐
//!                  │BookingRepository│
//!                  └─────────────────┘
//! ```
//!
//! # Key Rules
//!
//! ## 1. Occupancy is derived, never cached
//!
//! ```text
//! total_booked = Σ persons in pending | request | confirmed | checked-in
//! remaining    = max(0, effective_capacity - total_booked)
//! ```
//!
//! Every decision recomputes a [`CapacitySnapshot`] from stored reservations, so
//! releasing seats is nothing more than writing a non-consuming status.
//!
//! ## 2. Admission is serialized per event
//!
//! The duplicate check, capacity decision and write happen under the event's
//! lock. Two submissions can never both take the last seat.
//!
//! ## 3. Overflow goes to the waitlist
//!
//! A party that does not fit is registered on the waitlist instead of being
//! admitted. `request`-type events are the exception: capacity is advisory there
//! and the reservation is only flagged.
//!
//! # Usage
//!
//! ```ignore
//! use venue_booking::{BookingEngine, BookingRequest, Config};
//!
//! let engine = BookingEngine::in_memory(Config::from_env());
//! let outcome = engine.submit(BookingRequest::new(event_id, "guest@example.com", 2)).await?;
//! ```

#![forbid(unsafe_code)]

pub mod admission;
pub mod capacity;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod metrics;
pub mod pricing;
pub mod rate_limiter;
pub mod repository;
pub mod types;
pub mod waitlist;

#[cfg(test)]
mod fixtures;

pub use admission::{AdmissionController, AdmissionOutcome};
pub use capacity::{
    Availability, BookingStatus, CapacityModel, CapacitySnapshot, OverbookingWarning,
    OverrideOutcome,
};
pub use config::{AdmissionConfig, Config, RateLimitConfig, TelemetryConfig};
pub use engine::BookingEngine;
pub use error::{BookingError, ErrorHint, PricingError, RateLimitError, RepositoryError, Result};
pub use lifecycle::{LifecycleAction, LifecycleReducer, LifecycleService, LifecycleState};
pub use pricing::{FlatRatePricing, PricingService};
pub use rate_limiter::{LimitClass, RateLimitInfo, RateLimitPolicy, RateLimitStatus, RateLimiter};
pub use repository::{BookingRepository, InMemoryBookingRepository};
pub use types::{
    BookingRequest, CapacityOverride, CustomerProfile, Event, EventId, EventType, Money,
    Reservation, ReservationId, ReservationStatus, WaitlistEntry, WaitlistEntryId, WaitlistStatus,
};
pub use waitlist::WaitlistService;
