//! Engine facade.
//!
//! Wires the capacity model, admission controller, lifecycle and waitlist
//! services around one repository, one lock registry and one rate limiter, so
//! that every path that reads-then-writes occupancy is serialized the same way.

use crate::admission::{AdmissionController, AdmissionOutcome};
use crate::capacity::{Availability, CapacityModel, CapacitySnapshot, OverrideOutcome};
use crate::config::Config;
use crate::error::{BookingError, Result};
use crate::lifecycle::LifecycleService;
use crate::locks::BookingLocks;
use crate::pricing::{FlatRatePricing, PricingService};
use crate::rate_limiter::RateLimiter;
use crate::repository::{BookingRepository, InMemoryBookingRepository};
use crate::types::{
    BookingRequest, CapacityOverride, Event, EventId, Reservation, ReservationId, WaitlistEntryId,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use venue_booking_core::environment::{Clock, SystemClock};

/// The reservation admission and capacity engine
#[derive(Clone)]
pub struct BookingEngine {
    repository: Arc<dyn BookingRepository>,
    capacity: CapacityModel,
    admission: AdmissionController,
    lifecycle: LifecycleService,
    waitlist: crate::waitlist::WaitlistService,
    rate_limiter: Arc<RateLimiter>,
    locks: Arc<BookingLocks>,
    config: Config,
}

impl BookingEngine {
    /// Build an engine over the given collaborators
    #[must_use]
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        pricing: Arc<dyn PricingService>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        let locks = Arc::new(BookingLocks::new());
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let capacity = CapacityModel::new(
            Arc::clone(&repository),
            Arc::clone(&clock),
            config.admission.soft_capacity_warning_percent,
        );
        let admission = AdmissionController::new(
            Arc::clone(&repository),
            pricing,
            capacity.clone(),
            Arc::clone(&rate_limiter),
            Arc::clone(&locks),
            Arc::clone(&clock),
            config.admission.clone(),
        );
        let lifecycle = LifecycleService::new(
            Arc::clone(&repository),
            capacity.clone(),
            Arc::clone(&locks),
            Arc::clone(&clock),
            config.admission.clone(),
        );
        let waitlist = crate::waitlist::WaitlistService::new(
            Arc::clone(&repository),
            Arc::clone(&locks),
            clock,
        );

        Self {
            repository,
            capacity,
            admission,
            lifecycle,
            waitlist,
            rate_limiter,
            locks,
            config,
        }
    }

    /// Engine backed by an in-memory store, flat-rate pricing and the system clock
    #[must_use]
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            Arc::new(InMemoryBookingRepository::new()),
            FlatRatePricing::default().shared(),
            Arc::new(SystemClock),
            config,
        )
    }

    /// Occupancy queries and override management
    #[must_use]
    pub const fn capacity(&self) -> &CapacityModel {
        &self.capacity
    }

    /// Intake and waitlist promotion
    #[must_use]
    pub const fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Staff transitions on reservations
    #[must_use]
    pub const fn lifecycle(&self) -> &LifecycleService {
        &self.lifecycle
    }

    /// Staff operations on waitlists
    #[must_use]
    pub const fn waitlist(&self) -> &crate::waitlist::WaitlistService {
        &self.waitlist
    }

    /// Shared rate limiter
    #[must_use]
    pub const fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Backing repository
    #[must_use]
    pub const fn repository(&self) -> &Arc<dyn BookingRepository> {
        &self.repository
    }

    /// Configuration the engine was built with
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Start the rate limiter's garbage collection task
    ///
    /// Must be called from within a Tokio runtime. The task stops on its own
    /// once the engine is dropped.
    #[must_use]
    pub fn start_background_tasks(&self) -> JoinHandle<()> {
        self.rate_limiter
            .spawn_gc(self.config.rate_limit.gc_interval())
    }

    /// Create or update an event
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a zero capacity or an inverted booking window, or a
    /// repository error.
    #[tracing::instrument(skip(self, event), fields(event_id = %event.id))]
    pub async fn save_event(&self, event: Event) -> Result<Event> {
        if event.base_capacity == 0 {
            return Err(BookingError::InvalidRequest(
                "event capacity must be positive".to_string(),
            ));
        }
        if let (Some(opens), Some(closes)) = (event.booking_opens_at, event.booking_closes_at) {
            if opens >= closes {
                return Err(BookingError::InvalidRequest(
                    "booking window must open before it closes".to_string(),
                ));
            }
        }

        let _event_guard = self.locks.events.lock(&event.id).await;
        let event = self.repository.save_event(event).await?;
        tracing::info!(
            date = %event.date,
            event_type = %event.event_type,
            base_capacity = event.base_capacity,
            is_active = event.is_active,
            "Event saved"
        );
        Ok(event)
    }

    /// All events ordered by date
    ///
    /// # Errors
    ///
    /// Returns a repository error if the store fails.
    pub async fn list_events(&self) -> Result<Vec<Event>> {
        Ok(self.repository.list_events().await?)
    }

    /// Submit a booking request; see [`AdmissionController::submit`]
    ///
    /// # Errors
    ///
    /// See [`AdmissionController::submit`].
    pub async fn submit(&self, request: BookingRequest) -> Result<AdmissionOutcome> {
        self.admission.submit(request).await
    }

    /// Promote a waitlist entry; see [`AdmissionController::promote_waitlist_entry`]
    ///
    /// # Errors
    ///
    /// See [`AdmissionController::promote_waitlist_entry`].
    pub async fn promote_waitlist_entry(&self, entry_id: WaitlistEntryId) -> Result<Reservation> {
        self.admission.promote_waitlist_entry(entry_id).await
    }

    /// Occupancy of an event, optionally leaving one reservation out
    ///
    /// # Errors
    ///
    /// Returns `EventNotFound` for an unknown event, or a repository error.
    pub async fn compute_capacity(
        &self,
        event_id: &EventId,
        exclude: Option<&ReservationId>,
    ) -> Result<CapacitySnapshot> {
        self.capacity.compute_capacity(event_id, exclude).await
    }

    /// Customer-facing availability of an event
    ///
    /// # Errors
    ///
    /// Returns `EventNotFound` for an unknown event, or a repository error.
    pub async fn availability(&self, event_id: &EventId) -> Result<Availability> {
        self.capacity.availability(event_id).await
    }

    /// Set a capacity override, serialized with admissions on the same event
    ///
    /// # Errors
    ///
    /// Returns `EventNotFound` for an unknown event, or a repository error.
    pub async fn set_override(
        &self,
        event_id: EventId,
        capacity: u32,
        enabled: bool,
    ) -> Result<OverrideOutcome> {
        let _event_guard = self.locks.events.lock(&event_id).await;
        self.capacity.set_override(event_id, capacity, enabled).await
    }

    /// Remove a capacity override
    ///
    /// # Errors
    ///
    /// Returns a repository error if the store fails.
    pub async fn clear_override(&self, event_id: EventId) -> Result<Option<CapacityOverride>> {
        let _event_guard = self.locks.events.lock(&event_id).await;
        self.capacity.clear_override(event_id).await
    }
}
