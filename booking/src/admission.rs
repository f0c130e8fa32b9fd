//! Admission controller.
//!
//! The only path from an external booking request to a stored reservation or
//! waitlist entry. Checks run in a fixed order and stop at the first failure:
//!
//! ```text
//! rate limit → event lookup → duplicate guard → window/activity
//!            → capacity decision → pricing → persist
//! ```
//!
//! Everything from the duplicate guard to the final write runs under the event's
//! lock, so two submissions for the same event can never both take the last seat.
//! Nothing is written until pricing has succeeded.

use crate::capacity::{CapacityModel, CapacitySnapshot};
use crate::config::AdmissionConfig;
use crate::error::{BookingError, Result};
use crate::locks::BookingLocks;
use crate::pricing::PricingService;
use crate::rate_limiter::{LimitClass, RateLimiter};
use crate::repository::BookingRepository;
use crate::types::{
    normalize_email, BookingRequest, Event, EventId, Reservation, ReservationId, ReservationStatus,
    WaitlistEntry, WaitlistEntryId, WaitlistStatus,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use venue_booking_core::environment::Clock;

/// Outcome of a successful submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "record", rename_all = "snake_case")]
pub enum AdmissionOutcome {
    /// Stored as a `pending` or `request` reservation
    Admitted(Reservation),
    /// Not enough room; registered on the waitlist instead
    Waitlisted(WaitlistEntry),
}

impl AdmissionOutcome {
    /// The reservation, when admitted
    #[must_use]
    pub const fn reservation(&self) -> Option<&Reservation> {
        match self {
            Self::Admitted(reservation) => Some(reservation),
            Self::Waitlisted(_) => None,
        }
    }

    /// The waitlist entry, when waitlisted
    #[must_use]
    pub const fn waitlist_entry(&self) -> Option<&WaitlistEntry> {
        match self {
            Self::Admitted(_) => None,
            Self::Waitlisted(entry) => Some(entry),
        }
    }

    /// Whether a reservation was created
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }
}

/// Where an admissible request should go
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Create a reservation with this status
    Reservation {
        status: ReservationStatus,
        over_capacity: bool,
    },
    /// Register on the waitlist
    Waitlist,
}

/// Intake decision for `persons` on `event` given its current occupancy.
///
/// Request-type events always admit with status `request`; capacity is advisory
/// there and only flags the reservation. Everything else is admitted as
/// `pending` when it fits and is waitlisted otherwise, or refused when the
/// waitlist is disabled.
pub(crate) fn place(
    event: &Event,
    snapshot: &CapacitySnapshot,
    persons: u32,
    enable_waitlist: bool,
) -> Result<Placement> {
    if event.event_type.is_request() {
        return Ok(Placement::Reservation {
            status: ReservationStatus::Request,
            over_capacity: !snapshot.has_room_for(persons),
        });
    }

    if !event.waitlist_active && snapshot.has_room_for(persons) {
        return Ok(Placement::Reservation {
            status: ReservationStatus::Pending,
            over_capacity: false,
        });
    }

    if enable_waitlist {
        Ok(Placement::Waitlist)
    } else {
        Err(BookingError::CapacityExceeded {
            event_id: event.id,
            requested: persons,
            remaining: snapshot.remaining_capacity,
        })
    }
}

/// First live reservation on `event_id` held by `email`, ignoring `exclude`
pub(crate) async fn live_duplicate(
    repository: &dyn BookingRepository,
    event_id: &EventId,
    email: &str,
    exclude: Option<&ReservationId>,
) -> Result<Option<ReservationId>> {
    let identity = normalize_email(email);
    Ok(repository
        .list_reservations_by_event(event_id)
        .await?
        .into_iter()
        .filter(|r| Some(&r.id) != exclude)
        .find(|r| r.blocks_duplicates() && normalize_email(&r.email) == identity)
        .map(|r| r.id))
}

/// Turns booking requests into reservations or waitlist entries
#[derive(Clone)]
pub struct AdmissionController {
    repository: Arc<dyn BookingRepository>,
    pricing: Arc<dyn PricingService>,
    capacity: CapacityModel,
    rate_limiter: Arc<RateLimiter>,
    locks: Arc<BookingLocks>,
    clock: Arc<dyn Clock>,
    config: AdmissionConfig,
}

impl AdmissionController {
    /// Create an admission controller
    #[must_use]
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        pricing: Arc<dyn PricingService>,
        capacity: CapacityModel,
        rate_limiter: Arc<RateLimiter>,
        locks: Arc<BookingLocks>,
        clock: Arc<dyn Clock>,
        config: AdmissionConfig,
    ) -> Self {
        Self {
            repository,
            pricing,
            capacity,
            rate_limiter,
            locks,
            clock,
            config,
        }
    }

    /// Submit a booking request.
    ///
    /// Returns [`AdmissionOutcome::Waitlisted`] rather than an error when the
    /// event has no room for the party.
    ///
    /// # Errors
    ///
    /// - `RateLimited` when the email exceeded the reservation policy
    /// - `InvalidRequest` for a malformed request
    /// - `EventNotFound`, `DuplicateReservation`, `EventNotActive`,
    ///   `BookingNotYetOpen`, `BookingClosed` in that order of precedence
    /// - `CapacityExceeded` when the party does not fit and the waitlist is disabled
    /// - `PricingUnavailable` when no price could be computed
    /// - `Repository` when storage fails
    #[tracing::instrument(
        skip(self, request),
        fields(event_id = %request.event_id, persons = request.number_of_persons)
    )]
    pub async fn submit(&self, request: BookingRequest) -> Result<AdmissionOutcome> {
        let result = self.admit(request).await;

        match &result {
            Ok(AdmissionOutcome::Admitted(reservation)) => {
                crate::metrics::record_admission(reservation.status.as_str());
                tracing::info!(
                    reservation_id = %reservation.id,
                    status = %reservation.status,
                    over_capacity = reservation.requested_over_capacity,
                    "Reservation admitted"
                );
            },
            Ok(AdmissionOutcome::Waitlisted(entry)) => {
                crate::metrics::record_admission("waitlisted");
                tracing::info!(waitlist_entry_id = %entry.id, "Request waitlisted");
            },
            Err(error) => {
                crate::metrics::record_rejection(error.code());
                if error.is_user_error() {
                    tracing::info!(code = error.code(), "Submission refused");
                } else {
                    tracing::warn!(code = error.code(), error = %error, "Submission failed");
                }
            },
        }

        result
    }

    async fn admit(&self, request: BookingRequest) -> Result<AdmissionOutcome> {
        let identity = request.identity();
        self.rate_limiter.check(&identity, LimitClass::Reservation)?;
        self.validate(&request, &identity)?;

        let _event_guard = self.locks.events.lock(&request.event_id).await;

        let event = self.capacity.load_event(&request.event_id).await?;

        if let Some(existing) =
            live_duplicate(self.repository.as_ref(), &event.id, &identity, None).await?
        {
            return Err(BookingError::DuplicateReservation {
                event_id: event.id,
                existing,
            });
        }

        self.check_window(&event)?;

        let snapshot = self.capacity.snapshot_for(&event, None).await?;
        let placement = place(
            &event,
            &snapshot,
            request.number_of_persons,
            self.config.enable_waitlist,
        )?;

        let now = self.clock.now();
        match placement {
            Placement::Waitlist => {
                let entry = WaitlistEntry {
                    id: WaitlistEntryId::new(),
                    event_id: event.id,
                    email: identity,
                    customer: request.customer,
                    number_of_persons: request.number_of_persons,
                    status: WaitlistStatus::Pending,
                    created_at: now,
                    updated_at: now,
                    contacted_at: None,
                    contacted_by: None,
                    source_reservation_id: None,
                    converted_reservation_id: None,
                };
                let entry = self.repository.create_waitlist_entry(entry).await?;
                Ok(AdmissionOutcome::Waitlisted(entry))
            },
            Placement::Reservation {
                status,
                over_capacity,
            } => {
                let total_price = self.pricing.calculate_price(&event, &request).await?;
                let reservation = Reservation {
                    id: ReservationId::new(),
                    event_id: event.id,
                    email: identity,
                    number_of_persons: request.number_of_persons,
                    status,
                    customer: request.customer,
                    total_price,
                    requested_over_capacity: over_capacity,
                    created_at: now,
                    updated_at: now,
                    archived_at: None,
                    archived_by: None,
                    checked_in_at: None,
                    checked_in_by: None,
                };
                let reservation = self.repository.create_reservation(reservation).await?;
                Ok(AdmissionOutcome::Admitted(reservation))
            },
        }
    }

    /// Promote a waitlist entry to a reservation.
    ///
    /// Staff-initiated, so the booking window and rate limit do not apply. The
    /// duplicate guard and capacity rule do; a party that still does not fit is
    /// refused rather than waitlisted again. An entry created by moving a
    /// reservation to the waitlist revives that reservation instead of creating
    /// a second one.
    ///
    /// # Errors
    ///
    /// - `WaitlistEntryNotFound` for an unknown entry
    /// - `InvalidTransition` if the entry is already converted or removed, or its
    ///   source reservation has left the `waitlist` status
    /// - `ReservationNotFound` if its source reservation was deleted
    /// - `DuplicateReservation`, `CapacityExceeded`, `PricingUnavailable`, `Repository`
    #[tracing::instrument(skip(self))]
    pub async fn promote_waitlist_entry(&self, entry_id: WaitlistEntryId) -> Result<Reservation> {
        let event_id = self.load_entry(&entry_id).await?.event_id;
        let _event_guard = self.locks.events.lock(&event_id).await;
        let mut entry = self.load_entry(&entry_id).await?;

        if !entry.status.is_active() {
            return Err(BookingError::InvalidTransition {
                from: entry.status.to_string(),
                attempted: "promote",
            });
        }

        let _source_guard = match entry.source_reservation_id {
            Some(id) => Some(self.locks.reservations.lock(&id).await),
            None => None,
        };
        let source = self.waitlisted_source(&entry).await?;

        let event = self.capacity.load_event(&event_id).await?;
        if let Some(existing) = live_duplicate(
            self.repository.as_ref(),
            &event.id,
            &entry.email,
            source.as_ref().map(|r| &r.id),
        )
        .await?
        {
            return Err(BookingError::DuplicateReservation {
                event_id: event.id,
                existing,
            });
        }

        let snapshot = self.capacity.snapshot_for(&event, None).await?;
        let Placement::Reservation {
            status,
            over_capacity,
        } = place(&event, &snapshot, entry.number_of_persons, false)?
        else {
            return Err(BookingError::Internal(
                "placement without waitlist fallback chose the waitlist".to_string(),
            ));
        };

        let request = BookingRequest {
            event_id: event.id,
            email: entry.email.clone(),
            number_of_persons: entry.number_of_persons,
            customer: entry.customer.clone(),
        };
        let total_price = self.pricing.calculate_price(&event, &request).await?;

        let now = self.clock.now();
        let (reservation, previous) = match source {
            Some(previous) => {
                let mut revived = previous.clone();
                revived.status = status;
                revived.number_of_persons = entry.number_of_persons;
                revived.total_price = total_price;
                revived.requested_over_capacity = over_capacity;
                revived.updated_at = now;
                (
                    self.repository.update_reservation(revived).await?,
                    Some(previous),
                )
            },
            None => {
                let created = self
                    .repository
                    .create_reservation(Reservation {
                        id: ReservationId::new(),
                        event_id: event.id,
                        email: entry.email.clone(),
                        number_of_persons: entry.number_of_persons,
                        status,
                        customer: entry.customer.clone(),
                        total_price,
                        requested_over_capacity: over_capacity,
                        created_at: now,
                        updated_at: now,
                        archived_at: None,
                        archived_by: None,
                        checked_in_at: None,
                        checked_in_by: None,
                    })
                    .await?;
                (created, None)
            },
        };

        entry.status = WaitlistStatus::Converted;
        entry.converted_reservation_id = Some(reservation.id);
        entry.updated_at = now;
        if let Err(error) = self.repository.update_waitlist_entry(entry).await {
            let rollback = match previous {
                Some(previous) => self.repository.update_reservation(previous).await.map(|_| ()),
                None => self.repository.delete_reservation(&reservation.id).await,
            };
            if let Err(rollback) = rollback {
                tracing::error!(
                    reservation_id = %reservation.id,
                    error = %rollback,
                    "Failed to roll back promoted reservation"
                );
            }
            return Err(error.into());
        }

        crate::metrics::record_admission("promoted");
        tracing::info!(
            waitlist_entry_id = %entry_id,
            reservation_id = %reservation.id,
            status = %reservation.status,
            "Waitlist entry promoted"
        );
        Ok(reservation)
    }

    // The reservation an entry was moved out of. It must still sit in `waitlist`;
    // anything else means the customer withdrew and the entry is stale.
    async fn waitlisted_source(&self, entry: &WaitlistEntry) -> Result<Option<Reservation>> {
        let Some(id) = entry.source_reservation_id else {
            return Ok(None);
        };
        match self.repository.get_reservation(&id).await? {
            Some(source)
                if source.status == ReservationStatus::Waitlist && !source.is_archived() =>
            {
                Ok(Some(source))
            },
            Some(source) => Err(BookingError::InvalidTransition {
                from: if source.is_archived() {
                    "archived".to_string()
                } else {
                    source.status.to_string()
                },
                attempted: "promote",
            }),
            None => Err(BookingError::ReservationNotFound(id)),
        }
    }

    async fn load_entry(&self, entry_id: &WaitlistEntryId) -> Result<WaitlistEntry> {
        self.repository
            .get_waitlist_entry(entry_id)
            .await?
            .ok_or(BookingError::WaitlistEntryNotFound(*entry_id))
    }

    fn validate(&self, request: &BookingRequest, identity: &str) -> Result<()> {
        if request.number_of_persons == 0 {
            return Err(BookingError::InvalidRequest(
                "number of persons must be at least 1".to_string(),
            ));
        }
        if let Some(max) = self.config.max_persons_per_reservation {
            if request.number_of_persons > max {
                return Err(BookingError::InvalidRequest(format!(
                    "number of persons must be at most {max}"
                )));
            }
        }
        let valid_email = identity
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !valid_email {
            return Err(BookingError::InvalidRequest(
                "email address is not valid".to_string(),
            ));
        }
        Ok(())
    }

    fn check_window(&self, event: &Event) -> Result<()> {
        if !event.is_active {
            return Err(BookingError::EventNotActive(event.id));
        }
        let now = self.clock.now();
        if let Some(opens_at) = event.booking_opens_at {
            if now < opens_at {
                return Err(BookingError::BookingNotYetOpen {
                    event_id: event.id,
                    opens_at,
                });
            }
        }
        if let Some(closed_at) = event.booking_closes_at {
            if now > closed_at {
                return Err(BookingError::BookingClosed {
                    event_id: event.id,
                    closed_at,
                });
            }
        }
        Ok(())
    }
}
