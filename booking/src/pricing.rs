//! Pricing collaborator.
//!
//! Price formulas are not the engine's concern: admission asks a
//! [`PricingService`] for a total and stores whatever it returns.

use crate::error::PricingError;
use crate::types::{BookingRequest, Event, EventType, Money};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Computes the total price of a booking request
#[async_trait]
pub trait PricingService: Send + Sync {
    /// Total for `request` on `event`
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] when no price can be produced.
    async fn calculate_price(
        &self,
        event: &Event,
        request: &BookingRequest,
    ) -> Result<Money, PricingError>;
}

/// Per-person rate by event type
#[derive(Clone, Debug)]
pub struct FlatRatePricing {
    rates: HashMap<EventType, Money>,
    default_rate: Option<Money>,
}

impl FlatRatePricing {
    /// Pricing where every event type uses `per_person`
    #[must_use]
    pub fn new(per_person: Money) -> Self {
        Self {
            rates: HashMap::new(),
            default_rate: Some(per_person),
        }
    }

    /// Pricing with no default; only types given to [`with_rate`](Self::with_rate) are priced
    #[must_use]
    pub fn without_default() -> Self {
        Self {
            rates: HashMap::new(),
            default_rate: None,
        }
    }

    /// Set the per-person rate for one event type
    #[must_use]
    pub fn with_rate(mut self, event_type: EventType, per_person: Money) -> Self {
        self.rates.insert(event_type, per_person);
        self
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(self) -> Arc<dyn PricingService> {
        Arc::new(self)
    }
}

impl Default for FlatRatePricing {
    fn default() -> Self {
        Self::new(Money::from_cents(2_500))
    }
}

#[async_trait]
impl PricingService for FlatRatePricing {
    async fn calculate_price(
        &self,
        event: &Event,
        request: &BookingRequest,
    ) -> Result<Money, PricingError> {
        let rate = self
            .rates
            .get(&event.event_type)
            .copied()
            .or(self.default_rate)
            .ok_or_else(|| PricingError::NoRate(event.event_type.to_string()))?;

        let total = rate
            .checked_multiply(request.number_of_persons)
            .ok_or(PricingError::Overflow)?;

        tracing::debug!(
            event_id = %event.id,
            persons = request.number_of_persons,
            total_cents = total.cents(),
            "Price calculated"
        );
        Ok(total)
    }
}
