//! Reservation lifecycle state machine.
//!
//! Transitions are validated centrally by [`LifecycleReducer`]; no other code path
//! writes a reservation's status after intake. Capacity is never adjusted here:
//! a status write is all it takes to release or consume seats, because occupancy
//! is always recomputed from the stored reservations.

mod actions;
mod reducer;
mod service;

pub use actions::{LifecycleAction, LifecycleEnvironment, LifecycleState};
pub use reducer::LifecycleReducer;
pub use service::LifecycleService;
