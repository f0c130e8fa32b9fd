//! # Venue Booking Core
//!
//! Core traits and types shared by the venue booking engine.
//!
//! This crate provides the small functional core the booking domain is built on:
//! reducers that validate and apply commands, effect descriptions that the caller
//! executes, and an injectable clock.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature (e.g. one reservation and its loaded context)
//! - **Action**: All possible inputs to a reducer (commands and feedback events)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies
//!
//! ## Example
//!
//! ```ignore
//! use venue_booking_core::*;
//!
//! impl Reducer for LifecycleReducer {
//!     type State = LifecycleState;
//!     type Action = LifecycleAction;
//!     type Environment = LifecycleEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut LifecycleState,
//!         action: LifecycleAction,
//!         env: &LifecycleEnvironment,
//!     ) -> SmallVec<[Effect<LifecycleAction>; 4]> {
//!         // Business logic goes here
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! // Drive the reducer until every effect (and its feedback) has been handled
//! run_to_completion(&LifecycleReducer, &mut state, action, &env).await;
//! ```

mod effect_macros;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

pub use effect::run_to_completion;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most actions produce at most a handful of effects, so the result is a
        /// `SmallVec` that stays on the stack for the common case.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the caller of a reducer.
/// They are values (not execution).
pub mod effect {
    use super::reducer::Reducer;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;

    /// Boxed future returned by effect execution.
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by [`run_to_completion`].
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(EffectFuture<Action>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Returns `true` for `Effect::None`
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }

    impl<Action: Send + 'static> Effect<Action> {
        /// Execute this effect, returning the feedback action it produced, if any.
        pub async fn execute(self) -> Option<Action> {
            match self {
                Effect::None => None,
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    fut.await
                },
            }
        }
    }

    /// Send an action through a reducer and drain every resulting effect.
    ///
    /// Each feedback action produced by an effect is reduced immediately, and the
    /// effects it returns are queued behind the remaining ones. The call returns
    /// once the queue is empty, leaving `state` in its final form.
    pub async fn run_to_completion<R>(
        reducer: &R,
        state: &mut R::State,
        action: R::Action,
        env: &R::Environment,
    ) where
        R: Reducer,
        R::Action: Send + 'static,
    {
        let mut pending: VecDeque<Effect<R::Action>> =
            reducer.reduce(state, action, env).into_iter().collect();

        while let Some(effect) = pending.pop_front() {
            if let Some(feedback) = effect.execute().await {
                pending.extend(reducer.reduce(state, feedback, env));
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts wall-clock time for testability
    ///
    /// Wall-clock time is used for business timestamps (`created_at`, booking
    /// windows). Throttling windows use the monotonic `tokio::time::Instant`.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::effect::Effect;
    use super::reducer::Reducer;
    use super::{run_to_completion, smallvec, SmallVec};

    #[derive(Debug, Default)]
    struct Ledger {
        entries: Vec<&'static str>,
    }

    #[derive(Debug, Clone)]
    enum LedgerAction {
        Start,
        Step(&'static str),
    }

    struct LedgerReducer;

    impl Reducer for LedgerReducer {
        type State = Ledger;
        type Action = LedgerAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Ledger,
            action: LedgerAction,
            _env: &(),
        ) -> SmallVec<[Effect<LedgerAction>; 4]> {
            match action {
                LedgerAction::Start => {
                    state.entries.push("start");
                    smallvec![
                        Effect::Future(Box::pin(async { Some(LedgerAction::Step("first")) })),
                        Effect::None,
                        Effect::Future(Box::pin(async { Some(LedgerAction::Step("second")) })),
                    ]
                },
                LedgerAction::Step("first") => {
                    state.entries.push("first");
                    smallvec![Effect::Future(Box::pin(async {
                        Some(LedgerAction::Step("third"))
                    }))]
                },
                LedgerAction::Step(name) => {
                    state.entries.push(name);
                    smallvec![Effect::Future(Box::pin(async { None }))]
                },
            }
        }
    }

    #[tokio::test]
    async fn run_to_completion_feeds_actions_back_in_queue_order() {
        let mut state = Ledger::default();
        run_to_completion(&LedgerReducer, &mut state, LedgerAction::Start, &()).await;
        assert_eq!(state.entries, vec!["start", "first", "second", "third"]);
    }

    #[tokio::test]
    async fn none_effect_produces_no_feedback() {
        let effect: Effect<u32> = Effect::None;
        assert!(effect.is_none());
        assert_eq!(effect.execute().await, None);
    }

    #[test]
    fn debug_does_not_poll_futures() {
        let effect: Effect<u32> = Effect::Future(Box::pin(async { Some(1) }));
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
    }
}
