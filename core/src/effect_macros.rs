//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when wrapping a fallible collaborator call
//! (repository write, pricing lookup) into an `Effect::Future` that feeds a
//! success or failure action back into the reducer.

/// Create an `Effect::Future` from a fallible future
///
/// The future must resolve to a `Result`. Exactly one of the two closures runs,
/// and its `Option<Action>` becomes the effect's feedback.
///
/// # Example
///
/// ```rust,ignore
/// use venue_booking_core::try_effect;
///
/// let repository = Arc::clone(&env.repository);
/// let record = state.reservation.clone();
/// try_effect! {
///     future: async move { repository.update_reservation(record).await },
///     on_success: |saved| Some(LifecycleAction::Persisted { reservation: saved }),
///     on_error: |error| Some(LifecycleAction::PersistenceFailed { error })
/// }
/// ```
#[macro_export]
macro_rules! try_effect {
    (
        future: $future:expr,
        on_success: |$success_param:ident| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::Future(::std::boxed::Box::pin(async move {
            match $future.await {
                ::std::result::Result::Ok($success_param) => $success_body,
                ::std::result::Result::Err($error_param) => $error_body,
            }
        }))
    };
}
