//! Rate limit boundary on the submission path, driven by paused Tokio time.

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use venue_booking::{
    BookingEngine, BookingError, BookingRequest, Config, Event, EventType, FlatRatePricing,
    InMemoryBookingRepository, LimitClass,
};
use venue_booking_testing::test_clock;

async fn engine_with_events(count: u32) -> (BookingEngine, Vec<Event>) {
    let engine = BookingEngine::new(
        Arc::new(InMemoryBookingRepository::new()),
        FlatRatePricing::default().shared(),
        Arc::new(test_clock()),
        Config::default(),
    );
    let mut events = Vec::new();
    for day in 1..=count {
        let event = Event::new(
            NaiveDate::from_ymd_opt(2025, 11, day).unwrap(),
            EventType::Weekday,
            40,
        );
        events.push(engine.save_event(event).await.unwrap());
    }
    (engine, events)
}

#[tokio::test(start_paused = true)]
async fn test_sixth_submission_in_a_minute_is_blocked() {
    let (engine, events) = engine_with_events(7).await;

    for event in &events[..5] {
        engine
            .submit(BookingRequest::new(event.id, "busy@x.com", 1))
            .await
            .unwrap();
    }

    let err = engine
        .submit(BookingRequest::new(events[5].id, "busy@x.com", 1))
        .await
        .unwrap_err();
    assert_eq!(err, BookingError::RateLimited { retry_after_secs: 300 });
    assert!(err.is_transient());

    // Other identities are unaffected
    engine
        .submit(BookingRequest::new(events[5].id, "calm@x.com", 1))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(120)).await;
    let err = engine
        .submit(BookingRequest::new(events[5].id, "busy@x.com", 1))
        .await
        .unwrap_err();
    assert_eq!(err, BookingError::RateLimited { retry_after_secs: 180 });

    tokio::time::advance(Duration::from_secs(181)).await;
    engine
        .submit(BookingRequest::new(events[6].id, "BUSY@x.com", 1))
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_manual_block_and_unblock() {
    let (engine, events) = engine_with_events(1).await;
    let limiter = engine.rate_limiter();

    limiter.block("spam@x.com", Duration::from_secs(3600));
    assert!(limiter.is_blocked("spam@x.com", LimitClass::Reservation));

    let err = engine
        .submit(BookingRequest::new(events[0].id, "spam@x.com", 1))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "rate_limited");

    limiter.unblock("spam@x.com");
    engine
        .submit(BookingRequest::new(events[0].id, "spam@x.com", 1))
        .await
        .unwrap();
}
