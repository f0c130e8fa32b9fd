//! Venue Booking Demo
//!
//! Walks one evening show through the engine:
//! - Intake until the show is full, with overflow landing on the waitlist
//! - Duplicate submissions and a concurrent rush on the last seats
//! - Staff confirmation, check-in, cancellation and waitlist promotion
//! - A capacity override that leaves the show overbooked
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin demo
//! RUST_LOG=debug cargo run --bin demo
//! ```

use anyhow::Context;
use chrono::{Duration, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use venue_booking::{
    AdmissionOutcome, BookingEngine, BookingRequest, Config, CustomerProfile, Event, EventType,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,venue_booking=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    venue_booking::metrics::register_booking_metrics();

    println!("\n🎭 ============================================");
    println!("   Venue Booking - Live Demo");
    println!("============================================\n");

    let config = Config::from_env();
    let engine = BookingEngine::in_memory(config);
    let gc = engine.start_background_tasks();

    let now = Utc::now();
    let show = engine
        .save_event(
            Event::new(
                (now + Duration::days(14)).date_naive(),
                EventType::Weekend,
                10,
            )
            .with_booking_window(Some(now - Duration::days(1)), Some(now + Duration::days(13))),
        )
        .await
        .context("saving the demo event")?;
    println!("✓ Event {} on {} (capacity {})\n", show.id, show.date, show.base_capacity);

    // ========== Intake ==========

    println!("📋 Intake");
    let family = engine
        .submit(
            BookingRequest::new(show.id, "family@example.com", 7).with_customer(CustomerProfile {
                name: "The Families".to_string(),
                phone: Some("+31 20 555 0101".to_string()),
                notes: None,
            }),
        )
        .await?;
    let family = family
        .reservation()
        .context("first booking should be admitted")?
        .clone();
    println!("  → family of 7: {} ({})", family.status, family.total_price);

    let rush = futures::future::join_all((0..3).map(|i| {
        let engine = engine.clone();
        async move {
            engine
                .submit(BookingRequest::new(show.id, format!("rush{i}@example.com"), 2))
                .await
        }
    }))
    .await;
    for (i, outcome) in rush.into_iter().enumerate() {
        match outcome? {
            AdmissionOutcome::Admitted(r) => println!("  → rush{i}: admitted ({})", r.status),
            AdmissionOutcome::Waitlisted(w) => {
                println!("  → rush{i}: waitlisted ({} persons)", w.number_of_persons);
            },
        }
    }

    match engine
        .submit(BookingRequest::new(show.id, "Family@Example.com", 1))
        .await
    {
        Err(error) => println!("  → duplicate: {error} [{}]", error.code()),
        Ok(_) => println!("  → duplicate unexpectedly accepted"),
    }

    print_capacity(&engine, &show).await?;

    // ========== Staff ==========

    println!("🧑‍💼 Staff actions");
    engine.lifecycle().confirm(family.id).await?;
    let checked_in = engine.lifecycle().check_in(family.id, "front-desk").await?;
    println!("  → family checked in at {:?}", checked_in.checked_in_at);

    let waiting = engine.waitlist().list(&show.id).await?;
    if let Some(first) = waiting.first() {
        engine.waitlist().mark_contacted(first.id, "front-desk").await?;
        match engine.promote_waitlist_entry(first.id).await {
            Ok(promoted) => println!("  → promoted {} to {}", promoted.email, promoted.status),
            Err(error) => println!("  → promotion refused: {error}"),
        }
    }

    let outcome = engine.set_override(show.id, 5, true).await?;
    if let Some(warning) = outcome.warning {
        println!(
            "  ⚠ override to {} leaves the show overbooked by {}",
            warning.effective_capacity, warning.overbooked_by
        );
    }

    print_capacity(&engine, &show).await?;

    let availability = engine.availability(&show.id).await?;
    println!("{}", serde_json::to_string_pretty(&availability)?);

    gc.abort();
    println!("\n✓ Demo complete\n");
    Ok(())
}

async fn print_capacity(engine: &BookingEngine, event: &Event) -> anyhow::Result<()> {
    let snapshot = engine.compute_capacity(&event.id, None).await?;
    println!(
        "\n📊 {}/{} booked ({}%), {} remaining, {} waiting{}\n",
        snapshot.total_booked,
        snapshot.effective_capacity,
        snapshot.utilization_percent,
        snapshot.remaining_capacity,
        snapshot.waitlist_persons,
        if snapshot.is_overbooked {
            format!(", overbooked by {}", snapshot.overbooked_by)
        } else {
            String::new()
        }
    );
    Ok(())
}
