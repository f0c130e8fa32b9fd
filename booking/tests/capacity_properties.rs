//! Property tests: occupancy stays consistent under arbitrary staff activity.

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use venue_booking::{
    AdmissionOutcome, BookingEngine, BookingRepository, BookingRequest, Config, Event, EventType,
    FlatRatePricing, InMemoryBookingRepository, RateLimitPolicy, Reservation, ReservationId,
    Result,
};
use venue_booking_testing::test_clock;

#[derive(Clone, Debug)]
enum Op {
    Submit { guest: u8, persons: u32 },
    Confirm(usize),
    Reject(usize),
    Cancel(usize),
    CheckIn(usize),
    MoveToWaitlist(usize),
    ChangePartySize(usize, u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..12, 1u32..6).prop_map(|(guest, persons)| Op::Submit { guest, persons }),
        1 => any::<usize>().prop_map(Op::Confirm),
        1 => any::<usize>().prop_map(Op::Reject),
        1 => any::<usize>().prop_map(Op::Cancel),
        1 => any::<usize>().prop_map(Op::CheckIn),
        1 => any::<usize>().prop_map(Op::MoveToWaitlist),
        1 => (any::<usize>(), 1u32..8).prop_map(|(i, p)| Op::ChangePartySize(i, p)),
    ]
}

fn engine() -> BookingEngine {
    let mut config = Config::default();
    config.rate_limit.reservation = RateLimitPolicy::new(1000, 60);
    BookingEngine::new(
        Arc::new(InMemoryBookingRepository::new()),
        FlatRatePricing::default().shared(),
        Arc::new(test_clock()),
        config,
    )
}

/// Reservations as last returned by the engine, in admission order
#[derive(Default)]
struct Model {
    order: Vec<ReservationId>,
    reservations: HashMap<ReservationId, Reservation>,
}

impl Model {
    fn pick(&self, index: usize) -> Option<ReservationId> {
        if self.order.is_empty() {
            None
        } else {
            Some(self.order[index % self.order.len()])
        }
    }

    fn admit(&mut self, reservation: Reservation) {
        self.order.push(reservation.id);
        self.reservations.insert(reservation.id, reservation);
    }

    // Refused operations leave the stored reservation untouched
    fn apply(&mut self, result: Result<Reservation>) {
        if let Ok(reservation) = result {
            self.reservations.insert(reservation.id, reservation);
        }
    }

    fn consumed(&self) -> u32 {
        self.reservations
            .values()
            .map(Reservation::consumed_persons)
            .sum()
    }
}

async fn run(engine: &BookingEngine, event: &Event, model: &mut Model, op: Op) {
    let lifecycle = engine.lifecycle();
    match op {
        Op::Submit { guest, persons } => {
            let request = BookingRequest::new(event.id, format!("guest{guest}@x.com"), persons);
            if let Ok(AdmissionOutcome::Admitted(reservation)) = engine.submit(request).await {
                model.admit(reservation);
            }
        },
        Op::Confirm(i) => {
            if let Some(id) = model.pick(i) {
                model.apply(lifecycle.confirm(id).await);
            }
        },
        Op::Reject(i) => {
            if let Some(id) = model.pick(i) {
                model.apply(lifecycle.reject(id).await);
            }
        },
        Op::Cancel(i) => {
            if let Some(id) = model.pick(i) {
                model.apply(lifecycle.cancel(id).await);
            }
        },
        Op::CheckIn(i) => {
            if let Some(id) = model.pick(i) {
                model.apply(lifecycle.check_in(id, "door").await);
            }
        },
        Op::MoveToWaitlist(i) => {
            if let Some(id) = model.pick(i) {
                model.apply(lifecycle.move_to_waitlist(id).await.map(|(moved, _)| moved));
            }
        },
        Op::ChangePartySize(i, persons) => {
            if let Some(id) = model.pick(i) {
                model.apply(lifecycle.change_party_size(id, persons).await);
            }
        },
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_occupancy_matches_every_acknowledged_transition(
        capacity in 1u32..25,
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (snapshot, model, stored) = runtime.block_on(async {
            let engine = engine();
            let event = engine
                .save_event(Event::new(
                    NaiveDate::from_ymd_opt(2025, 9, 20).unwrap(),
                    EventType::Weekday,
                    capacity,
                ))
                .await
                .unwrap();

            let mut model = Model::default();
            for op in ops {
                run(&engine, &event, &mut model, op).await;
            }

            let stored = engine
                .repository()
                .list_reservations_by_event(&event.id)
                .await
                .unwrap();
            let snapshot = engine.compute_capacity(&event.id, None).await.unwrap();
            (snapshot, model, stored)
        });

        prop_assert_eq!(stored.len(), model.reservations.len());
        for reservation in &stored {
            prop_assert_eq!(Some(reservation), model.reservations.get(&reservation.id));
        }

        prop_assert_eq!(snapshot.total_booked, model.consumed());
        prop_assert_eq!(snapshot.total_booked, snapshot.booked_persons + snapshot.pending_persons);
        prop_assert_eq!(
            snapshot.remaining_capacity,
            capacity.saturating_sub(snapshot.total_booked)
        );
        prop_assert!(snapshot.total_booked <= capacity);
        prop_assert!(!snapshot.is_overbooked);
    }
}
