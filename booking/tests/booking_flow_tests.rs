use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use tracing_test::traced_test;
use uuid::Uuid;

use booking::availability::{NO_SLOTS_HINT, SlotsState};
use booking::config::AppConfig;
use booking::error::BookingError;
use booking::flow::lookup::LookupOutcome;
use booking::flow::{BookingFlow, SubmitOutcome};
use booking::metrics::counters::Counters;
use booking::model::{AddOn, Slot, Venue};
use booking::pricing::BalanceStatus;
use booking::repository::BookingRepository;
use booking::time::today;

use mock_store::{InMemoryBookingRepository, ScriptedCheckout};

struct Fixture {
    repo: Arc<InMemoryBookingRepository>,
    venue: Venue,
    slots: Vec<Slot>,
    cake: AddOn,
    balloons: AddOn,
}

fn in_days(n: u64) -> NaiveDate {
    today().checked_add_days(Days::new(n)).unwrap()
}

fn slot(start: &str, end: &str) -> Slot {
    Slot {
        id: Uuid::new_v4(),
        start_time: start.into(),
        end_time: end.into(),
    }
}

async fn fixture() -> anyhow::Result<Fixture> {
    let repo = Arc::new(InMemoryBookingRepository::new());

    let venue = Venue {
        id: Uuid::new_v4(),
        name: "Private Theatre".into(),
        price: 1_999,
        decoration_fee: 499,
        base_members: 6,
    };
    repo.insert_venue(&venue).await?;

    // Inserted out of order; the store returns them by start time.
    let slots = vec![
        slot("13:00", "16:00"),
        slot("10:00", "13:00"),
        slot("19:00", "22:00"),
    ];
    for s in &slots {
        repo.insert_slot(&venue.id, s).await?;
    }
    let mut slots = slots;
    slots.sort_by(|a, b| a.start_time.cmp(&b.start_time));

    let cake = AddOn {
        id: Uuid::new_v4(),
        name: "Cake".into(),
        price: 600,
    };
    let balloons = AddOn {
        id: Uuid::new_v4(),
        name: "Balloons".into(),
        price: 250,
    };
    repo.insert_add_on(&cake).await?;
    repo.insert_add_on(&balloons).await?;

    Ok(Fixture {
        repo,
        venue,
        slots,
        cake,
        balloons,
    })
}

async fn open(fx: &Fixture) -> BookingFlow<InMemoryBookingRepository> {
    BookingFlow::open(fx.repo.clone(), fx.venue.id, AppConfig::default())
        .await
        .unwrap()
}

fn fill_contact(flow: &BookingFlow<InMemoryBookingRepository>) {
    flow.set_booking_name("Ravi's anniversary");
    flow.set_persons(4);
    flow.set_whatsapp("+91 99999 00000");
    flow.set_email("ravi@example.com");
}

#[tokio::test]
async fn open_loads_catalogs_in_start_order() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;

    assert_eq!(flow.venue(), &fx.venue);
    assert_eq!(flow.slot_catalog(), fx.slots.as_slice());
    assert_eq!(flow.add_on_catalog().len(), 2);
    assert_eq!(flow.slots_state(), SlotsState::NoDateChosen);
    assert!(!flow.can_submit());

    Ok(())
}

#[tokio::test]
async fn open_unknown_venue_is_not_found() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let missing = Uuid::new_v4();

    let err = BookingFlow::open(fx.repo.clone(), missing, AppConfig::default())
        .await
        .err()
        .unwrap();

    assert_eq!(err, BookingError::VenueNotFound(missing));
    Ok(())
}

#[tokio::test]
async fn open_store_failure_is_fetch_failure() -> anyhow::Result<()> {
    let fx = fixture().await?;
    fx.repo.fail_venue_fetch.store(true, Ordering::SeqCst);

    let err = BookingFlow::open(fx.repo.clone(), fx.venue.id, AppConfig::default())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, BookingError::FetchFailure(_)));
    assert_eq!(err.user_message(), "Loading failed. Please try again.");
    Ok(())
}

#[tokio::test]
async fn selecting_a_date_defaults_to_earliest_slot() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;
    let date = in_days(3);

    let outcome = flow.select_date(date).await?;

    assert_eq!(
        outcome,
        LookupOutcome::Applied(SlotsState::Ready {
            date,
            slots: fx.slots.clone()
        })
    );
    assert_eq!(flow.selected_slot(), Some(fx.slots[0].id));
    assert_eq!(flow.draft().booking_date, Some(date));
    assert!(flow.can_submit());

    let labels: Vec<String> = flow.slot_views()?.iter().map(|v| v.label()).collect();
    assert_eq!(
        labels,
        vec!["10:00 AM - 1:00 PM", "1:00 PM - 4:00 PM", "7:00 PM - 10:00 PM"]
    );

    Ok(())
}

#[tokio::test]
async fn paid_bookings_block_and_unpaid_do_not() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let date = in_days(5);
    fx.repo.insert_paid(fx.venue.id, fx.slots[0].id, date).await;
    fx.repo.insert_unpaid(fx.venue.id, fx.slots[1].id, date).await;
    // Paid, but for another day.
    fx.repo.insert_paid(fx.venue.id, fx.slots[2].id, in_days(6)).await;

    let flow = open(&fx).await;
    flow.select_date(date).await?;

    let state = flow.slots_state();
    let ids: Vec<Uuid> = state.slots().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![fx.slots[1].id, fx.slots[2].id]);
    assert_eq!(flow.selected_slot(), Some(fx.slots[1].id));

    Ok(())
}

#[tokio::test]
async fn kept_selection_survives_a_date_change() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;

    flow.select_date(in_days(2)).await?;
    flow.select_slot(fx.slots[2].id)?;

    flow.select_date(in_days(4)).await?;
    assert_eq!(flow.selected_slot(), Some(fx.slots[2].id));

    Ok(())
}

#[tokio::test]
async fn fully_booked_date_reports_no_slots_and_clears_selection() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let date = in_days(7);
    for s in &fx.slots {
        fx.repo.insert_paid(fx.venue.id, s.id, date).await;
    }

    let flow = open(&fx).await;
    flow.select_date(in_days(8)).await?;
    assert!(flow.selected_slot().is_some());

    let outcome = flow.select_date(date).await?;
    assert_eq!(
        outcome,
        LookupOutcome::Applied(SlotsState::NoSlotsAvailable { date })
    );
    assert_eq!(flow.slots_state().hint(), Some(NO_SLOTS_HINT));
    assert_eq!(flow.selected_slot(), None);
    assert!(!flow.can_submit());

    Ok(())
}

#[tokio::test]
async fn fetch_failure_is_reported_not_raised() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;
    fx.repo.fail_bookings_fetch.store(true, Ordering::SeqCst);
    let date = in_days(1);

    let outcome = flow.select_date(date).await?;

    match outcome {
        LookupOutcome::Applied(SlotsState::Failed { date: d, message }) => {
            assert_eq!(d, date);
            assert_eq!(message, "Loading failed. Please try again.");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(flow.selected_slot(), None);
    assert_eq!(Counters::get(&flow.counters().fetch_failures), 1);

    Ok(())
}

#[tokio::test]
async fn past_date_is_rejected() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;

    let yesterday = today().pred_opt().unwrap();
    let err = flow.select_date(yesterday).await.unwrap_err();

    assert!(matches!(err, BookingError::InvalidDraft(_)));
    assert_eq!(flow.slots_state(), SlotsState::NoDateChosen);
    Ok(())
}

#[tokio::test]
#[traced_test]
async fn stale_lookup_never_overwrites_newer_date() {
    let fx = fixture().await.unwrap();
    let d1 = in_days(10);
    let d2 = in_days(11);

    // d2 has the first slot taken so the two results are distinguishable.
    fx.repo.insert_paid(fx.venue.id, fx.slots[0].id, d2).await;
    let gate = fx.repo.gate(d1).await;

    let flow = Arc::new(open(&fx).await);

    let slow = {
        let flow = flow.clone();
        tokio::spawn(async move { flow.select_date(d1).await })
    };

    // d1 is now in flight and parked on its gate.
    fx.repo.gate_entered.notified().await;
    assert_eq!(flow.slots_state(), SlotsState::Loading { date: d1 });

    let fast = flow.select_date(d2).await.unwrap();
    assert!(!fast.is_superseded());

    gate.notify_one();
    let stale = slow.await.unwrap().unwrap();
    assert_eq!(stale, LookupOutcome::Superseded { date: d1 });

    let state = flow.slots_state();
    assert_eq!(state.date(), Some(d2));
    assert_eq!(state.slots(), &fx.slots[1..]);
    assert_eq!(flow.selected_slot(), Some(fx.slots[1].id));
    assert_eq!(flow.draft().booking_date, Some(d2));

    assert_eq!(Counters::get(&flow.counters().lookups_superseded), 1);
    assert!(logs_contain("discarding stale slot lookup"));
}

#[tokio::test]
async fn dropped_lookup_does_not_leave_form_loading() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;
    let d1 = in_days(2);
    let d2 = in_days(3);

    flow.select_date(d1).await?;
    assert!(flow.can_submit());

    let gate = fx.repo.gate(d2).await;
    let timed_out = tokio::time::timeout(Duration::from_millis(50), flow.select_date(d2)).await;
    assert!(timed_out.is_err());

    let state = flow.slots_state();
    assert!(!state.is_loading());
    assert!(matches!(state, SlotsState::Failed { date, .. } if date == d2));
    assert_eq!(flow.selected_slot(), None);
    assert!(!flow.can_submit());
    assert_eq!(Counters::get(&flow.counters().lookups_cancelled), 1);

    // The date can be selected again once the store answers.
    gate.notify_one();
    flow.select_date(d2).await?;
    assert_eq!(flow.selected_slot(), Some(fx.slots[0].id));
    assert!(flow.can_submit());

    Ok(())
}

#[tokio::test]
async fn dropping_a_superseded_lookup_keeps_newer_result() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let d1 = in_days(12);
    let d2 = in_days(13);
    fx.repo.gate(d1).await;

    let flow = Arc::new(open(&fx).await);
    let slow = {
        let flow = flow.clone();
        tokio::spawn(async move { flow.select_date(d1).await })
    };
    fx.repo.gate_entered.notified().await;

    flow.select_date(d2).await?;
    slow.abort();
    assert!(slow.await.unwrap_err().is_cancelled());

    assert_eq!(
        flow.slots_state(),
        SlotsState::Ready {
            date: d2,
            slots: fx.slots.clone()
        }
    );
    assert!(flow.can_submit());
    assert_eq!(Counters::get(&flow.counters().lookups_cancelled), 0);

    Ok(())
}

#[tokio::test]
async fn ticket_issued_later_wins_even_if_applied_first() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;

    let first = flow.begin_lookup(in_days(20));
    let second = flow.begin_lookup(in_days(21));

    let applied = flow.apply_lookup(second, Ok(vec![]));
    assert!(!applied.is_superseded());

    let dropped = flow.apply_lookup(first, Ok(vec![]));
    assert!(dropped.is_superseded());
    assert_eq!(flow.slots_state().date(), Some(in_days(21)));

    Ok(())
}

#[tokio::test]
async fn submit_is_blocked_while_loading() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;
    fill_contact(&flow);

    flow.select_date(in_days(2)).await?;
    let _pending = flow.begin_lookup(in_days(3));
    assert!(!flow.can_submit());

    let err = flow.submit(&ScriptedCheckout::completing("pay_1")).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidDraft(_)));

    Ok(())
}

#[tokio::test]
async fn add_ons_toggle_and_flow_into_summary() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;

    assert!(flow.toggle_add_on(fx.cake.id)?);
    assert!(flow.toggle_add_on(fx.balloons.id)?);
    assert!(!flow.toggle_add_on(fx.balloons.id)?);
    flow.set_decoration(true);

    let s = flow.summary()?;
    assert_eq!(s.base_price, 1_999);
    assert_eq!(s.decoration_charge, 499);
    assert_eq!(s.add_ons_total, 600);
    assert_eq!(s.total, 1_999 + 499 + 600);
    assert_eq!(s.advance, 700);
    assert_eq!(s.balance_status(), BalanceStatus::Due(s.total - 700));

    let unknown = flow.toggle_add_on(Uuid::new_v4()).unwrap_err();
    assert!(matches!(unknown, BookingError::InvalidDraft(_)));

    Ok(())
}

#[tokio::test]
async fn completed_checkout_confirms_and_blocks_the_slot() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;
    let date = in_days(4);

    flow.select_date(date).await?;
    fill_contact(&flow);
    flow.toggle_add_on(fx.cake.id)?;

    let checkout = ScriptedCheckout::completing("pay_ABC123");
    let outcome = flow.submit(&checkout).await?;

    let SubmitOutcome::Confirmed {
        booking_id,
        payment_ref,
    } = outcome
    else {
        panic!("expected confirmation");
    };
    assert_eq!(payment_ref, "pay_ABC123");

    let stored = fx.repo.bookings.lock().await.get(&booking_id).cloned().unwrap();
    assert!(stored.booking.advance_paid);
    assert_eq!(stored.payment_ref.as_deref(), Some("pay_ABC123"));
    assert_eq!(stored.booking.slot_id, fx.slots[0].id);
    assert_eq!(stored.booking.add_on_ids, vec![fx.cake.id]);

    let requests = checkout.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount_minor, 70_000);
    assert_eq!(requests[0].currency, "INR");
    assert_eq!(requests[0].description, "Booking for Private Theatre");
    assert_eq!(requests[0].order_reference, booking_id);
    assert_eq!(requests[0].prefill.contact, "+91 99999 00000");
    drop(requests);

    // Re-resolving the same date no longer offers the paid slot.
    flow.select_date(date).await?;
    assert!(flow.slots_state().slots().iter().all(|s| s.id != fx.slots[0].id));
    assert!(flow.can_submit());

    Ok(())
}

#[tokio::test]
async fn dismissed_checkout_leaves_booking_pending_and_slot_open() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;
    let date = in_days(6);

    flow.select_date(date).await?;
    fill_contact(&flow);

    let outcome = flow.submit(&ScriptedCheckout::dismissing()).await?;
    let SubmitOutcome::PendingPayment { booking_id } = outcome else {
        panic!("expected pending payment");
    };

    let stored = fx.repo.bookings.lock().await.get(&booking_id).cloned().unwrap();
    assert!(!stored.booking.advance_paid);

    flow.select_date(date).await?;
    assert_eq!(flow.slots_state().slots(), fx.slots.as_slice());
    assert_eq!(Counters::get(&flow.counters().payments_pending), 1);

    Ok(())
}

#[tokio::test]
async fn insert_failure_keeps_form_editable() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;

    flow.select_date(in_days(3)).await?;
    fill_contact(&flow);
    fx.repo.fail_insert.store(true, Ordering::SeqCst);

    let err = flow.submit(&ScriptedCheckout::completing("pay_1")).await.unwrap_err();
    assert!(matches!(err, BookingError::SubmissionFailure(_)));
    assert_eq!(
        err.user_message(),
        "Booking could not be completed. Please try again."
    );

    assert!(flow.can_submit());
    assert_eq!(flow.draft().booking_name, "Ravi's anniversary");
    assert!(fx.repo.bookings.lock().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn checkout_failure_is_a_submission_failure() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;

    flow.select_date(in_days(3)).await?;
    fill_contact(&flow);

    let err = flow.submit(&ScriptedCheckout::failing()).await.unwrap_err();
    assert!(matches!(err, BookingError::SubmissionFailure(_)));
    assert!(flow.can_submit());
    assert_eq!(Counters::get(&flow.counters().submission_failures), 1);

    Ok(())
}

#[tokio::test]
async fn payment_update_failure_does_not_confirm() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;

    flow.select_date(in_days(3)).await?;
    fill_contact(&flow);
    fx.repo.fail_mark_paid.store(true, Ordering::SeqCst);

    let err = flow
        .submit(&ScriptedCheckout::completing("pay_9"))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SubmissionFailure(_)));

    let bookings = fx.repo.bookings.lock().await;
    assert_eq!(bookings.len(), 1);
    assert!(bookings.values().all(|b| !b.booking.advance_paid));

    Ok(())
}

#[tokio::test]
async fn invalid_contact_details_never_reach_the_store() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let flow = open(&fx).await;

    flow.select_date(in_days(3)).await?;
    fill_contact(&flow);
    flow.set_email("ravi-at-example");

    let err = flow.submit(&ScriptedCheckout::completing("pay_1")).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidDraft(_)));
    assert!(fx.repo.bookings.lock().await.is_empty());

    flow.set_email("ravi@example.com");
    flow.set_persons(12);
    let err = flow.submit(&ScriptedCheckout::completing("pay_1")).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidDraft(ref m) if m.contains("at most 6")));

    Ok(())
}

#[tokio::test]
async fn selecting_a_slot_not_on_offer_is_rejected() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let date = in_days(9);
    fx.repo.insert_paid(fx.venue.id, fx.slots[1].id, date).await;

    let flow = open(&fx).await;
    flow.select_date(date).await?;

    let err = flow.select_slot(fx.slots[1].id).unwrap_err();
    assert!(matches!(err, BookingError::InvalidDraft(_)));
    assert_eq!(flow.selected_slot(), Some(fx.slots[0].id));

    Ok(())
}
