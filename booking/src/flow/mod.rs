//! Booking session orchestration.
//!
//! One `BookingFlow` drives one customer through the form:
//!
//! - venue, slot catalog and add-on catalog are loaded once on `open`
//! - every date change issues a `LookupTicket` and fetches paid bookings for
//!   that date; the result is applied only if the ticket is still the latest
//! - price summary is derived on demand from the draft
//! - `submit` inserts an unpaid booking, opens checkout and marks the booking
//!   paid only when checkout completes
//!
//! Remote failures are converted to `BookingError` here and logged; they are
//! never left to unwind through the caller.

pub mod lookup;
pub mod submit;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::availability::{self, SlotView, SlotsState};
use crate::config::AppConfig;
use crate::error::BookingError;
use crate::logger::warn_if_slow;
use crate::metrics::counters::Counters;
use crate::model::{AddOn, AddOnId, Booking, BookingDraft, Slot, SlotId, Venue, VenueId};
use crate::pricing::{self, PriceSummary};
use crate::repository::BookingRepository;
use crate::time::today;

use self::lookup::{Generations, LookupOutcome, LookupTicket, PendingLookup};

pub use self::submit::SubmitOutcome;

/// Mutable form state. Written only under the flow's lock and never held
/// across an await.
#[derive(Debug)]
struct FormState {
    generations: Generations,
    slots: SlotsState,
    draft: BookingDraft,
    submitting: bool,
}

pub struct BookingFlow<R: BookingRepository> {
    repo: Arc<R>,
    venue: Venue,
    slot_catalog: Vec<Slot>,
    add_on_catalog: Vec<AddOn>,
    config: AppConfig,
    counters: Counters,
    state: Mutex<FormState>,
}

impl<R: BookingRepository> BookingFlow<R> {
    /// Load the venue with its slot and add-on catalogs.
    #[instrument(skip(repo, config), target = "flow", fields(venue_id = %venue_id))]
    pub async fn open(
        repo: Arc<R>,
        venue_id: VenueId,
        config: AppConfig,
    ) -> Result<Self, BookingError> {
        let slow = Duration::from_millis(config.slow_call_warn_ms);

        let loaded = warn_if_slow("open_venue", slow, async {
            futures::try_join!(
                repo.fetch_venue(&venue_id),
                repo.fetch_slots(&venue_id),
                repo.fetch_add_ons(),
            )
        })
        .await;

        let (venue, slot_catalog, add_on_catalog) = match loaded {
            Ok(v) => v,
            Err(e) => {
                error!(error = ?e, "failed to load venue details");
                return Err(BookingError::fetch(e));
            }
        };

        let Some(venue) = venue else {
            warn!("venue lookup returned no results");
            return Err(BookingError::VenueNotFound(venue_id));
        };

        info!(
            venue = %venue.name,
            slots = slot_catalog.len(),
            add_ons = add_on_catalog.len(),
            "booking flow opened"
        );

        Ok(Self {
            repo,
            venue,
            slot_catalog,
            add_on_catalog,
            config,
            counters: Counters::default(),
            state: Mutex::new(FormState {
                generations: Generations::default(),
                slots: SlotsState::NoDateChosen,
                draft: BookingDraft::default(),
                submitting: false,
            }),
        })
    }

    pub fn venue(&self) -> &Venue {
        &self.venue
    }

    pub fn slot_catalog(&self) -> &[Slot] {
        &self.slot_catalog
    }

    pub fn add_on_catalog(&self) -> &[AddOn] {
        &self.add_on_catalog
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn slots_state(&self) -> SlotsState {
        self.state.lock().slots.clone()
    }

    pub fn slot_views(&self) -> Result<Vec<SlotView>, BookingError> {
        let state = self.state.lock();
        availability::present(state.slots.slots())
    }

    pub fn draft(&self) -> BookingDraft {
        self.state.lock().draft.clone()
    }

    pub fn selected_slot(&self) -> Option<SlotId> {
        self.state.lock().draft.slot_id
    }

    /// Select a date and load its availability.
    ///
    /// Fetch failures are reported through `SlotsState::Failed`, not as an
    /// error. A past date is rejected before any lookup starts. Dropping the
    /// returned future mid-fetch also ends in `Failed` for that date.
    #[instrument(skip(self), target = "flow", fields(venue_id = %self.venue.id))]
    pub async fn select_date(&self, date: NaiveDate) -> Result<LookupOutcome, BookingError> {
        if date < today() {
            return Err(BookingError::InvalidDraft(
                "booking_date: date is in the past".into(),
            ));
        }

        let ticket = self.begin_lookup(date);
        let pending = PendingLookup::new(&self.state, &self.counters, ticket);

        let fetched = warn_if_slow(
            "fetch_paid_bookings",
            Duration::from_millis(self.config.slow_call_warn_ms),
            self.repo.fetch_paid_bookings(&self.venue.id, date),
        )
        .await;

        pending.settle();
        Ok(self.apply_lookup(ticket, fetched))
    }

    /// Mark `date` as the current selection and return its ticket. Any
    /// lookup still in flight for an earlier ticket becomes stale.
    pub fn begin_lookup(&self, date: NaiveDate) -> LookupTicket {
        let mut state = self.state.lock();
        let ticket = state.generations.issue(date);
        state.slots = SlotsState::Loading { date };
        state.draft.booking_date = Some(date);

        Counters::incr(&self.counters.lookups_started);
        debug!(generation = ticket.generation, %date, "slot lookup started");

        ticket
    }

    /// Resolve a fetched booking list into the visible slot state, unless a
    /// newer ticket has been issued since.
    pub fn apply_lookup(
        &self,
        ticket: LookupTicket,
        fetched: anyhow::Result<Vec<Booking>>,
    ) -> LookupOutcome {
        let next = match fetched {
            Ok(bookings) => {
                let relevant: Vec<Booking> = bookings
                    .into_iter()
                    .filter(|b| b.venue_id == self.venue.id && b.booking_date == ticket.date)
                    .collect();
                let slots = availability::resolve(&self.slot_catalog, &relevant);
                SlotsState::from_resolved(ticket.date, slots)
            }
            Err(e) => {
                Counters::incr(&self.counters.fetch_failures);
                error!(error = ?e, date = %ticket.date, "error fetching slots");
                SlotsState::Failed {
                    date: ticket.date,
                    message: BookingError::fetch(e).user_message(),
                }
            }
        };

        let mut state = self.state.lock();

        if !state.generations.is_current(&ticket) {
            Counters::incr(&self.counters.lookups_superseded);
            debug!(
                generation = ticket.generation,
                date = %ticket.date,
                "discarding stale slot lookup"
            );
            return LookupOutcome::Superseded { date: ticket.date };
        }

        let selected = availability::default_selection(next.slots(), state.draft.slot_id);
        if selected != state.draft.slot_id {
            debug!(?selected, "slot selection reset");
        }
        state.draft.slot_id = selected;
        state.slots = next.clone();

        Counters::incr(&self.counters.lookups_applied);
        LookupOutcome::Applied(next)
    }

    pub fn select_slot(&self, slot_id: SlotId) -> Result<(), BookingError> {
        let mut state = self.state.lock();
        if !state.slots.slots().iter().any(|s| s.id == slot_id) {
            return Err(BookingError::InvalidDraft(
                "slot: not available for the chosen date".into(),
            ));
        }
        state.draft.slot_id = Some(slot_id);
        Ok(())
    }

    pub fn set_booking_name(&self, name: impl Into<String>) {
        self.state.lock().draft.booking_name = name.into();
    }

    pub fn set_persons(&self, persons: u32) {
        self.state.lock().draft.persons = persons;
    }

    pub fn set_whatsapp(&self, number: impl Into<String>) {
        self.state.lock().draft.whatsapp = number.into();
    }

    pub fn set_email(&self, email: impl Into<String>) {
        self.state.lock().draft.email = email.into();
    }

    pub fn set_decoration(&self, decoration: bool) {
        self.state.lock().draft.decoration = decoration;
    }

    /// Flip an add-on in the selection. Returns whether it is now selected.
    pub fn toggle_add_on(&self, id: AddOnId) -> Result<bool, BookingError> {
        if !self.add_on_catalog.iter().any(|a| a.id == id) {
            return Err(BookingError::InvalidDraft(format!("add-on {id} is not offered")));
        }
        Ok(self.state.lock().draft.add_ons.toggle(id))
    }

    /// Summary for the current draft. Always includes selected add-ons.
    pub fn summary(&self) -> Result<PriceSummary, BookingError> {
        let draft = self.draft();
        self.summary_for(&draft)
    }

    fn summary_for(&self, draft: &BookingDraft) -> Result<PriceSummary, BookingError> {
        pricing::quote(
            &self.venue,
            draft.decoration,
            &draft.add_ons,
            &self.add_on_catalog,
            &self.config.advance_policy(),
        )
    }

    /// Submit is allowed once a slot is chosen, lookups have settled and no
    /// other submission is running.
    pub fn can_submit(&self) -> bool {
        let state = self.state.lock();
        !state.submitting && !state.slots.is_loading() && state.draft.slot_id.is_some()
    }
}

