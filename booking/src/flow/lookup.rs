use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::warn;

use crate::availability::SlotsState;
use crate::error::BookingError;
use crate::metrics::counters::Counters;

use super::FormState;

/// Issued when a date is selected. Only the ticket with the latest
/// generation may write its result into the form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupTicket {
    pub generation: u64,
    pub date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The result became the visible slot state.
    Applied(SlotsState),
    /// A newer date was selected while this lookup was in flight; the
    /// result was dropped.
    Superseded { date: NaiveDate },
}

impl LookupOutcome {
    pub fn is_superseded(&self) -> bool {
        matches!(self, LookupOutcome::Superseded { .. })
    }
}

/// Monotonic generation counter. Not shared across flows.
#[derive(Debug, Default)]
pub(crate) struct Generations {
    current: u64,
}

impl Generations {
    pub(crate) fn issue(&mut self, date: NaiveDate) -> LookupTicket {
        self.current += 1;
        LookupTicket {
            generation: self.current,
            date,
        }
    }

    pub(crate) fn is_current(&self, ticket: &LookupTicket) -> bool {
        ticket.generation == self.current
    }
}

/// Held across the fetch of one lookup. If the lookup future is dropped
/// before `settle`, a still-current ticket moves the form out of `Loading`
/// into `Failed` and clears the slot selection. A superseded ticket is left
/// alone; its successor owns the form.
pub(super) struct PendingLookup<'a> {
    state: &'a Mutex<FormState>,
    counters: &'a Counters,
    ticket: LookupTicket,
    settled: bool,
}

impl<'a> PendingLookup<'a> {
    pub(super) fn new(state: &'a Mutex<FormState>, counters: &'a Counters, ticket: LookupTicket) -> Self {
        Self {
            state,
            counters,
            ticket,
            settled: false,
        }
    }

    /// The fetch finished; its result is about to be applied.
    pub(super) fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingLookup<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let mut state = self.state.lock();
        if !state.generations.is_current(&self.ticket) {
            return;
        }

        state.slots = SlotsState::Failed {
            date: self.ticket.date,
            message: BookingError::FetchFailure("lookup cancelled".into()).user_message(),
        };
        state.draft.slot_id = None;

        Counters::incr(&self.counters.lookups_cancelled);
        warn!(
            generation = self.ticket.generation,
            date = %self.ticket.date,
            "slot lookup dropped before completion"
        );
    }
}
