//! Slot availability for one venue on one date.
//!
//! A slot is blocked only by a booking for the same slot whose advance has
//! been paid. Unpaid or abandoned bookings never block. Filtering works on
//! slot ids; the 12-hour labels in `clock` are display only.

pub mod clock;

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::BookingError;
use crate::model::{Booking, Slot, SlotId};

use self::clock::format_clock;

pub const NO_SLOTS_HINT: &str = "No slots available for this date. Please select another date.";

/// Bookable slots, in the order of `venue_slots` (start time ascending).
///
/// `bookings_for_date` must already be narrowed to the venue and date by the
/// caller.
pub fn resolve(venue_slots: &[Slot], bookings_for_date: &[Booking]) -> Vec<Slot> {
    let taken: HashSet<SlotId> = bookings_for_date
        .iter()
        .filter(|b| b.advance_paid)
        .map(|b| b.slot_id)
        .collect();

    venue_slots
        .iter()
        .filter(|s| !taken.contains(&s.id))
        .cloned()
        .collect()
}

/// Selection after a fresh resolve: keep `current` if it is still offered,
/// otherwise fall back to the earliest slot, or nothing when none remain.
pub fn default_selection(resolved: &[Slot], current: Option<SlotId>) -> Option<SlotId> {
    match current {
        Some(id) if resolved.iter().any(|s| s.id == id) => Some(id),
        _ => resolved.first().map(|s| s.id),
    }
}

/// One row of the slot picker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub slot_id: SlotId,
    pub start_label: String,
    pub end_label: String,
}

impl SlotView {
    pub fn label(&self) -> String {
        format!("{} - {}", self.start_label, self.end_label)
    }
}

pub fn present(slots: &[Slot]) -> Result<Vec<SlotView>, BookingError> {
    slots
        .iter()
        .map(|s| {
            Ok(SlotView {
                slot_id: s.id,
                start_label: format_clock(&s.start_time)?,
                end_label: format_clock(&s.end_time)?,
            })
        })
        .collect()
}

/// What the slot picker should show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotsState {
    NoDateChosen,
    Loading { date: NaiveDate },
    Ready { date: NaiveDate, slots: Vec<Slot> },
    /// A valid outcome, not an error: the date is fully booked.
    NoSlotsAvailable { date: NaiveDate },
    Failed { date: NaiveDate, message: String },
}

impl SlotsState {
    pub fn from_resolved(date: NaiveDate, slots: Vec<Slot>) -> Self {
        if slots.is_empty() {
            SlotsState::NoSlotsAvailable { date }
        } else {
            SlotsState::Ready { date, slots }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SlotsState::Loading { .. })
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            SlotsState::NoDateChosen => None,
            SlotsState::Loading { date }
            | SlotsState::Ready { date, .. }
            | SlotsState::NoSlotsAvailable { date }
            | SlotsState::Failed { date, .. } => Some(*date),
        }
    }

    pub fn slots(&self) -> &[Slot] {
        match self {
            SlotsState::Ready { slots, .. } => slots,
            _ => &[],
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            SlotsState::NoSlotsAvailable { .. } => Some(NO_SLOTS_HINT),
            SlotsState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}
