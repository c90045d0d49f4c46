use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::BookingError;
use crate::pricing::addons::AddOnSelection;

pub type VenueId = Uuid;
pub type SlotId = Uuid;
pub type BookingId = Uuid;
pub type AddOnId = Uuid;

/// A bookable venue. Prices are whole currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: VenueId,
    pub name: String,
    pub price: i64,
    pub decoration_fee: i64,
    /// Largest party the venue accepts; the form offers `1..=base_members`.
    pub base_members: u32,
}

/// Fixed interval offered by a venue. Times are the raw venue-local
/// `HH:MM[:SS]` strings as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub start_time: String,
    pub end_time: String,
}

/// Read side of a stored booking, as seen by availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub venue_id: VenueId,
    pub slot_id: SlotId,
    pub booking_date: NaiveDate,
    pub advance_paid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOn {
    pub id: AddOnId,
    pub name: String,
    pub price: i64,
}

/// Insert payload. Bookings always start unpaid; only the checkout
/// completion marks them paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBooking {
    pub venue_id: VenueId,
    pub slot_id: SlotId,
    pub booking_date: NaiveDate,
    pub booking_name: String,
    pub persons: u32,
    pub whatsapp: String,
    pub email: String,
    pub decoration: bool,
    pub add_on_ids: Vec<AddOnId>,
    pub advance_paid: bool,
}

/// Transient form state for one booking session.
#[derive(Debug, Clone, Validate)]
pub struct BookingDraft {
    #[validate(length(min = 1, max = 100, message = "booking name is required"))]
    pub booking_name: String,

    #[validate(range(min = 1, message = "at least one person is required"))]
    pub persons: u32,

    #[validate(length(min = 1, message = "whatsapp number is required"))]
    pub whatsapp: String,

    #[validate(email(message = "invalid email format"))]
    pub email: String,

    pub decoration: bool,
    pub slot_id: Option<SlotId>,
    pub booking_date: Option<NaiveDate>,
    pub add_ons: AddOnSelection,
}

impl Default for BookingDraft {
    fn default() -> Self {
        Self {
            booking_name: String::new(),
            persons: 1,
            whatsapp: String::new(),
            email: String::new(),
            decoration: false,
            slot_id: None,
            booking_date: None,
            add_ons: AddOnSelection::default(),
        }
    }
}

impl BookingDraft {
    /// Field validation plus the checks that need the venue.
    pub fn check(&self, venue: &Venue) -> Result<(), BookingError> {
        self.validate()
            .map_err(|e| BookingError::InvalidDraft(e.to_string()))?;

        if self.persons > venue.base_members {
            return Err(BookingError::InvalidDraft(format!(
                "persons: at most {} persons allowed",
                venue.base_members
            )));
        }
        if self.booking_date.is_none() {
            return Err(BookingError::InvalidDraft(
                "booking_date: a date is required".into(),
            ));
        }
        if self.slot_id.is_none() {
            return Err(BookingError::InvalidDraft("slot: a slot is required".into()));
        }

        Ok(())
    }

    /// Build the insert payload. Call `check` first.
    pub fn to_new_booking(&self, venue_id: VenueId) -> Result<NewBooking, BookingError> {
        let (Some(slot_id), Some(booking_date)) = (self.slot_id, self.booking_date) else {
            return Err(BookingError::InvalidDraft(
                "slot and date must be chosen".into(),
            ));
        };

        Ok(NewBooking {
            venue_id,
            slot_id,
            booking_date,
            booking_name: self.booking_name.trim().to_string(),
            persons: self.persons,
            whatsapp: self.whatsapp.trim().to_string(),
            email: self.email.trim().to_string(),
            decoration: self.decoration,
            add_on_ids: self.add_ons.ids(),
            advance_paid: false,
        })
    }
}
