pub mod repository_rest;
pub mod repository_sqlx;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::{AddOn, Booking, BookingId, NewBooking, Slot, Venue, VenueId};

/// Remote store holding venues, slots, bookings and add-ons.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn fetch_venue(&self, venue_id: &VenueId) -> Result<Option<Venue>>;

    /// Slots of a venue ordered by start time.
    async fn fetch_slots(&self, venue_id: &VenueId) -> Result<Vec<Slot>>;

    /// Bookings for the venue and date whose advance has been paid.
    async fn fetch_paid_bookings(&self, venue_id: &VenueId, date: NaiveDate)
    -> Result<Vec<Booking>>;

    async fn fetch_add_ons(&self) -> Result<Vec<AddOn>>;

    async fn insert_booking(&self, booking: &NewBooking) -> Result<BookingId>;

    async fn mark_advance_paid(&self, booking_id: &BookingId, payment_ref: &str) -> Result<()>;

    async fn insert_venue(&self, venue: &Venue) -> Result<()>;

    async fn insert_slot(&self, venue_id: &VenueId, slot: &Slot) -> Result<()>;

    async fn insert_add_on(&self, add_on: &AddOn) -> Result<()>;
}

