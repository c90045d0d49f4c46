use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{AnyPool, Row};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::availability::clock::normalize_clock;
use crate::model::{AddOn, Booking, BookingId, NewBooking, Slot, Venue, VenueId};
use crate::repository::BookingRepository;
use crate::time::now_ms;

const DATE_FMT: &str = "%Y-%m-%d";

/// SQLx-backed implementation of BookingRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxBookingRepository {
    pool: AnyPool,
}

impl SqlxBookingRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for SqlxBookingRepository {
    #[instrument(skip(self), target = "repository", fields(venue_id = %venue_id))]
    async fn fetch_venue(&self, venue_id: &VenueId) -> anyhow::Result<Option<Venue>> {
        let row = sqlx::query(
            r#"
SELECT id, name, price, decoration_fee, base_members
FROM venues
WHERE id = ?;
"#,
        )
        .bind(venue_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(row_to_venue(&r)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), target = "repository", fields(venue_id = %venue_id))]
    async fn fetch_slots(&self, venue_id: &VenueId) -> anyhow::Result<Vec<Slot>> {
        let rows = sqlx::query(
            r#"
SELECT id, start_time, end_time
FROM slots
WHERE venue_id = ?
ORDER BY start_time;
"#,
        )
        .bind(venue_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            match row_to_slot(&r) {
                Ok(s) => out.push(s),
                Err(e) => {
                    // poison-row resilience: one bad slot must not hide the rest
                    warn!(error = %e, "skipping malformed slot row");
                }
            }
        }

        Ok(out)
    }

    #[instrument(skip(self), target = "repository", fields(venue_id = %venue_id, %date))]
    async fn fetch_paid_bookings(
        &self,
        venue_id: &VenueId,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<Booking>> {
        let rows = sqlx::query(
            r#"
SELECT id, venue_id, slot_id, booking_date
FROM bookings
WHERE venue_id = ? AND booking_date = ? AND advance_paid = 1;
"#,
        )
        .bind(venue_id.to_string())
        .bind(date.format(DATE_FMT).to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(row_to_paid_booking)
            .collect::<anyhow::Result<Vec<_>>>()
    }

    #[instrument(skip(self), target = "repository")]
    async fn fetch_add_ons(&self) -> anyhow::Result<Vec<AddOn>> {
        let rows = sqlx::query(
            r#"
SELECT id, name, price
FROM add_ons
ORDER BY name;
"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            match row_to_add_on(&r) {
                Ok(a) => out.push(a),
                Err(e) => warn!(error = %e, "skipping malformed add-on row"),
            }
        }

        Ok(out)
    }

    #[instrument(
        skip(self, booking),
        target = "repository",
        fields(venue_id = %booking.venue_id, slot_id = %booking.slot_id)
    )]
    async fn insert_booking(&self, booking: &NewBooking) -> anyhow::Result<BookingId> {
        let id = Uuid::new_v4();
        let add_on_ids = serde_json::to_string(&booking.add_on_ids)?;

        sqlx::query(
            r#"
INSERT INTO bookings (
  id, venue_id, slot_id, booking_date,
  booking_name, persons, whatsapp, email,
  decoration, add_on_ids, advance_paid, payment_id, created_ms
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?);
"#,
        )
        .bind(id.to_string())
        .bind(booking.venue_id.to_string())
        .bind(booking.slot_id.to_string())
        .bind(booking.booking_date.format(DATE_FMT).to_string())
        .bind(booking.booking_name.clone())
        .bind(i64::from(booking.persons))
        .bind(booking.whatsapp.clone())
        .bind(booking.email.clone())
        .bind(bool_to_i64(booking.decoration))
        .bind(add_on_ids)
        .bind(bool_to_i64(booking.advance_paid))
        .bind(u64_to_i64(now_ms())?)
        .execute(&self.pool)
        .await
        .context("insert booking")?;

        Ok(id)
    }

    #[instrument(skip(self, payment_ref), target = "repository", fields(booking_id = %booking_id))]
    async fn mark_advance_paid(
        &self,
        booking_id: &BookingId,
        payment_ref: &str,
    ) -> anyhow::Result<()> {
        let res = sqlx::query(
            r#"
UPDATE bookings
SET advance_paid = 1, payment_id = ?
WHERE id = ?;
"#,
        )
        .bind(payment_ref.to_string())
        .bind(booking_id.to_string())
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Err(anyhow!("booking not found: {booking_id}"));
        }

        Ok(())
    }

    async fn insert_venue(&self, venue: &Venue) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO venues (id, name, price, decoration_fee, base_members)
VALUES (?, ?, ?, ?, ?);
"#,
        )
        .bind(venue.id.to_string())
        .bind(venue.name.clone())
        .bind(venue.price)
        .bind(venue.decoration_fee)
        .bind(i64::from(venue.base_members))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_slot(&self, venue_id: &VenueId, slot: &Slot) -> anyhow::Result<()> {
        // stored padded so ORDER BY start_time is clock order
        let start_time = normalize_clock(&slot.start_time)?;
        let end_time = normalize_clock(&slot.end_time)?;

        sqlx::query(
            r#"
INSERT INTO slots (id, venue_id, start_time, end_time)
VALUES (?, ?, ?, ?);
"#,
        )
        .bind(slot.id.to_string())
        .bind(venue_id.to_string())
        .bind(start_time)
        .bind(end_time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_add_on(&self, add_on: &AddOn) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO add_ons (id, name, price)
VALUES (?, ?, ?);
"#,
        )
        .bind(add_on.id.to_string())
        .bind(add_on.name.clone())
        .bind(add_on.price)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/* =========================
Row mapping + conversions
========================= */

fn row_to_venue(r: &sqlx::any::AnyRow) -> anyhow::Result<Venue> {
    Ok(Venue {
        id: parse_uuid(r, "id")?,
        name: r.try_get::<String, _>("name")?,
        price: r.try_get::<i64, _>("price")?,
        decoration_fee: r.try_get::<i64, _>("decoration_fee")?,
        base_members: i64_to_u32(r.try_get("base_members")?)?,
    })
}

fn row_to_slot(r: &sqlx::any::AnyRow) -> anyhow::Result<Slot> {
    Ok(Slot {
        id: parse_uuid(r, "id")?,
        start_time: r.try_get::<String, _>("start_time")?,
        end_time: r.try_get::<String, _>("end_time")?,
    })
}

fn row_to_paid_booking(r: &sqlx::any::AnyRow) -> anyhow::Result<Booking> {
    let date_str: String = r.try_get("booking_date")?;
    let booking_date = NaiveDate::parse_from_str(&date_str, DATE_FMT)
        .with_context(|| format!("invalid booking_date {date_str}"))?;

    Ok(Booking {
        id: parse_uuid(r, "id")?,
        venue_id: parse_uuid(r, "venue_id")?,
        slot_id: parse_uuid(r, "slot_id")?,
        booking_date,
        advance_paid: true,
    })
}

fn row_to_add_on(r: &sqlx::any::AnyRow) -> anyhow::Result<AddOn> {
    Ok(AddOn {
        id: parse_uuid(r, "id")?,
        name: r.try_get::<String, _>("name")?,
        price: r.try_get::<i64, _>("price")?,
    })
}

fn parse_uuid(r: &sqlx::any::AnyRow, column: &str) -> anyhow::Result<Uuid> {
    let raw: String = r.try_get(column)?;
    Uuid::parse_str(&raw).with_context(|| format!("invalid {column}"))
}

/* =========================
Numeric safety helpers
========================= */

fn i64_to_u32(v: i64) -> anyhow::Result<u32> {
    if v < 0 || v > u32::MAX as i64 {
        return Err(anyhow!("out of range for u32: {v}"));
    }
    Ok(v as u32)
}

fn u64_to_i64(v: u64) -> anyhow::Result<i64> {
    if v > i64::MAX as u64 {
        return Err(anyhow!("u64 too large for i64: {v}"));
    }
    Ok(v as i64)
}

fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}
