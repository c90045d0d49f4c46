//! BookingRepository over a hosted PostgREST-style backend.
//!
//! Tables are exposed under `{base}/rest/v1/<table>` and filtered with
//! `column=eq.value` query pairs. Every request carries the project key both
//! as `apikey` and as a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::availability::clock::normalize_clock;
use crate::model::{AddOn, Booking, BookingId, NewBooking, Slot, Venue, VenueId};
use crate::repository::BookingRepository;

#[derive(Error, Debug)]
pub enum RestError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from store: {0}")]
    InvalidResponse(&'static str),

    #[error("record not found: {0}")]
    NotFound(String),
}

#[derive(Clone)]
pub struct RestBookingRepository {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct VenueRow {
    id: Uuid,
    name: String,
    price: i64,
    #[serde(default)]
    decoration_fee: Option<i64>,
    base_members: u32,
}

#[derive(Debug, Deserialize)]
struct SlotRow {
    id: Uuid,
    start_time: String,
    end_time: String,
}

#[derive(Debug, Deserialize)]
struct BookingRow {
    id: Uuid,
    venue_id: Uuid,
    slot_id: Uuid,
    booking_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: Uuid,
}

#[derive(Debug, Serialize)]
struct SlotInsert<'a> {
    id: Uuid,
    venue_id: Uuid,
    start_time: &'a str,
    end_time: &'a str,
}

impl RestBookingRepository {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, RestError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn select<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, RestError> {
        let resp = self
            .authed(self.http.get(self.table_url(table)))
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json().await?)
    }

    async fn insert<B: Serialize + ?Sized>(&self, table: &str, body: &B) -> Result<Vec<IdRow>, RestError> {
        let resp = self
            .authed(self.http.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json().await?)
    }
}

fn first_id(rows: Vec<IdRow>) -> Result<Uuid, RestError> {
    rows.into_iter()
        .next()
        .map(|r| r.id)
        .ok_or(RestError::InvalidResponse("insert returned no rows"))
}

fn eq(v: impl std::fmt::Display) -> String {
    format!("eq.{v}")
}

#[async_trait]
impl BookingRepository for RestBookingRepository {
    #[instrument(skip(self), target = "repository", level = "debug")]
    async fn fetch_venue(&self, venue_id: &VenueId) -> anyhow::Result<Option<Venue>> {
        let rows: Vec<VenueRow> = self
            .select(
                "venues",
                &[("select", "*".to_string()), ("id", eq(venue_id))],
            )
            .await?;

        Ok(rows.into_iter().next().map(|r| Venue {
            id: r.id,
            name: r.name,
            price: r.price,
            decoration_fee: r.decoration_fee.unwrap_or(0),
            base_members: r.base_members,
        }))
    }

    #[instrument(skip(self), target = "repository", level = "debug")]
    async fn fetch_slots(&self, venue_id: &VenueId) -> anyhow::Result<Vec<Slot>> {
        let rows: Vec<SlotRow> = self
            .select(
                "slots",
                &[
                    ("select", "id,start_time,end_time".to_string()),
                    ("venue_id", eq(venue_id)),
                    ("order", "start_time".to_string()),
                ],
            )
            .await?;

        debug!(count = rows.len(), "slots fetched");

        Ok(rows
            .into_iter()
            .map(|r| Slot {
                id: r.id,
                start_time: r.start_time,
                end_time: r.end_time,
            })
            .collect())
    }

    #[instrument(skip(self), target = "repository", level = "debug")]
    async fn fetch_paid_bookings(
        &self,
        venue_id: &VenueId,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<Booking>> {
        let rows: Vec<BookingRow> = self
            .select(
                "bookings",
                &[
                    ("select", "id,venue_id,slot_id,booking_date".to_string()),
                    ("venue_id", eq(venue_id)),
                    ("booking_date", eq(date.format("%Y-%m-%d"))),
                    ("advance_paid", eq(true)),
                ],
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| Booking {
                id: r.id,
                venue_id: r.venue_id,
                slot_id: r.slot_id,
                booking_date: r.booking_date,
                advance_paid: true,
            })
            .collect())
    }

    #[instrument(skip(self), target = "repository", level = "debug")]
    async fn fetch_add_ons(&self) -> anyhow::Result<Vec<AddOn>> {
        let rows: Vec<AddOn> = self
            .select(
                "add_ons",
                &[
                    ("select", "id,name,price".to_string()),
                    ("order", "name".to_string()),
                ],
            )
            .await?;

        Ok(rows)
    }

    #[instrument(skip(self, booking), target = "repository", level = "debug")]
    async fn insert_booking(&self, booking: &NewBooking) -> anyhow::Result<BookingId> {
        let rows = self.insert("bookings", booking).await?;
        Ok(first_id(rows)?)
    }

    #[instrument(skip(self, payment_ref), target = "repository", level = "debug")]
    async fn mark_advance_paid(
        &self,
        booking_id: &BookingId,
        payment_ref: &str,
    ) -> anyhow::Result<()> {
        let rows: Vec<IdRow> = self
            .authed(self.http.patch(self.table_url("bookings")))
            .query(&[("id", eq(booking_id))])
            .header("Prefer", "return=representation")
            .json(&json!({ "advance_paid": true, "payment_id": payment_ref }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if rows.is_empty() {
            return Err(RestError::NotFound(booking_id.to_string()).into());
        }

        Ok(())
    }

    async fn insert_venue(&self, venue: &Venue) -> anyhow::Result<()> {
        self.insert("venues", venue).await?;
        Ok(())
    }

    async fn insert_slot(&self, venue_id: &VenueId, slot: &Slot) -> anyhow::Result<()> {
        let start_time = normalize_clock(&slot.start_time)?;
        let end_time = normalize_clock(&slot.end_time)?;
        let body = SlotInsert {
            id: slot.id,
            venue_id: *venue_id,
            start_time: &start_time,
            end_time: &end_time,
        };
        self.insert("slots", &body).await?;
        Ok(())
    }

    async fn insert_add_on(&self, add_on: &AddOn) -> anyhow::Result<()> {
        self.insert("add_ons", add_on).await?;
        Ok(())
    }
}
