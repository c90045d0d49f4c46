//! Checkout widget contract.
//!
//! The widget is opened with the advance in minor units and an order
//! reference. It reports a payment reference on success. A user who closes
//! the widget produces `Dismissed`, which leaves the booking pending.

use async_trait::async_trait;
use serde::Serialize;

use crate::model::BookingId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    pub key_id: Option<String>,
    /// Advance in minor units.
    pub amount_minor: i64,
    pub currency: String,
    pub merchant_name: String,
    pub description: String,
    pub order_reference: BookingId,
    pub prefill: Prefill,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Completed { payment_ref: String },
    Dismissed,
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Errors are transport failures; a closed widget is `Ok(Dismissed)`.
    async fn open(&self, request: CheckoutRequest) -> anyhow::Result<CheckoutOutcome>;
}
