//! Price summary derivation.
//!
//! `total = base + decoration charge + add-ons`, `advance` is a fixed amount
//! supplied by configuration and `balance = total - advance`. The balance is
//! returned as-is, even when negative; `balance_status` lets the presentation
//! layer label that case instead of clamping it.

pub mod addons;

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::BookingError;
use crate::model::{AddOn, Venue};

use self::addons::AddOnSelection;

/// Deployment-wide advance settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvancePolicy {
    /// Collected at booking time, whole currency units.
    pub advance_amount: i64,
    /// Part of `advance_amount`, shown to the user as a convenience fee.
    pub convenience_fee: i64,
}

impl Default for AdvancePolicy {
    fn default() -> Self {
        Self {
            advance_amount: 700,
            convenience_fee: 50,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceSummary {
    pub base_price: i64,
    pub decoration_charge: i64,
    pub add_ons_total: i64,
    pub total: i64,
    pub advance: i64,
    pub balance: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceStatus {
    /// Remaining amount to be paid at the venue.
    Due(i64),
    Settled,
    /// The advance is larger than the total by this amount.
    AdvanceExceedsTotal(i64),
}

impl PriceSummary {
    pub fn balance_status(&self) -> BalanceStatus {
        match self.balance {
            b if b > 0 => BalanceStatus::Due(b),
            0 => BalanceStatus::Settled,
            b => BalanceStatus::AdvanceExceedsTotal(-b),
        }
    }

    /// Advance in minor units (paise, cents) for the checkout widget.
    pub fn advance_minor_units(&self) -> Result<i64, BookingError> {
        self.advance
            .checked_mul(100)
            .ok_or_else(|| BookingError::InvalidPriceInput("advance overflows minor units".into()))
    }
}

/// Derive the summary. Add-ons are deduplicated by id before summing.
pub fn compute(
    base_price: i64,
    decoration_selected: bool,
    decoration_fee: i64,
    selected_add_ons: &[AddOn],
    advance_amount: i64,
) -> Result<PriceSummary, BookingError> {
    if base_price < 0 {
        warn!(base_price, "negative base price");
        return Err(BookingError::InvalidPriceInput(format!(
            "base price {base_price} is negative"
        )));
    }
    if decoration_fee < 0 {
        warn!(decoration_fee, "negative decoration fee");
        return Err(BookingError::InvalidPriceInput(format!(
            "decoration fee {decoration_fee} is negative"
        )));
    }
    if advance_amount < 0 {
        return Err(BookingError::InvalidPriceInput(format!(
            "advance amount {advance_amount} is negative"
        )));
    }

    let decoration_charge = if decoration_selected { decoration_fee } else { 0 };

    let mut seen = HashSet::with_capacity(selected_add_ons.len());
    let mut add_ons_total: i64 = 0;
    for a in selected_add_ons {
        if !seen.insert(a.id) {
            continue;
        }
        if a.price < 0 {
            warn!(add_on_id = %a.id, price = a.price, "negative add-on price");
            return Err(BookingError::InvalidPriceInput(format!(
                "add-on {} has negative price {}",
                a.name, a.price
            )));
        }
        add_ons_total = add_ons_total.checked_add(a.price).ok_or_else(overflow)?;
    }

    let total = base_price
        .checked_add(decoration_charge)
        .and_then(|t| t.checked_add(add_ons_total))
        .ok_or_else(overflow)?;

    let balance = total - advance_amount;

    debug!(total, advance = advance_amount, balance, "price summary computed");

    Ok(PriceSummary {
        base_price,
        decoration_charge,
        add_ons_total,
        total,
        advance: advance_amount,
        balance,
    })
}

/// Summary for a venue with the current decoration flag and add-on selection.
pub fn quote(
    venue: &Venue,
    decoration_selected: bool,
    selection: &AddOnSelection,
    catalog: &[AddOn],
    policy: &AdvancePolicy,
) -> Result<PriceSummary, BookingError> {
    let picked = selection.resolve(catalog);
    compute(
        venue.price,
        decoration_selected,
        venue.decoration_fee,
        &picked,
        policy.advance_amount,
    )
}

fn overflow() -> BookingError {
    BookingError::InvalidPriceInput("price total overflows".into())
}
