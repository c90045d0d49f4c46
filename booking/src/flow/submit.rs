use parking_lot::Mutex;
use tracing::{error, info, instrument, warn};

use crate::error::BookingError;
use crate::metrics::counters::Counters;
use crate::model::BookingId;
use crate::payment::{CheckoutGateway, CheckoutOutcome, CheckoutRequest, Prefill};
use crate::repository::BookingRepository;

use super::{BookingFlow, FormState};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Checkout completed and the booking is marked paid.
    Confirmed {
        booking_id: BookingId,
        payment_ref: String,
    },
    /// The booking exists unpaid; checkout was closed without paying.
    /// It does not hold the slot.
    PendingPayment { booking_id: BookingId },
}

/// Clears the in-flight flag however submission ends.
struct SubmittingGuard<'a> {
    state: &'a Mutex<FormState>,
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().submitting = false;
    }
}

impl<R: BookingRepository> BookingFlow<R> {
    /// Insert the booking, run checkout and record the payment.
    ///
    /// The form stays editable on every error path.
    #[instrument(skip(self, gateway), target = "flow", fields(venue_id = %self.venue.id))]
    pub async fn submit<G: CheckoutGateway + ?Sized>(
        &self,
        gateway: &G,
    ) -> Result<SubmitOutcome, BookingError> {
        let (draft, _guard) = {
            let mut state = self.state.lock();
            if state.submitting {
                return Err(BookingError::SubmissionFailure(
                    "a submission is already in progress".into(),
                ));
            }
            if state.slots.is_loading() {
                return Err(BookingError::InvalidDraft(
                    "slot: availability is still loading".into(),
                ));
            }
            state.submitting = true;
            (
                state.draft.clone(),
                SubmittingGuard { state: &self.state },
            )
        };

        draft.check(&self.venue)?;
        let summary = self.summary_for(&draft)?;
        let new_booking = draft.to_new_booking(self.venue.id)?;

        let booking_id = self
            .repo
            .insert_booking(&new_booking)
            .await
            .map_err(|e| self.submission_failed("insert booking", e))?;
        Counters::incr(&self.counters.bookings_created);

        let request = CheckoutRequest {
            key_id: self.config.checkout_key_id.clone(),
            amount_minor: summary.advance_minor_units()?,
            currency: self.config.currency.clone(),
            merchant_name: self.config.merchant_name.clone(),
            description: format!("Booking for {}", self.venue.name),
            order_reference: booking_id,
            prefill: Prefill {
                name: new_booking.booking_name.clone(),
                email: new_booking.email.clone(),
                contact: new_booking.whatsapp.clone(),
            },
        };

        let outcome = gateway
            .open(request)
            .await
            .map_err(|e| self.submission_failed("open checkout", e))?;

        match outcome {
            CheckoutOutcome::Completed { payment_ref } => {
                self.repo
                    .mark_advance_paid(&booking_id, &payment_ref)
                    .await
                    .map_err(|e| self.submission_failed("record payment", e))?;

                Counters::incr(&self.counters.payments_confirmed);
                info!(booking_id = %booking_id, "booking confirmed");

                Ok(SubmitOutcome::Confirmed {
                    booking_id,
                    payment_ref,
                })
            }
            CheckoutOutcome::Dismissed => {
                Counters::incr(&self.counters.payments_pending);
                warn!(booking_id = %booking_id, "checkout dismissed; booking left pending");

                Ok(SubmitOutcome::PendingPayment { booking_id })
            }
        }
    }

    fn submission_failed(&self, step: &'static str, err: anyhow::Error) -> BookingError {
        Counters::incr(&self.counters.submission_failures);
        error!(error = ?err, step, "error in booking process");
        BookingError::submission(err.context(step))
    }
}
