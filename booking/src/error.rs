use thiserror::Error;

use crate::model::VenueId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("fetch failed: {0}")]
    FetchFailure(String),

    #[error("venue not found: {0}")]
    VenueNotFound(VenueId),

    #[error("invalid price input: {0}")]
    InvalidPriceInput(String),

    #[error("invalid time value: {0}")]
    InvalidTimeFormat(String),

    #[error("invalid booking details: {0}")]
    InvalidDraft(String),

    #[error("submission failed: {0}")]
    SubmissionFailure(String),
}

impl BookingError {
    /// Message suitable for showing next to the form. Internal detail stays in logs.
    pub fn user_message(&self) -> String {
        match self {
            BookingError::FetchFailure(_) => "Loading failed. Please try again.".to_string(),
            BookingError::VenueNotFound(_) => "Venue not found".to_string(),
            BookingError::InvalidPriceInput(_) => {
                "Price details are unavailable for this venue.".to_string()
            }
            BookingError::InvalidTimeFormat(_) => {
                "Slot times could not be displayed.".to_string()
            }
            BookingError::InvalidDraft(reason) => reason.clone(),
            BookingError::SubmissionFailure(_) => {
                "Booking could not be completed. Please try again.".to_string()
            }
        }
    }

    pub(crate) fn fetch(err: anyhow::Error) -> Self {
        BookingError::FetchFailure(format!("{err:#}"))
    }

    pub(crate) fn submission(err: anyhow::Error) -> Self {
        BookingError::SubmissionFailure(format!("{err:#}"))
    }
}
