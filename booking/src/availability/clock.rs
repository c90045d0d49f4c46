use chrono::NaiveTime;

use crate::error::BookingError;

/// Render a raw 24-hour `HH:MM[:SS]` value as a 12-hour clock label.
///
/// Hour 0 becomes 12 AM, 12 stays 12 PM, 13-23 drop by twelve. Minutes are
/// passed through exactly as stored; seconds are dropped.
pub fn format_clock(raw: &str) -> Result<String, BookingError> {
    let mut parts = raw.trim().split(':');

    let hours = parts.next().unwrap_or_default();
    let minutes = parts
        .next()
        .filter(|m| !m.is_empty() && m.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| BookingError::InvalidTimeFormat(raw.to_string()))?;

    let hour: u32 = hours
        .parse()
        .map_err(|_| BookingError::InvalidTimeFormat(raw.to_string()))?;
    if hour > 23 {
        return Err(BookingError::InvalidTimeFormat(raw.to_string()));
    }

    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };

    Ok(format!("{display_hour}:{minutes} {suffix}"))
}

/// Canonical stored form of a slot time: zero-padded `HH:MM`, or `HH:MM:SS`
/// when seconds were given. Padded values sort as text in clock order.
pub fn normalize_clock(raw: &str) -> Result<String, BookingError> {
    let invalid = || BookingError::InvalidTimeFormat(raw.to_string());

    let parts: Vec<&str> = raw.trim().split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(invalid());
    }

    let mut fields = [0u32; 3];
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        fields[i] = part.parse().map_err(|_| invalid())?;
    }
    // minutes and seconds are always two digits
    if parts[1..].iter().any(|p| p.len() != 2) {
        return Err(invalid());
    }

    let time = NaiveTime::from_hms_opt(fields[0], fields[1], fields[2]).ok_or_else(invalid)?;

    Ok(if parts.len() == 3 {
        time.format("%H:%M:%S").to_string()
    } else {
        time.format("%H:%M").to_string()
    })
}
