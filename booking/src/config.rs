use crate::pricing::AdvancePolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string for the SQL-backed store.
    pub database_url: String,

    // =========================
    // Remote store
    // =========================
    /// Base URL of a hosted PostgREST-style store. When set together with
    /// `remote_store_key`, it is used instead of `database_url`.
    pub remote_store_url: Option<String>,

    /// Project key sent as `apikey` and bearer token.
    pub remote_store_key: Option<String>,

    // =========================
    // Pricing
    // =========================
    /// Advance collected at booking time, whole currency units.
    /// Independent of venue.
    pub advance_amount: i64,

    /// Portion of the advance presented as a convenience fee.
    pub convenience_fee: i64,

    // =========================
    // Checkout
    // =========================
    /// ISO currency code passed to the checkout widget.
    pub currency: String,

    /// Merchant name shown in the checkout widget.
    pub merchant_name: String,

    /// Public key of the checkout integration, if configured.
    pub checkout_key_id: Option<String>,

    // =========================
    // Diagnostics
    // =========================
    /// Remote calls slower than this are logged at warn level.
    pub slow_call_warn_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://venue_booking.db?mode=rwc".to_string());

        Self {
            database_url,

            remote_store_url: non_empty_var("REMOTE_STORE_URL"),
            remote_store_key: non_empty_var("REMOTE_STORE_KEY"),

            // Reference deployment: 700 advance, 50 of which is the convenience fee.
            advance_amount: parse_var("ADVANCE_AMOUNT", 700),
            convenience_fee: parse_var("CONVENIENCE_FEE", 50),

            currency: non_empty_var("CURRENCY").unwrap_or_else(|| "INR".to_string()),
            merchant_name: non_empty_var("MERCHANT_NAME")
                .unwrap_or_else(|| "Binge'N Celebration".to_string()),
            checkout_key_id: non_empty_var("CHECKOUT_KEY_ID"),

            slow_call_warn_ms: parse_var("SLOW_CALL_WARN_MS", 200),
        }
    }

    pub fn advance_policy(&self) -> AdvancePolicy {
        AdvancePolicy {
            advance_amount: self.advance_amount,
            convenience_fee: self.convenience_fee,
        }
    }

    /// Remote store credentials when both halves are configured.
    pub fn remote_store(&self) -> Option<(&str, &str)> {
        match (&self.remote_store_url, &self.remote_store_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://venue_booking.db?mode=rwc".to_string(),
            remote_store_url: None,
            remote_store_key: None,
            advance_amount: 700,
            convenience_fee: 50,
            currency: "INR".to_string(),
            merchant_name: "Binge'N Celebration".to_string(),
            checkout_key_id: None,
            slow_call_warn_ms: 200,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparsable config value");
                default
            }
        },
        Err(_) => default,
    }
}
