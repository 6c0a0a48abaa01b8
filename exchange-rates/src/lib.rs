//! Local-Currency Exchange Rates
//!
//! This library holds the currency set the wallet understands, the
//! [`RateSnapshot`] produced by the rate service, and the pure conversion
//! function every valuation goes through. Currencies are declared with a
//! macro that generates the `CurrencyCode` enum and its runtime dispatch.
//!
//! # Adding a New Currency
//! Add a line to the `define_currencies!` invocation and a matching field to
//! [`RateSnapshot`]:
//! ```ignore
//! define_currencies! {
//!     // ... existing currencies ...
//!     GBP => ("GBP", "£", "British pound", |s: &RateSnapshot| s.local_per_gbp as f64),
//! }
//! ```
//!
//! # Example
//! ```
//! use chrono::Utc;
//! use exchange_rates::{CurrencyCode, RateSnapshot, to_local};
//!
//! let rates = RateSnapshot::new(60_000, 62_000, 60_050, Utc::now());
//!
//! assert_eq!(to_local(10.0, CurrencyCode::USD, Some(&rates)), 600_000.0);
//! assert_eq!(to_local(10.0, CurrencyCode::USD, None), 0.0);
//! assert_eq!(to_local(10.0, CurrencyCode::IRT, None), 10.0);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Upstream quotes are priced in rials; the wallet works in tomans.
pub const QUOTE_SCALE: f64 = 10.0;

// ─────────────────────────────────────────────────────────────────────────────
// Rate Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// One immutable set of exchange rates plus the time they were quoted.
///
/// Every rate is expressed as whole local-currency units per one unit of the
/// foreign currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    /// Local units per 1 USD
    #[schema(example = 60000)]
    pub local_per_usd: u64,
    /// Local units per 1 EUR
    #[schema(example = 62000)]
    pub local_per_eur: u64,
    /// Local units per 1 USDT
    #[schema(example = 60050)]
    pub local_per_usdt: u64,
    /// Latest quote time reported upstream
    pub as_of: DateTime<Utc>,
    /// Set when served past its freshness window after a failed refresh
    #[serde(default, skip_serializing_if = "is_false")]
    pub stale: bool,
    /// Cause of the failed refresh; only present on stale snapshots
    #[serde(default, rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl RateSnapshot {
    /// Creates a fresh snapshot.
    pub fn new(
        local_per_usd: u64,
        local_per_eur: u64,
        local_per_usdt: u64,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            local_per_usd,
            local_per_eur,
            local_per_usdt,
            as_of,
            stale: false,
            error_message: None,
        }
    }

    /// Returns a copy marked stale with the failure that prevented a refresh.
    pub fn to_stale(&self, error_message: impl Into<String>) -> Self {
        Self {
            stale: true,
            error_message: Some(error_message.into()),
            ..self.clone()
        }
    }
}

/// Scales an upstream quote down to whole local units.
///
/// Anything that is not a finite positive number becomes 0.
pub fn normalize_quote(raw: f64) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    (raw / QUOTE_SCALE).round() as u64
}

// ─────────────────────────────────────────────────────────────────────────────
// THE MACRO: Defines all currencies and their runtime dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Macro to define the supported currencies.
///
/// # Syntax
/// ```ignore
/// define_currencies! {
///     Name => ("CODE", "SYMBOL", "display name", |snapshot: &RateSnapshot| rate_as_f64),
/// }
/// ```
#[macro_export]
macro_rules! define_currencies {
    (
        $(
            $name:ident => ($code:literal, $symbol:literal, $display:literal, $rate:expr)
        ),* $(,)?
    ) => {
        /// Currencies a holding or expense can be recorded in.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
        #[serde(rename_all = "UPPERCASE")]
        pub enum CurrencyCode {
            $($name),*
        }

        impl CurrencyCode {
            pub fn code(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $code),*
                }
            }

            pub fn symbol(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $symbol),*
                }
            }

            pub fn display_name(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $display),*
                }
            }

            /// Local units per one unit of this currency under `snapshot`.
            pub fn rate_in(&self, snapshot: &RateSnapshot) -> f64 {
                match self {
                    $(CurrencyCode::$name => ($rate)(snapshot)),*
                }
            }

            pub fn all() -> &'static [CurrencyCode] {
                &[$(CurrencyCode::$name),*]
            }
        }

        impl std::fmt::Display for CurrencyCode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.code())
            }
        }

        impl std::str::FromStr for CurrencyCode {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($code => Ok(CurrencyCode::$name),)*
                    _ => Err(format!("Unknown currency: {}", s)),
                }
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// CURRENCY DEFINITIONS
// ─────────────────────────────────────────────────────────────────────────────

define_currencies! {
    IRT => ("IRT", "T", "Iranian toman", |_: &RateSnapshot| 1.0),
    USD => ("USD", "$", "US dollar", |s: &RateSnapshot| s.local_per_usd as f64),
    EUR => ("EUR", "€", "Euro", |s: &RateSnapshot| s.local_per_eur as f64),
    USDT => ("USDT", "₮", "Tether", |s: &RateSnapshot| s.local_per_usdt as f64),
}

impl CurrencyCode {
    /// The currency every valuation is expressed in.
    pub const LOCAL: CurrencyCode = CurrencyCode::IRT;

    pub fn is_local(&self) -> bool {
        *self == Self::LOCAL
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversion
// ─────────────────────────────────────────────────────────────────────────────

/// Converts `amount` of `currency` into local units.
///
/// Without a snapshot only local amounts can be valued; everything else is 0
/// so callers always have something to show. No rounding is applied.
pub fn to_local(amount: f64, currency: CurrencyCode, snapshot: Option<&RateSnapshot>) -> f64 {
    match snapshot {
        None if currency.is_local() => amount,
        None => 0.0,
        Some(rates) => amount * currency.rate_in(rates),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rates() -> RateSnapshot {
        RateSnapshot::new(
            500,
            550,
            505,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_to_local_without_rates() {
        assert_eq!(to_local(100.0, CurrencyCode::USD, None), 0.0);
        assert_eq!(to_local(100.0, CurrencyCode::USDT, None), 0.0);
        assert_eq!(to_local(100.0, CurrencyCode::IRT, None), 100.0);
    }

    #[test]
    fn test_to_local_with_rates() {
        let rates = rates();
        assert_eq!(to_local(10.0, CurrencyCode::USD, Some(&rates)), 5000.0);
        assert_eq!(to_local(2.0, CurrencyCode::EUR, Some(&rates)), 1100.0);
        assert_eq!(to_local(1.5, CurrencyCode::USDT, Some(&rates)), 757.5);
        assert_eq!(to_local(42.0, CurrencyCode::IRT, Some(&rates)), 42.0);
    }

    #[test]
    fn test_normalize_quote_rounds_to_nearest() {
        assert_eq!(normalize_quote(600_000.0), 60_000);
        assert_eq!(normalize_quote(600_504.0), 60_050);
        assert_eq!(normalize_quote(600_505.0), 60_051);
        assert_eq!(normalize_quote(4.0), 0);
    }

    #[test]
    fn test_normalize_quote_rejects_garbage() {
        assert_eq!(normalize_quote(f64::NAN), 0);
        assert_eq!(normalize_quote(f64::INFINITY), 0);
        assert_eq!(normalize_quote(-12_000.0), 0);
    }

    #[test]
    fn test_fresh_snapshot_serialization_omits_stale_fields() {
        let json = serde_json::to_value(rates()).unwrap();
        assert_eq!(json["localPerUsd"], 500);
        assert_eq!(json["localPerEur"], 550);
        assert_eq!(json["localPerUsdt"], 505);
        assert!(json.get("stale").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_stale_copy() {
        let fresh = rates();
        let stale = fresh.to_stale("upstream returned 503");

        assert!(stale.stale);
        assert_eq!(stale.error_message.as_deref(), Some("upstream returned 503"));
        assert_eq!(stale.local_per_usd, fresh.local_per_usd);
        assert!(!fresh.stale);

        let json = serde_json::to_value(&stale).unwrap();
        assert_eq!(json["stale"], true);
        assert_eq!(json["error"], "upstream returned 503");
    }

    #[test]
    fn test_currency_code_parse() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!("usdt".parse::<CurrencyCode>().unwrap(), CurrencyCode::USDT);
        assert!("GBP".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_currency_code_display() {
        assert_eq!(CurrencyCode::EUR.to_string(), "EUR");
        assert!(CurrencyCode::IRT.is_local());
        assert_eq!(CurrencyCode::all().len(), 4);
    }
}
