//! Amount tagged with the currency it was recorded in.

use exchange_rates::{CurrencyCode, RateSnapshot, to_local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// A non-negative amount in one of the supported currencies.
///
/// Amounts are fractional (0.5 USD is a valid holding), so unlike ledger
/// systems this is an `f64` in major units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Money {
    amount: f64,
    currency: CurrencyCode,
}

impl Money {
    /// Creates a new Money value.
    pub fn new(amount: f64, currency: CurrencyCode) -> Result<Self, DomainError> {
        if !amount.is_finite() {
            return Err(DomainError::InvalidAmount);
        }
        if amount < 0.0 {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self { amount, currency })
    }

    /// Creates a zero-value Money for the given currency.
    pub fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount: 0.0,
            currency,
        }
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Value in local currency; 0 for foreign amounts when no rates are known.
    pub fn to_local(&self, snapshot: Option<&RateSnapshot>) -> f64 {
        to_local(self.amount, self.currency, snapshot)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", self.currency.symbol(), self.amount)
    }
}

/// Maps NaN and negative input to 0.
pub fn clamp_non_negative(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        return 0.0;
    }
    value
}
