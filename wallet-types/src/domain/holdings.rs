//! Balances held in each supported currency.

use exchange_rates::{CurrencyCode, RateSnapshot, to_local};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::money::clamp_non_negative;

/// One non-negative amount per currency. Missing currencies default to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE", default)]
pub struct Holdings {
    #[schema(example = 15000000.0)]
    pub irt: f64,
    #[schema(example = 120.0)]
    pub usd: f64,
    #[schema(example = 0.0)]
    pub eur: f64,
    #[schema(example = 250.5)]
    pub usdt: f64,
}

impl Holdings {
    pub fn get(&self, currency: CurrencyCode) -> f64 {
        match currency {
            CurrencyCode::IRT => self.irt,
            CurrencyCode::USD => self.usd,
            CurrencyCode::EUR => self.eur,
            CurrencyCode::USDT => self.usdt,
        }
    }

    /// Sets one balance; NaN and negative values are stored as 0.
    pub fn set(&mut self, currency: CurrencyCode, value: f64) {
        let value = clamp_non_negative(value);
        match currency {
            CurrencyCode::IRT => self.irt = value,
            CurrencyCode::USD => self.usd = value,
            CurrencyCode::EUR => self.eur = value,
            CurrencyCode::USDT => self.usdt = value,
        }
    }

    /// Sum of every balance converted to local currency.
    pub fn gross_local(&self, snapshot: Option<&RateSnapshot>) -> f64 {
        CurrencyCode::all()
            .iter()
            .map(|&currency| to_local(self.get(currency), currency, snapshot))
            .sum()
    }
}
