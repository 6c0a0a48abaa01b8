//! Navasan rate provider.
//!
//! One GET per refresh; quotes are normalized from rials to tomans and the
//! snapshot time is the latest quote time reported upstream.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Client;
use reqwest::header::CACHE_CONTROL;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use exchange_rates::normalize_quote;
use wallet_types::{RateError, RateProvider, RateSnapshot};

const ITEMS: &str = "usd,eur,usdt";
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

#[derive(Debug, Clone)]
pub struct NavasanConfig {
    pub base_url: String,
    /// Checked on every fetch so the server can start without one.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

pub struct NavasanProvider {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl NavasanProvider {
    pub fn new(config: NavasanConfig) -> Result<Self, RateError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RateError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url,
            api_key: config.api_key.filter(|key| !key.trim().is_empty()),
            http,
        })
    }
}

#[async_trait]
impl RateProvider for NavasanProvider {
    #[tracing::instrument(skip(self))]
    async fn fetch_rates(&self) -> Result<RateSnapshot, RateError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RateError::Config("NAVASAN_API_KEY is not set".into()))?;

        let response = self
            .http
            .get(&self.base_url)
            .query(&[("api_key", api_key), ("item", ITEMS)])
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Rate provider request failed");
                RateError::Upstream {
                    status: None,
                    message: format!("Rate provider unreachable: {e}"),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Upstream {
                status: Some(status.as_u16()),
                message: format!("Rate provider returned {status}"),
            });
        }

        let body = response.text().await.map_err(|e| RateError::Upstream {
            status: None,
            message: format!("Failed to read rate provider response: {e}"),
        })?;

        let snapshot = parse_snapshot(&body, Utc::now())?;
        debug!(
            usd = snapshot.local_per_usd,
            eur = snapshot.local_per_eur,
            usdt = snapshot.local_per_usdt,
            as_of = %snapshot.as_of,
            "Fetched rates"
        );
        Ok(snapshot)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Builds a snapshot from a provider body. `now` is used when no quote
/// carries a usable time.
fn parse_snapshot(body: &str, now: DateTime<Utc>) -> Result<RateSnapshot, RateError> {
    let payload: Value =
        serde_json::from_str(body).map_err(|e| RateError::Parse(format!("Invalid JSON: {e}")))?;

    let usd = quote(&payload, "usd")?;
    let eur = quote(&payload, "eur")?;
    let usdt = quote(&payload, "usdt")?;

    let as_of = [usd, eur, usdt]
        .into_iter()
        .filter_map(quote_time)
        .max()
        .unwrap_or(now);

    Ok(RateSnapshot::new(
        normalize_quote(quote_value(usd)),
        normalize_quote(quote_value(eur)),
        normalize_quote(quote_value(usdt)),
        as_of,
    ))
}

fn quote<'a>(payload: &'a Value, item: &str) -> Result<&'a Map<String, Value>, RateError> {
    payload
        .get(item)
        .and_then(Value::as_object)
        .ok_or_else(|| RateError::Parse(format!("Missing `{item}` quote")))
}

/// Numeric value of a quote; anything unreadable becomes NaN and normalizes to 0.
fn quote_value(item: &Map<String, Value>) -> f64 {
    item.get("value").and_then(number).unwrap_or(f64::NAN)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn quote_time(item: &Map<String, Value>) -> Option<DateTime<Utc>> {
    // An out-of-range timestamp falls back to the date fields.
    let timestamp = item
        .get("timestamp")
        .and_then(number)
        .filter(|ts| ts.is_finite() && *ts != 0.0)
        .and_then(|ts| DateTime::from_timestamp(ts as i64, 0));
    if timestamp.is_some() {
        return timestamp;
    }

    let date = item.get("date").and_then(Value::as_str).and_then(parse_date)?;
    let time = item
        .get("time")
        .and_then(Value::as_str)
        .and_then(parse_time)
        .unwrap_or(NaiveTime::MIN);

    Some(date.and_time(time).and_utc())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw.trim(), fmt).ok())
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw.trim(), fmt).ok())
}
