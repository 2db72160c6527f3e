/// Core type definitions for the kline gateway
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::data::OpenAggregation;
use crate::error::{KlineError, Result};
use crate::time::session::local_instant;

/// OHLCV Bar data structure
///
/// Daily store rows carry `date` and may leave `timestamp` unset; the router
/// projects `date` onto `timestamp` before handing bars to callers. A date is
/// anchored at midnight of that calendar day in the exchange timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
}

impl Bar {
    /// Local midnight of the calendar `date` in `timezone`, if the bar carries one
    pub fn date_anchor(&self, timezone: Tz) -> Option<DateTime<Utc>> {
        self.date.map(|d| local_instant(timezone, d, NaiveTime::MIN))
    }

    /// Copy `date` onto `timestamp` so daily bars present a uniform time field
    pub fn with_date_as_timestamp(mut self, timezone: Tz) -> Self {
        if let Some(anchor) = self.date_anchor(timezone) {
            self.timestamp = anchor;
        }
        self
    }
}

/// Closed, inclusive time range `[from, to]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        TimeRange { from, to }
    }

    /// Build from epoch seconds; both ends must be representable
    pub fn from_epoch_secs(from: i64, to: i64) -> Result<Self> {
        let from_ts = DateTime::from_timestamp(from, 0)
            .ok_or_else(|| KlineError::InvalidParameter(format!("'from' out of range: {}", from)))?;
        let to_ts = DateTime::from_timestamp(to, 0)
            .ok_or_else(|| KlineError::InvalidParameter(format!("'to' out of range: {}", to)))?;
        Ok(TimeRange::new(from_ts, to_ts))
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.from && t <= self.to
    }
}

/// Kline query as bound from the caller-facing boundary
#[derive(Debug, Clone, Deserialize)]
pub struct KlineRequest {
    pub code: String,
    pub from: i64,
    pub to: i64,
    #[serde(default)]
    pub interval: Option<String>,
}

impl KlineRequest {
    /// Reject malformed requests before they reach the router
    pub fn validate(&self) -> Result<TimeRange> {
        if self.code.trim().is_empty() {
            return Err(KlineError::InvalidParameter("'code' is required".to_string()));
        }
        if self.from > self.to {
            return Err(KlineError::InvalidParameter(format!(
                "'from' ({}) must not be after 'to' ({})",
                self.from, self.to
            )));
        }
        TimeRange::from_epoch_secs(self.from, self.to)
    }

    /// Interval token; a missing interval is the empty token (daily fallback)
    pub fn interval_token(&self) -> &str {
        self.interval.as_deref().unwrap_or("")
    }
}

/// Configuration for the kline gateway
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Logging
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,

    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    pub stores: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// IANA timezone identifier, e.g. "Asia/Shanghai"
    pub timezone: String,
    #[serde(default = "default_session_open")]
    pub session_open: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregationConfig {
    #[serde(default)]
    pub open_aggregation: OpenAggregation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub minute_dir: PathBuf,
    pub daily_dir: PathBuf,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_open() -> String {
    "09:30:00".to_string()
}

impl ExchangeConfig {
    pub fn session_open_time(&self) -> Result<NaiveTime> {
        parse_session_time(&self.session_open).ok_or_else(|| {
            KlineError::ConfigError(format!("Invalid session_open: {}", self.session_open))
        })
    }
}

/// Parse "HH:MM:SS" or "HH:MM"
pub fn parse_session_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}
