/// Presentation of bars for the response boundary
use chrono_tz::Tz;
use serde::Serialize;

use crate::types::Bar;

const DATE_FORMAT: &str = "%Y%m%d";
const TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M:%S";

/// Bar with string-formatted time fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KlineView {
    pub date: String,
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
}

impl KlineView {
    /// Timestamps render in exchange-local time. Daily bars keep their own
    /// calendar date.
    pub fn from_bar(bar: &Bar, timezone: Tz) -> Self {
        let local = bar.timestamp.with_timezone(&timezone);
        let date = match bar.date {
            Some(day) => day.format(DATE_FORMAT).to_string(),
            None => local.format(DATE_FORMAT).to_string(),
        };
        let timestamp = local.format(TIMESTAMP_FORMAT).to_string();

        KlineView {
            date,
            timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            amount: bar.amount,
        }
    }
}

pub fn to_views(bars: &[Bar], timezone: Tz) -> Vec<KlineView> {
    bars.iter().map(|bar| KlineView::from_bar(bar, timezone)).collect()
}
