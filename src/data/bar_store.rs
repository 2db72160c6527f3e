/// Bar stores - one capability trait over the minute and daily sources
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{KlineError, Result};
use crate::types::{Bar, TimeRange};

/// Native resolution of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Minute,
    Daily,
}

impl StoreKind {
    pub fn as_str(&self) -> &str {
        match self {
            StoreKind::Minute => "1m",
            StoreKind::Daily => "1d",
        }
    }

    /// Time a bar is ranged and ordered by in this store
    ///
    /// Daily rows key on local midnight of their `date` in `anchor_tz`.
    pub fn time_key(&self, bar: &Bar, anchor_tz: Tz) -> DateTime<Utc> {
        match self {
            StoreKind::Minute => bar.timestamp,
            StoreKind::Daily => bar.date_anchor(anchor_tz).unwrap_or(bar.timestamp),
        }
    }
}

/// Read-only source of raw bars for a symbol over a closed range
///
/// Implementations return bars ordered by time ascending and must not retry;
/// failures surface as upstream errors.
#[async_trait]
pub trait BarSource: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Timezone whose midnight anchors calendar dates when ranging rows
    fn anchor_timezone(&self) -> Tz {
        Tz::UTC
    }

    async fn fetch(&self, symbol: &str, range: TimeRange) -> Result<Vec<Bar>>;
}

/// Keep bars inside `range` and order them ascending by the store's time key
pub fn select_range<'a, I>(bars: I, kind: StoreKind, anchor_tz: Tz, range: TimeRange) -> Vec<Bar>
where
    I: IntoIterator<Item = &'a Bar>,
{
    let mut selected: Vec<Bar> = bars
        .into_iter()
        .filter(|bar| range.contains(kind.time_key(bar, anchor_tz)))
        .cloned()
        .collect();
    selected.sort_by_key(|bar| kind.time_key(bar, anchor_tz));
    selected
}

/// In-memory store, keyed by symbol
pub struct MemoryBarStore {
    kind: StoreKind,
    anchor_tz: Tz,
    series: RwLock<HashMap<String, Vec<Bar>>>,
}

impl MemoryBarStore {
    pub fn new(kind: StoreKind) -> Self {
        MemoryBarStore {
            kind,
            anchor_tz: Tz::UTC,
            series: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_anchor_timezone(mut self, anchor_tz: Tz) -> Self {
        self.anchor_tz = anchor_tz;
        self
    }

    /// Replace the series for a symbol
    pub async fn insert(&self, symbol: &str, bars: Vec<Bar>) {
        let mut series = self.series.write().await;
        series.insert(symbol.to_string(), bars);
    }

    pub async fn append(&self, symbol: &str, bar: Bar) {
        let mut series = self.series.write().await;
        series.entry(symbol.to_string()).or_default().push(bar);
    }

    pub async fn len(&self, symbol: &str) -> usize {
        let series = self.series.read().await;
        series.get(symbol).map_or(0, Vec::len)
    }
}

#[async_trait]
impl BarSource for MemoryBarStore {
    fn kind(&self) -> StoreKind {
        self.kind
    }

    fn anchor_timezone(&self) -> Tz {
        self.anchor_tz
    }

    async fn fetch(&self, symbol: &str, range: TimeRange) -> Result<Vec<Bar>> {
        let series = self.series.read().await;
        Ok(series
            .get(symbol)
            .map(|bars| select_range(bars, self.kind, self.anchor_tz, range))
            .unwrap_or_default())
    }
}

/// Disk store: one `<SYMBOL>.jsonl` file per symbol, one bar per line
pub struct JsonlBarStore {
    kind: StoreKind,
    anchor_tz: Tz,
    root: PathBuf,
}

impl JsonlBarStore {
    pub fn new(kind: StoreKind, root: impl Into<PathBuf>) -> Self {
        JsonlBarStore {
            kind,
            anchor_tz: Tz::UTC,
            root: root.into(),
        }
    }

    pub fn with_anchor_timezone(mut self, anchor_tz: Tz) -> Self {
        self.anchor_tz = anchor_tz;
        self
    }

    /// Path of the symbol's file; symbols never escape the store directory
    pub fn symbol_file(&self, symbol: &str) -> Result<PathBuf> {
        if symbol.is_empty()
            || symbol.contains('/')
            || symbol.contains('\\')
            || symbol.contains("..")
        {
            return Err(KlineError::InvalidParameter(format!("Invalid symbol: {:?}", symbol)));
        }
        Ok(self.root.join(format!("{}.jsonl", symbol)))
    }

    /// Append a bar to the symbol's file, creating it if needed
    pub async fn append(&self, symbol: &str, bar: &Bar) -> Result<()> {
        let path = self.symbol_file(symbol)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let json_line = serde_json::to_string(bar)?;
        file.write_all(format!("{}\n", json_line).as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Load every decodable row; undecodable rows (bad JSON or bad UTF-8) are skipped
    async fn read_all(&self, path: &Path) -> Result<Vec<Bar>> {
        let file = tokio::fs::File::open(path).await?;
        let mut rows = BufReader::new(file).split(b'\n');

        let mut bars = Vec::new();
        let mut line_no = 0usize;
        while let Some(row) = rows.next_segment().await? {
            line_no += 1;
            if row.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<Bar>(&row) {
                Ok(bar) => bars.push(bar),
                Err(e) => warn!("Skipping malformed bar at {}:{} - {}", path.display(), line_no, e),
            }
        }

        Ok(bars)
    }
}

#[async_trait]
impl BarSource for JsonlBarStore {
    fn kind(&self) -> StoreKind {
        self.kind
    }

    fn anchor_timezone(&self) -> Tz {
        self.anchor_tz
    }

    async fn fetch(&self, symbol: &str, range: TimeRange) -> Result<Vec<Bar>> {
        let path = self.symbol_file(symbol)?;

        if !tokio::fs::try_exists(&self.root).await? {
            return Err(KlineError::StoreUnavailable(format!(
                "{} store directory missing: {}",
                self.kind.as_str(),
                self.root.display()
            )));
        }

        if !tokio::fs::try_exists(&path).await? {
            debug!("No bar file for {} in {} store", symbol, self.kind.as_str());
            return Ok(Vec::new());
        }

        let bars = self.read_all(&path).await?;
        let selected = select_range(&bars, self.kind, self.anchor_tz, range);

        debug!(
            "Fetched {} of {} {} bars for {}",
            selected.len(),
            bars.len(),
            self.kind.as_str(),
            symbol
        );

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use chrono_tz::America::New_York;
    use std::io::Write;

    fn minute_bar(minute: u32, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 8, 1, 30 + minute, 0).unwrap(),
            date: None,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
            amount: 100.0 * close,
        }
    }

    fn daily_bar(day: u32) -> Bar {
        Bar {
            timestamp: DateTime::<Utc>::default(),
            date: NaiveDate::from_ymd_opt(2024, 3, day),
            open: 10.0,
            high: 12.0,
            low: 9.0,
            close: 11.0,
            volume: 1000.0,
            amount: 11000.0,
        }
    }

    fn temp_store_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("klinegate_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_memory_store_orders_and_filters() {
        let store = MemoryBarStore::new(StoreKind::Minute);
        // Inserted out of order
        store
            .insert("600000", vec![minute_bar(2, 3.0), minute_bar(0, 1.0), minute_bar(1, 2.0)])
            .await;

        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 3, 8, 1, 31, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 8, 1, 32, 0).unwrap(),
        );
        let bars = store.fetch("600000", range).await.unwrap();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![2.0, 3.0]);

        assert!(store.fetch("000001", range).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_daily_store_ranges_by_date() {
        let store = MemoryBarStore::new(StoreKind::Daily);
        for day in [4, 5, 6, 7, 8] {
            store.append("600000", daily_bar(day)).await;
        }
        assert_eq!(store.len("600000").await, 5);

        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).unwrap(),
        );
        let bars = store.fetch("600000", range).await.unwrap();
        let days: Vec<NaiveDate> = bars.iter().filter_map(|b| b.date).collect();
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            ]
        );
        // Raw rows are returned untouched; projection is the router's job
        assert_eq!(bars[0].timestamp.timestamp(), 0);
    }

    #[tokio::test]
    async fn test_jsonl_store_round_trip_and_skips_bad_lines() {
        let dir = temp_store_dir("jsonl_minute");
        let store = JsonlBarStore::new(StoreKind::Minute, &dir);

        for (i, close) in [1.0, 2.0, 3.0].into_iter().enumerate() {
            store.append("600000", &minute_bar(i as u32, close)).await.unwrap();
        }
        // Corrupt a line by hand
        let path = store.symbol_file("600000").unwrap();
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{not json}\n\n");
        std::fs::write(&path, content).unwrap();

        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 8, 23, 59, 0).unwrap(),
        );
        let bars = store.fetch("600000", range).await.unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[2], minute_bar(2, 3.0));

        // Missing symbol file is just empty
        assert!(store.fetch("000001", range).await.unwrap().is_empty());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_jsonl_store_skips_invalid_utf8_rows() {
        let dir = temp_store_dir("jsonl_utf8");
        let store = JsonlBarStore::new(StoreKind::Minute, &dir);
        store.append("600000", &minute_bar(0, 1.0)).await.unwrap();

        let path = store.symbol_file("600000").unwrap();
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"\xff\xfe garbage\n").unwrap();
        drop(file);

        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 8, 23, 59, 0).unwrap(),
        );
        let bars = store.fetch("600000", range).await.unwrap();
        assert_eq!(bars, vec![minute_bar(0, 1.0)]);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_daily_store_ranges_on_exchange_midnight() {
        let store = MemoryBarStore::new(StoreKind::Daily).with_anchor_timezone(New_York);
        assert_eq!(store.anchor_timezone(), New_York);
        for day in [4, 5, 6, 7] {
            store.append("AAPL", daily_bar(day)).await;
        }

        // New York calendar day 2024-03-05 (UTC-5)
        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 3, 5, 5, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 6, 4, 59, 59).unwrap(),
        );
        let bars = store.fetch("AAPL", range).await.unwrap();
        let days: Vec<NaiveDate> = bars.iter().filter_map(|b| b.date).collect();
        assert_eq!(days, vec![NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()]);

        // Anchored at UTC midnight the same window selects the next trading day
        let utc = MemoryBarStore::new(StoreKind::Daily);
        for day in [4, 5, 6, 7] {
            utc.append("AAPL", daily_bar(day)).await;
        }
        let bars = utc.fetch("AAPL", range).await.unwrap();
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 3, 6));
    }

    #[tokio::test]
    async fn test_jsonl_store_missing_root_is_upstream_error() {
        let dir = std::env::temp_dir().join(format!("klinegate_missing_{}", std::process::id()));
        let store = JsonlBarStore::new(StoreKind::Daily, &dir);
        let range = TimeRange::from_epoch_secs(0, 86_400).unwrap();

        let err = store.fetch("600000", range).await.unwrap_err();
        assert!(err.is_upstream());
        assert_eq!(err.error_code(), "STORE_001");
    }

    #[test]
    fn test_symbol_cannot_escape_root() {
        let store = JsonlBarStore::new(StoreKind::Minute, "data/bars/1m");
        assert!(store.symbol_file("../etc/passwd").unwrap_err().is_bad_request());
        assert!(store.symbol_file("a/b").is_err());
        assert!(store.symbol_file("").is_err());
        assert_eq!(
            store.symbol_file("600000").unwrap(),
            PathBuf::from("data/bars/1m/600000.jsonl")
        );
    }
}
