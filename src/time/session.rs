/// Trading session alignment in the exchange's local calendar
use chrono::offset::LocalResult;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{KlineError, Result};
use crate::types::ExchangeConfig;

/// Instant of wall-clock `time` on local `date` in `timezone`
pub fn local_instant(timezone: Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let local = date.and_time(time);

    match timezone.from_local_datetime(&local) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        // Repeated wall-clock hour: the first occurrence wins
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Skipped wall-clock hour: apply the offset in effect at the start of the UTC day
        LocalResult::None => {
            let offset = timezone.offset_from_utc_date(&date).fix().local_minus_utc();
            (local - Duration::seconds(i64::from(offset))).and_utc()
        }
    }
}

/// Maps instants to the session open of their exchange-local calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionAligner {
    timezone: Tz,
    session_open: NaiveTime,
}

impl SessionAligner {
    pub fn new(timezone: Tz, session_open: NaiveTime) -> Self {
        SessionAligner {
            timezone,
            session_open,
        }
    }

    /// Resolve the timezone by IANA name; an unknown name is a config error
    pub fn from_name(timezone: &str, session_open: NaiveTime) -> Result<Self> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| KlineError::ConfigError(format!("Unknown exchange timezone: {}", timezone)))?;
        Ok(SessionAligner::new(tz, session_open))
    }

    pub fn from_config(exchange: &ExchangeConfig) -> Result<Self> {
        SessionAligner::from_name(&exchange.timezone, exchange.session_open_time()?)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn session_open(&self) -> NaiveTime {
        self.session_open
    }

    /// Exchange-local calendar date of an instant
    pub fn local_date(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        timestamp.with_timezone(&self.timezone).date_naive()
    }

    /// Session open on the exchange-local calendar day containing `timestamp`
    pub fn align_to_session_start(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        self.session_start_on(self.local_date(timestamp))
    }

    /// Session open instant for a given exchange-local date
    pub fn session_start_on(&self, date: NaiveDate) -> DateTime<Utc> {
        local_instant(self.timezone, date, self.session_open)
    }

    /// Epoch-seconds convenience for callers holding raw request values
    pub fn align_epoch_secs(&self, secs: i64) -> Option<i64> {
        DateTime::from_timestamp(secs, 0).map(|t| self.align_to_session_start(t).timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Shanghai;
    use chrono_tz::America::New_York;

    fn shanghai() -> SessionAligner {
        SessionAligner::new(Shanghai, NaiveTime::from_hms_opt(9, 30, 0).unwrap())
    }

    #[test]
    fn test_aligns_to_local_session_open() {
        let aligner = shanghai();
        // 2024-03-08 13:05 Shanghai
        let t = Shanghai.with_ymd_and_hms(2024, 3, 8, 13, 5, 0).unwrap().with_timezone(&Utc);
        let aligned = aligner.align_to_session_start(t);
        assert_eq!(aligned, Utc.with_ymd_and_hms(2024, 3, 8, 1, 30, 0).unwrap());
    }

    #[test]
    fn test_same_local_day_maps_to_same_start() {
        let aligner = shanghai();
        let early = Shanghai.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap().with_timezone(&Utc);
        let late = Shanghai.with_ymd_and_hms(2024, 3, 8, 23, 59, 59).unwrap().with_timezone(&Utc);
        let start = aligner.align_to_session_start(early);
        assert_eq!(start, aligner.align_to_session_start(late));
        // Idempotent
        assert_eq!(start, aligner.align_to_session_start(start));
    }

    #[test]
    fn test_different_local_days_map_to_different_starts() {
        let aligner = shanghai();
        // Same UTC date, different Shanghai dates (UTC+8 rolls over at 16:00 UTC)
        let before = Utc.with_ymd_and_hms(2024, 3, 8, 15, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 8, 16, 0, 0).unwrap();
        let a = aligner.align_to_session_start(before);
        let b = aligner.align_to_session_start(after);
        assert_ne!(a, b);
        assert_eq!(b - a, Duration::days(1));
    }

    #[test]
    fn test_start_may_be_after_input() {
        let aligner = shanghai();
        let pre_open = Shanghai.with_ymd_and_hms(2024, 3, 8, 8, 0, 0).unwrap().with_timezone(&Utc);
        assert!(aligner.align_to_session_start(pre_open) > pre_open);
    }

    #[test]
    fn test_dst_gap_and_overlap_do_not_panic() {
        // New York skipped 02:00-03:00 on 2024-03-10 and repeated 01:00-02:00 on 2024-11-03
        let gap = SessionAligner::new(New_York, NaiveTime::from_hms_opt(2, 30, 0).unwrap());
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let start = gap.session_start_on(date);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap());

        let overlap = SessionAligner::new(New_York, NaiveTime::from_hms_opt(1, 30, 0).unwrap());
        let date = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap();
        assert_eq!(
            overlap.session_start_on(date),
            Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_unknown_timezone_is_config_error() {
        let err = SessionAligner::from_name("Mars/Olympus", NaiveTime::MIN).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_align_epoch_secs() {
        let aligner = shanghai();
        // 2024-03-08 05:00:00 UTC = 13:00 Shanghai
        assert_eq!(aligner.align_epoch_secs(1_709_874_000), Some(1_709_861_400));
    }
}
