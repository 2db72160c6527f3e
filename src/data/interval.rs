/// Interval tokens and the store/factor policy behind each one
use std::fmt;
use std::num::NonZeroUsize;

use crate::data::StoreKind;

const fn non_zero(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(f) => f,
        None => panic!("aggregation factor must be non-zero"),
    }
}

const NATIVE: NonZeroUsize = non_zero(1);

/// Requested output granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    OneDay,
    /// Reserved; served as daily bars until weekly folding exists
    OneWeek,
    /// Reserved; served as daily bars until monthly folding exists
    OneMonth,
}

impl Interval {
    pub const ALL: [Interval; 8] = [
        Interval::OneMinute,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::OneHour,
        Interval::OneDay,
        Interval::OneWeek,
        Interval::OneMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::OneWeek => "1w",
            Interval::OneMonth => "1M",
        }
    }

    /// Exact, case-sensitive token match ("1m" is a minute, "1M" a month)
    pub fn parse(token: &str) -> Option<Self> {
        Interval::ALL.into_iter().find(|i| i.as_str() == token)
    }

    pub fn policy(&self) -> IntervalPolicy {
        let (source, factor) = match self {
            Interval::OneMinute => (StoreKind::Minute, NATIVE),
            Interval::FiveMinutes => (StoreKind::Minute, non_zero(5)),
            Interval::FifteenMinutes => (StoreKind::Minute, non_zero(15)),
            Interval::ThirtyMinutes => (StoreKind::Minute, non_zero(30)),
            Interval::OneHour => (StoreKind::Minute, non_zero(60)),
            Interval::OneDay | Interval::OneWeek | Interval::OneMonth => (StoreKind::Daily, NATIVE),
        };
        IntervalPolicy { source, factor }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which store to read and how many native bars make one output bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPolicy {
    pub source: StoreKind,
    pub factor: NonZeroUsize,
}

impl IntervalPolicy {
    /// Policy used for any token that is not a known interval
    pub const DAILY: IntervalPolicy = IntervalPolicy {
        source: StoreKind::Daily,
        factor: NATIVE,
    };

    /// Total mapping from token to policy; unknown tokens get `DAILY`
    pub fn for_token(token: &str) -> IntervalPolicy {
        Interval::parse(token)
            .map(|interval| interval.policy())
            .unwrap_or(IntervalPolicy::DAILY)
    }

    pub fn needs_aggregation(&self) -> bool {
        self.factor.get() > 1
    }
}
