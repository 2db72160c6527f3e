/// Positional aggregation of native bars into coarser bars
use std::num::NonZeroUsize;

use serde::Deserialize;

use crate::types::Bar;

/// How the `open` of an aggregated bar is derived
///
/// `SumOfOpens` reproduces the historical output of the gateway: the opens of
/// every bar in the group are added up. This is almost certainly a defect in
/// the legacy aggregation, but switching it silently would change every
/// minute-derived price already served. `FirstOpen` is standard OHLC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenAggregation {
    #[default]
    SumOfOpens,
    FirstOpen,
}

/// Folds ordered native bars into groups of `factor`
#[derive(Debug, Clone, Copy, Default)]
pub struct BarAggregator {
    open_aggregation: OpenAggregation,
}

impl BarAggregator {
    pub fn new(open_aggregation: OpenAggregation) -> Self {
        BarAggregator { open_aggregation }
    }

    /// Group consecutive bars `factor` at a time, starting at index 0.
    ///
    /// A trailing partial group is emitted as a short bar.
    pub fn fold(&self, bars: &[Bar], factor: NonZeroUsize) -> Vec<Bar> {
        bars.chunks(factor.get())
            .filter_map(|group| self.fold_group(group))
            .collect()
    }

    fn fold_group(&self, group: &[Bar]) -> Option<Bar> {
        let (first, rest) = group.split_first()?;
        let mut aggregate = first.clone();

        for bar in rest {
            if self.open_aggregation == OpenAggregation::SumOfOpens {
                aggregate.open += bar.open;
            }
            aggregate.high = aggregate.high.max(bar.high);
            aggregate.low = aggregate.low.min(bar.low);
            aggregate.close = bar.close;
            aggregate.volume += bar.volume;
            aggregate.amount += bar.amount;
        }

        Some(aggregate)
    }
}
