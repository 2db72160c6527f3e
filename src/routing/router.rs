/// Interval routing - picks a store per interval and folds minute bars when needed
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::data::{BarAggregator, BarSource, IntervalPolicy, StoreKind};
use crate::error::{KlineError, Result};
use crate::time::SessionAligner;
use crate::types::{Bar, Config, TimeRange};

/// Resolves kline requests against a minute store and a daily store.
///
/// Holds no per-request state; share it behind an `Arc` across concurrent
/// requests.
#[derive(Clone)]
pub struct IntervalRouter {
    minute_store: Arc<dyn BarSource>,
    daily_store: Arc<dyn BarSource>,
    aligner: SessionAligner,
    aggregator: BarAggregator,
}

impl IntervalRouter {
    pub fn new(
        minute_store: Arc<dyn BarSource>,
        daily_store: Arc<dyn BarSource>,
        aligner: SessionAligner,
        aggregator: BarAggregator,
    ) -> Self {
        IntervalRouter {
            minute_store,
            daily_store,
            aligner,
            aggregator,
        }
    }

    /// Build from configuration; timezone and wiring problems fail here, not per request
    pub fn from_config(
        config: &Config,
        minute_store: Arc<dyn BarSource>,
        daily_store: Arc<dyn BarSource>,
    ) -> Result<Self> {
        let aligner = SessionAligner::from_config(&config.exchange)?;

        for (slot, store) in [(StoreKind::Minute, &minute_store), (StoreKind::Daily, &daily_store)] {
            if store.kind() != slot {
                return Err(KlineError::ConfigError(format!(
                    "{} store slot wired to a {} store",
                    slot.as_str(),
                    store.kind().as_str()
                )));
            }
        }

        // Daily rows must be ranged on the same calendar the dates are projected with
        if daily_store.anchor_timezone() != aligner.timezone() {
            return Err(KlineError::ConfigError(format!(
                "Daily store anchored in {} but exchange timezone is {}",
                daily_store.anchor_timezone(),
                aligner.timezone()
            )));
        }

        let aggregator = BarAggregator::new(config.aggregation.open_aggregation);
        Ok(IntervalRouter::new(minute_store, daily_store, aligner, aggregator))
    }

    pub fn aligner(&self) -> &SessionAligner {
        &self.aligner
    }

    fn store_for(&self, kind: StoreKind) -> &dyn BarSource {
        match kind {
            StoreKind::Minute => self.minute_store.as_ref(),
            StoreKind::Daily => self.daily_store.as_ref(),
        }
    }

    /// Resolve `[from, to]` given in epoch seconds
    pub async fn resolve(&self, symbol: &str, interval: &str, from: i64, to: i64) -> Result<Vec<Bar>> {
        let range = TimeRange::from_epoch_secs(from, to)?;
        self.resolve_range(symbol, interval, range).await
    }

    pub async fn resolve_range(&self, symbol: &str, interval: &str, range: TimeRange) -> Result<Vec<Bar>> {
        let policy = IntervalPolicy::for_token(interval);
        debug!(
            "Resolve {} interval={:?} source={} factor={} from={} to={}",
            symbol,
            interval,
            policy.source.as_str(),
            policy.factor,
            range.from,
            range.to
        );
        if policy == IntervalPolicy::DAILY && interval != "1d" {
            debug!("Interval {:?} served from daily store", interval);
        }

        let store = self.store_for(policy.source);

        if !policy.needs_aggregation() {
            let bars = store.fetch(symbol, range).await?;
            let timezone = self.aligner.timezone();
            return Ok(match policy.source {
                StoreKind::Daily => bars
                    .into_iter()
                    .map(|bar| bar.with_date_as_timestamp(timezone))
                    .collect(),
                StoreKind::Minute => bars,
            });
        }

        // Positional grouping only lines up with real candles when the
        // fetch starts at the session open
        let aligned = TimeRange::new(self.aligner.align_to_session_start(range.from), range.to);
        let bars = store.fetch(symbol, aligned).await?;
        let folded = self.aggregator.fold(&bars, policy.factor);

        debug!(
            "Folded {} {} bars into {} for {} (aligned from {})",
            bars.len(),
            policy.source.as_str(),
            folded.len(),
            symbol,
            aligned.from
        );

        Ok(folded)
    }

    /// Resolve, aborting the in-flight fetch once `cancel` completes
    pub async fn resolve_until<C>(
        &self,
        symbol: &str,
        interval: &str,
        range: TimeRange,
        cancel: C,
    ) -> Result<Vec<Bar>>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            result = self.resolve_range(symbol, interval, range) => result,
            _ = cancel => {
                warn!("Resolve {} {:?} cancelled by caller", symbol, interval);
                Err(KlineError::Cancelled(format!("{} {}", symbol, interval)))
            }
        }
    }
}
