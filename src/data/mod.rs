pub mod bar_store;
pub mod bar_aggregator;
pub mod interval;

pub use bar_store::{BarSource, JsonlBarStore, MemoryBarStore, StoreKind};
pub use bar_aggregator::{BarAggregator, OpenAggregation};
pub use interval::{Interval, IntervalPolicy};
