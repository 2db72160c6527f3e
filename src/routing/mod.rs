pub mod router;

pub use router::IntervalRouter;
