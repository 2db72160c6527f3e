pub mod types;
pub mod error;
pub mod config;
pub mod time;
pub mod data;
pub mod routing;
pub mod utils;

pub use types::*;
pub use error::{KlineError, Result};
pub use routing::IntervalRouter;
