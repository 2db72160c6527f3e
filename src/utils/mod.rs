pub mod format;
pub mod logging;

pub use format::{to_views, KlineView};
pub use logging::init_logging;
