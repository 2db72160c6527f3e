/// Tracing subscriber setup shared by the binaries
use tracing_subscriber::EnvFilter;

use crate::types::Config;

/// `RUST_LOG` wins over the configured level
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
