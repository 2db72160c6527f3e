/// Show the configured exchange's session start for epoch timestamps
/// Usage: cargo run --bin show_session_start -- <epoch_secs>...
use anyhow::Context;
use tracing::warn;

use klinegate::config::load_config;
use klinegate::time::SessionAligner;
use klinegate::utils::init_logging;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;
    init_logging(&config);

    let aligner = SessionAligner::from_config(&config.exchange)?;
    let tz = aligner.timezone();

    println!("Exchange timezone: {}  session open: {}", tz, aligner.session_open());

    for arg in std::env::args().skip(1) {
        let Ok(secs) = arg.parse::<i64>() else {
            warn!("Skipping non-numeric timestamp: {}", arg);
            continue;
        };
        let Some(start) = aligner.align_epoch_secs(secs) else {
            warn!("Timestamp out of range: {}", secs);
            continue;
        };
        let local = chrono::DateTime::from_timestamp(start, 0)
            .map(|t| t.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z").to_string())
            .unwrap_or_default();
        println!("{} -> {} ({})", secs, start, local);
    }

    Ok(())
}
