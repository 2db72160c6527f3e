/// Kline query entry point
/// Usage: klinegate <code> <from> <to> [interval]
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{error, info};

use klinegate::{
    config::load_config,
    data::{JsonlBarStore, StoreKind},
    time::SessionAligner,
    utils::{init_logging, to_views},
    IntervalRouter, KlineRequest,
};

fn parse_request(args: &[String]) -> anyhow::Result<KlineRequest> {
    if args.len() < 3 || args.len() > 4 {
        bail!("usage: klinegate <code> <from> <to> [interval]");
    }

    let from = args[1]
        .parse::<i64>()
        .with_context(|| format!("Invalid 'from' parameter: {}", args[1]))?;
    let to = args[2]
        .parse::<i64>()
        .with_context(|| format!("Invalid 'to' parameter: {}", args[2]))?;

    Ok(KlineRequest {
        code: args[0].clone(),
        from,
        to,
        interval: args.get(3).cloned(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

    // Configuration errors are fatal before any query runs
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;
    init_logging(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let request = parse_request(&args)?;
    let range = request.validate()?;

    // Daily dates are ranged on the exchange calendar
    let exchange_tz = SessionAligner::from_config(&config.exchange)?.timezone();
    let minute_store = Arc::new(JsonlBarStore::new(StoreKind::Minute, &config.stores.minute_dir));
    let daily_store = Arc::new(
        JsonlBarStore::new(StoreKind::Daily, &config.stores.daily_dir).with_anchor_timezone(exchange_tz),
    );
    let router = IntervalRouter::from_config(&config, minute_store, daily_store)?;

    info!(
        "Querying {} interval={:?} from={} to={}",
        request.code,
        request.interval_token(),
        request.from,
        request.to
    );

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let bars = match router
        .resolve_until(&request.code, request.interval_token(), range, cancel)
        .await
    {
        Ok(bars) => bars,
        Err(e) => {
            error!("Query failed: {} ({})", e, e.error_code());
            return Err(e.into());
        }
    };

    info!("Resolved {} bars", bars.len());

    let views = to_views(&bars, router.aligner().timezone());
    println!("{}", serde_json::to_string_pretty(&views)?);

    Ok(())
}
