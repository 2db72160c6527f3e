/// Configuration loading from TOML file
use std::path::Path;

use crate::error::{KlineError, Result};
use crate::time::SessionAligner;
use crate::types::Config;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| KlineError::ConfigError(format!("Failed to read config file: {}", e)))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)
        .map_err(|e| KlineError::ConfigError(format!("Failed to parse config: {}", e)))?;

    // Validate config
    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    // Timezone and session open must resolve before any request is served
    SessionAligner::from_config(&config.exchange)?;

    if config.stores.minute_dir.as_os_str().is_empty() {
        return Err(KlineError::ConfigError("stores.minute_dir is empty".to_string()));
    }

    if config.stores.daily_dir.as_os_str().is_empty() {
        return Err(KlineError::ConfigError("stores.daily_dir is empty".to_string()));
    }

    if config.log_level.trim().is_empty() {
        return Err(KlineError::ConfigError("log_level is empty".to_string()));
    }

    Ok(())
}
