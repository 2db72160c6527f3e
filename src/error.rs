/// Centralized error types for the kline gateway
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KlineError {
    // Upstream Store Errors
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Deserialization failed: {0}")]
    DeserializationError(#[from] serde_json::Error),

    // Request Errors
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, KlineError>;

impl KlineError {
    /// Error originated in a bar store (maps to "upstream unavailable")
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            KlineError::StoreUnavailable(_)
                | KlineError::FileError(_)
                | KlineError::DeserializationError(_)
        )
    }

    /// Error caused by caller input (maps to "bad request")
    pub fn is_bad_request(&self) -> bool {
        matches!(self, KlineError::InvalidParameter(_))
    }

    /// Error that must stop the process at startup
    pub fn is_fatal(&self) -> bool {
        matches!(self, KlineError::ConfigError(_))
    }

    /// Get error code for logging/monitoring
    pub fn error_code(&self) -> &str {
        match self {
            KlineError::StoreUnavailable(_) => "STORE_001",
            KlineError::FileError(_) => "STORE_002",
            KlineError::DeserializationError(_) => "STORE_003",
            KlineError::InvalidParameter(_) => "REQ_001",
            KlineError::Cancelled(_) => "REQ_002",
            KlineError::ConfigError(_) => "CFG_001",
        }
    }
}
