use thiserror::Error;

pub type AffiliateResult<T> = Result<T, AffiliateError>;

#[derive(Error, Debug)]
pub enum AffiliateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid status transition: {0}")]
    Transition(String),

    #[error("Monthly cap exceeded: {0}")]
    CapExceeded(String),

    #[error("Claim error: {0}")]
    Claim(String),

    #[error("CSV import error: {0}")]
    Csv(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
