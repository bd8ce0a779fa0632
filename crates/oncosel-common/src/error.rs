use thiserror::Error;

#[derive(Debug, Error)]
pub enum OncoselError {
    #[error("All sequence-scoring engines failed for variant {0}")]
    ScoringUnavailable(String),

    #[error("Evidence lookup timed out: {0}")]
    EvidenceTimeout(String),

    #[error("Evidence source unavailable: {0}")]
    EvidenceUnavailable(String),

    #[error("Insights endpoint unavailable: {0}")]
    InsightsEndpointUnavailable(String),

    #[error("Invalid variant: {0}")]
    InvalidVariant(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, OncoselError>;
