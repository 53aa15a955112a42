use thiserror::Error;

pub type Result<T, E = ShoeboxError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum ShoeboxError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("metadata error: {0}")]
    Metadata(String),
    #[error("telemetry error: {0}")]
    Telemetry(String),
    #[error("geocode error: {0}")]
    Geocode(String),
    #[error("prompt error: {0}")]
    Prompt(String),
    #[error("resolver error: {0}")]
    Resolve(String),
    #[error("dispatch error: {0}")]
    Dispatch(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
