use thiserror::Error;
use uow_core::error::DomainError;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("failed to read config {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    ConfigFormat(#[from] serde_json::Error),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub type DemoResult<T> = Result<T, DemoError>;
