use core_catalog::CatalogError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transfer error: {0}")]
    Transport(String),

    #[error("Download not found for content {0}")]
    NotFound(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Invalid download configuration: {0}")]
    Config(String),

    #[error("Download manager not initialized")]
    NotInitialized,

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl DownloadError {
    /// Storage error from an I/O failure with context.
    pub fn storage(context: &str, err: std::io::Error) -> Self {
        DownloadError::Storage(format!("{}: {}", context, err))
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;
