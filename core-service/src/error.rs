use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Service initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] core_catalog::CatalogError),

    #[error("Download error: {0}")]
    Download(#[from] core_downloads::DownloadError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
