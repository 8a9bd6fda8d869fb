use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Remote catalog unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid request: {field} - {message}")]
    InvalidRequest { field: String, message: String },

    #[error("Failed to decode catalog response: {0}")]
    Decode(String),
}

impl CatalogError {
    /// Returns `true` if the operation may succeed when retried by the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CatalogError::RemoteUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
