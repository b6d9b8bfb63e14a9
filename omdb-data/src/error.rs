use thiserror::Error;

/// Errors surfaced by the data layer, classified by origin.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// Local storage failed to read or write
    #[error("Storage error: {0}")]
    Storage(String),

    /// The remote movie API was unreachable or answered with an error
    #[error("Fetch error: {0}")]
    Fetch(String),
}

impl DataError {
    pub fn is_storage(&self) -> bool {
        matches!(self, DataError::Storage(_))
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, DataError::Fetch(_))
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        DataError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        // request URLs carry the API key
        DataError::Fetch(err.without_url().to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
