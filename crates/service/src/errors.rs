use thiserror::Error;

/// Business and infrastructure errors raised by the account and rating stores.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("invalid username or password")]
    Unauthorized,
    #[error("{0}")]
    PermissionDenied(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("hashing error: {0}")]
    Hash(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

    pub fn conflict(msg: impl Into<String>) -> Self { Self::Conflict(msg.into()) }

    pub fn storage(e: impl std::fmt::Display) -> Self { Self::Storage(e.to_string()) }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 1001,
            ServiceError::Conflict(_) => 1002,
            ServiceError::Unauthorized => 1004,
            ServiceError::PermissionDenied(_) => 1005,
            ServiceError::Hash(_) => 1101,
            ServiceError::Storage(_) => 1200,
        }
    }

    /// True for failures caused by the caller's input rather than the process.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ServiceError::Storage(_) | ServiceError::Hash(_))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self { Self::Storage(e.to_string()) }
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self { Self::Storage(e.to_string()) }
}
