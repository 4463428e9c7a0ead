#[macro_use]
mod macros;

pub mod booking;
pub mod catalog;
pub mod flight;
pub mod notify;
pub mod reference;
pub mod repository;
pub mod search;

use serde::Serialize;

/// One failed rule in a request, reported back to the caller as part of a detail list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<FieldError>,
    },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl CoreError {
    pub fn validation(details: Vec<FieldError>) -> Self {
        Self::Validation {
            message: "Validation failed".to_string(),
            details,
        }
    }
}

impl From<repository::RepoError> for CoreError {
    fn from(err: repository::RepoError) -> Self {
        match err {
            repository::RepoError::InUse(what) => {
                CoreError::BadRequest(format!("{} is still referenced and cannot be removed", what))
            }
            repository::RepoError::Duplicate(what) => {
                CoreError::BadRequest(format!("{} already exists", what))
            }
            repository::RepoError::Invalid(message) => CoreError::BadRequest(message),
            repository::RepoError::Backend(e) => CoreError::InternalError(e.to_string()),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
