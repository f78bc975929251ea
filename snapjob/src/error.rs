use crate::identity::IdentityError;
use crate::policy::PolicyDenied;
use crate::status::TransitionDenied;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// The expected failure outcomes of every core operation. These are data,
/// not exceptional control flow; only storage-level surprises travel outside
/// this taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("caller identity could not be established")]
    Authentication,
    #[error("{0}")]
    Authorization(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    StateConflict(String),
}

impl From<PolicyDenied> for CoreError {
    fn from(denied: PolicyDenied) -> Self {
        CoreError::Authorization(denied.to_string())
    }
}

impl From<TransitionDenied> for CoreError {
    fn from(denied: TransitionDenied) -> Self {
        CoreError::StateConflict(denied.to_string())
    }
}

impl From<IdentityError> for CoreError {
    fn from(_: IdentityError) -> Self {
        CoreError::Authentication
    }
}
