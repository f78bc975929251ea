use crate::claim::ClaimError;
use jsonrpsee::types::{ErrorObject, ErrorObjectOwned};
use snapjob::{CoreError, IdentityError, PolicyDenied, TransitionDenied};
use thiserror::Error;
use tracing::error;

/// Application error codes carried on the RPC boundary.
pub mod codes {
    pub const INTERNAL: i32 = -32000;
    pub const NOT_FOUND: i32 = -32001;
    pub const VALIDATION: i32 = -32002;
    pub const DENIED: i32 = -32003;
    pub const CONFLICT: i32 = -32004;
    pub const UNAUTHENTICATED: i32 = -32005;
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
    #[error("could not build a capability url")]
    Blob(#[from] url::ParseError),
}

impl From<PolicyDenied> for ServiceError {
    fn from(denied: PolicyDenied) -> Self {
        ServiceError::Core(denied.into())
    }
}

impl From<TransitionDenied> for ServiceError {
    fn from(denied: TransitionDenied) -> Self {
        ServiceError::Core(denied.into())
    }
}

impl From<IdentityError> for ServiceError {
    fn from(err: IdentityError) -> Self {
        ServiceError::Core(err.into())
    }
}

impl From<ServiceError> for ErrorObjectOwned {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Core(CoreError::Validation(fields)) => {
                ErrorObject::owned(codes::VALIDATION, "validation failed", Some(fields))
            }
            ServiceError::Core(CoreError::Authentication) => ErrorObject::owned(
                codes::UNAUTHENTICATED,
                "caller identity could not be established",
                None::<()>,
            ),
            ServiceError::Core(CoreError::Authorization(message)) => {
                ErrorObject::owned(codes::DENIED, message, None::<()>)
            }
            ServiceError::Core(err @ CoreError::NotFound(_)) => {
                ErrorObject::owned(codes::NOT_FOUND, err.to_string(), None::<()>)
            }
            ServiceError::Core(CoreError::StateConflict(message)) => {
                ErrorObject::owned(codes::CONFLICT, message, None::<()>)
            }
            ServiceError::Storage(err) => {
                error!("storage failure: {}", err);
                ErrorObject::owned(codes::INTERNAL, "internal error", None::<()>)
            }
            ServiceError::Blob(err) => {
                error!("capability url failure: {}", err);
                ErrorObject::owned(codes::INTERNAL, "internal error", None::<()>)
            }
        }
    }
}

impl From<ClaimError> for ErrorObjectOwned {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::InvalidToken
            | ClaimError::TokenJobMismatch
            | ClaimError::JobNotAvailable
            | ClaimError::AlreadyAssigned => {
                ErrorObject::owned(codes::CONFLICT, err.to_string(), None::<()>)
            }
            ClaimError::Storage(storage) => {
                error!("storage failure during claim: {}", storage);
                ErrorObject::owned(codes::INTERNAL, "internal error", None::<()>)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn race_losses_surface_as_state_conflicts() {
        let obj: ErrorObjectOwned = ClaimError::AlreadyAssigned.into();
        assert_eq!(obj.code(), codes::CONFLICT);
        assert_eq!(obj.message(), "job already assigned");
    }

    #[test]
    fn storage_details_never_reach_the_wire() {
        let obj: ErrorObjectOwned = ServiceError::Storage(sqlx::Error::PoolClosed).into();
        assert_eq!(obj.code(), codes::INTERNAL);
        assert_eq!(obj.message(), "internal error");
    }

    #[test]
    fn validation_carries_the_field_list() {
        let err = ServiceError::Core(CoreError::Validation(vec![snapjob::FieldError::new(
            "title",
            "must not be empty",
        )]));
        let obj: ErrorObjectOwned = err.into();
        assert_eq!(obj.code(), codes::VALIDATION);
        assert!(obj.data().is_some());
    }
}
