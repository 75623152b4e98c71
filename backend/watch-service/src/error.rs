use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::session::RegistrationRejection;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("registration rejected: {0}")]
    Registration(#[from] RegistrationRejection),

    #[error("unauthorized")]
    Unauthorized,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("session closed")]
    SessionClosed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Store(e) => e.is_transient(),
            AppError::Internal(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_store_errors_are_retryable_when_transient() {
        let err = AppError::from(StoreError::Timeout(Duration::from_secs(1)));
        assert!(err.is_retryable());

        let err = AppError::from(StoreError::Decode("bad json".into()));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_registration_rejection_message_is_preserved() {
        let err = AppError::from(RegistrationRejection::InvalidEmail);
        assert_eq!(
            err.to_string(),
            "registration rejected: Please enter a valid email address"
        );
        assert!(!err.is_retryable());
    }
}
