use thiserror::Error;

/// Errors that are safe to expose to consumers of the session API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionSyncError {
    /// Sign-in/sign-out request rejected or failed in transit.
    #[error("Authentication request failed: {message}")]
    AuthRequest { message: String },

    /// Profile upsert failed after the optimistic local update was applied.
    #[error("Profile could not be saved: {message}")]
    ProfilePersist { message: String },

    #[error("Internal error")]
    Internal,
}

impl SessionSyncError {
    pub fn auth_request(message: impl Into<String>) -> Self {
        Self::AuthRequest {
            message: message.into(),
        }
    }

    pub fn profile_persist(message: impl Into<String>) -> Self {
        Self::ProfilePersist {
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::Internal
    }
}

impl From<crate::domain::error::DomainError> for SessionSyncError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            AuthRequest { operation, message } => {
                Self::auth_request(format!("{operation}: {message}"))
            }
            ProfilePersist { message, .. } => Self::profile_persist(message),
            ProfileFetch { .. } => Self::internal(),
        }
    }
}
