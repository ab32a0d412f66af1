use thiserror::Error;

/// Failures raised by the session controller. Auth and persist errors go back
/// to the caller of the operation; fetch errors are absorbed into a default
/// profile.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Auth request '{operation}' failed: {message}")]
    AuthRequest {
        operation: &'static str,
        message: String,
    },

    /// Never surfaced to consumers; downgraded to a default profile.
    #[error("Profile lookup for user {user_id} failed: {message}")]
    ProfileFetch { user_id: String, message: String },

    #[error("Profile save for user {user_id} failed: {message}")]
    ProfilePersist { user_id: String, message: String },
}

impl DomainError {
    pub fn auth_request(operation: &'static str, source: &anyhow::Error) -> Self {
        Self::AuthRequest {
            operation,
            message: format!("{source:#}"),
        }
    }

    pub fn profile_fetch(user_id: impl Into<String>, source: &anyhow::Error) -> Self {
        Self::ProfileFetch {
            user_id: user_id.into(),
            message: format!("{source:#}"),
        }
    }

    pub fn profile_persist(user_id: impl Into<String>, source: &anyhow::Error) -> Self {
        Self::ProfilePersist {
            user_id: user_id.into(),
            message: format!("{source:#}"),
        }
    }
}
