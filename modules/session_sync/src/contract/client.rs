use async_trait::async_trait;
use tokio::sync::watch;

use crate::contract::{
    error::SessionSyncError,
    model::{ProfilePatch, SessionState},
};

/// Public API for UI-side consumers: read session/profile state and invoke
/// the session operations.
#[async_trait]
pub trait SessionSyncApi: Send + Sync {
    /// Current state snapshot.
    fn state(&self) -> SessionState;

    /// Receiver that wakes on every state change.
    fn watch(&self) -> watch::Receiver<SessionState>;

    /// Wait until the first resolution cycle completed.
    async fn wait_until_loaded(&self) -> SessionState;

    /// Request a passwordless sign-in email.
    async fn sign_in_with_email(&self, email: &str) -> Result<(), SessionSyncError>;

    /// Complete the email flow with the one-time code from the email.
    async fn verify_email_otp(&self, email: &str, token: &str) -> Result<(), SessionSyncError>;

    /// Request a throwaway anonymous identity.
    async fn sign_in_anonymously(&self) -> Result<(), SessionSyncError>;

    /// Invalidate the current session.
    async fn sign_out(&self) -> Result<(), SessionSyncError>;

    /// Optimistically apply `patch` and persist it.
    async fn update_profile(&self, patch: ProfilePatch) -> Result<(), SessionSyncError>;
}
