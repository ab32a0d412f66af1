use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::contract::model::{AuthEvent, Session};

/// Identity provider port.
///
/// Session changes caused by the request methods are not returned directly;
/// they are delivered to subscribers as [`AuthEvent`]s.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Current session snapshot, if any.
    async fn current_session(&self) -> anyhow::Result<Option<Session>>;

    /// Subscribe to session-change events. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// Send a passwordless sign-in email (magic link plus one-time code).
    async fn sign_in_with_otp(&self, email: &str) -> anyhow::Result<()>;

    /// Exchange the emailed one-time code for a session.
    async fn verify_email_otp(&self, email: &str, token: &str) -> anyhow::Result<()>;

    /// Create a throwaway anonymous identity.
    async fn sign_in_anonymously(&self) -> anyhow::Result<()>;

    /// Invalidate the current session.
    async fn sign_out(&self) -> anyhow::Result<()>;
}
