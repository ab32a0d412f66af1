use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use runtime::TracedClient;

use super::dto::{GoTrueSession, OtpRequest, RefreshRequest, VerifyRequest};
use super::http::{endpoint, ensure_success};
use super::profile_store::AccessTokenSource;
use crate::contract::model::{AuthChangeKind, AuthEvent, Session};
use crate::domain::ports::AuthClient;

const EVENT_BUFFER: usize = 16;
/// Re-check interval while no expiring session is held.
const IDLE_REFRESH_POLL: Duration = Duration::from_secs(30);
const REFRESH_RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// GoTrue-backed auth client. Holds the session in memory only and publishes
/// every change on a broadcast channel.
pub struct SupabaseAuthClient {
    http: TracedClient,
    api_url: Url,
    anon_key: String,
    email_redirect_to: Option<String>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

fn validate_email(email: &str) -> Result<&str> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        bail!("invalid email address '{email}'");
    }
    Ok(email)
}

impl SupabaseAuthClient {
    pub fn new(
        http: TracedClient,
        api_url: Url,
        anon_key: impl Into<String>,
        email_redirect_to: Option<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            http,
            api_url,
            anon_key: anon_key.into(),
            email_redirect_to,
            session: RwLock::new(None),
            events,
        }
    }

    fn auth_url(&self, path: &str) -> Result<Url> {
        endpoint(&self.api_url, &["auth", "v1", path])
    }

    /// POST a JSON body to a GoTrue endpoint; non-2xx becomes an error.
    async fn post_auth<B: serde::Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
        bearer: Option<&str>,
        what: &str,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .request(reqwest::Method::POST, url.as_str())
            .header("apikey", &self.anon_key)
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = self
            .http
            .send(request)
            .await
            .with_context(|| format!("{what}: request failed"))?;
        ensure_success(response, what).await
    }

    async fn read_session(response: reqwest::Response, what: &str) -> Result<Session> {
        let payload: GoTrueSession = response
            .json()
            .await
            .with_context(|| format!("{what}: malformed session payload"))?;
        Ok(payload.into_session(Utc::now()))
    }

    fn store_and_emit(&self, kind: AuthChangeKind, session: Option<Session>) {
        *self.session.write() = session.clone();
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(AuthEvent::new(kind, session));
        debug!(?kind, "auth state changed");
    }

    /// Exchange the stored refresh token for a new session.
    #[instrument(name = "session_sync.supabase.refresh_session", skip(self))]
    pub async fn refresh_session(&self) -> Result<Session> {
        let refresh_token = self
            .session
            .read()
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
            .context("no refresh token available")?;

        let mut url = self.auth_url("token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");

        let response = self
            .post_auth(
                url,
                &RefreshRequest {
                    refresh_token: &refresh_token,
                },
                None,
                "refresh session",
            )
            .await?;
        let session = Self::read_session(response, "refresh session").await?;
        self.store_and_emit(AuthChangeKind::TokenRefreshed, Some(session.clone()));
        info!("session refreshed");
        Ok(session)
    }

    /// Refresh the session shortly before it expires until `cancel` fires.
    pub async fn run_auto_refresh(self: Arc<Self>, margin: Duration, cancel: CancellationToken) {
        let margin_td = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::zero());
        loop {
            let expires_at = self.session.read().as_ref().and_then(|s| s.expires_at);
            let wait = match expires_at {
                Some(exp) => (exp - margin_td - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(IDLE_REFRESH_POLL),
                None => IDLE_REFRESH_POLL,
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            let due = self
                .session
                .read()
                .as_ref()
                .is_some_and(|s| s.expires_within(margin_td, Utc::now()));
            if !due {
                continue;
            }

            if let Err(e) = self.refresh_session().await {
                warn!(error = %format!("{e:#}"), "background refresh failed");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(REFRESH_RETRY_BACKOFF) => {}
                }
            }
        }
        debug!("auto refresh stopped");
    }
}

impl AccessTokenSource for SupabaseAuthClient {
    fn access_token(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.access_token.clone())
    }
}

#[async_trait]
impl AuthClient for SupabaseAuthClient {
    async fn current_session(&self) -> Result<Option<Session>> {
        let snapshot = self.session.read().clone();
        let Some(session) = snapshot else {
            return Ok(None);
        };
        if !session.is_expired_at(Utc::now()) {
            return Ok(Some(session));
        }

        match self.refresh_session().await {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "expired session could not be refreshed");
                self.store_and_emit(AuthChangeKind::SignedOut, None);
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    #[instrument(name = "session_sync.supabase.sign_in_with_otp", skip_all)]
    async fn sign_in_with_otp(&self, email: &str) -> Result<()> {
        let email = validate_email(email)?;
        let mut url = self.auth_url("otp")?;
        if let Some(redirect) = &self.email_redirect_to {
            url.query_pairs_mut().append_pair("redirect_to", redirect);
        }

        self.post_auth(
            url,
            &OtpRequest {
                email,
                create_user: true,
            },
            None,
            "send sign-in email",
        )
        .await?;
        Ok(())
    }

    #[instrument(name = "session_sync.supabase.verify_email_otp", skip_all)]
    async fn verify_email_otp(&self, email: &str, token: &str) -> Result<()> {
        let email = validate_email(email)?;
        let token = token.trim();
        if token.is_empty() {
            bail!("verification code is empty");
        }

        let response = self
            .post_auth(
                self.auth_url("verify")?,
                &VerifyRequest {
                    kind: "email",
                    email,
                    token,
                },
                None,
                "verify email code",
            )
            .await?;
        let session = Self::read_session(response, "verify email code").await?;
        self.store_and_emit(AuthChangeKind::SignedIn, Some(session));
        Ok(())
    }

    #[instrument(name = "session_sync.supabase.sign_in_anonymously", skip_all)]
    async fn sign_in_anonymously(&self) -> Result<()> {
        let response = self
            .post_auth(
                self.auth_url("signup")?,
                &serde_json::json!({}),
                None,
                "anonymous sign-in",
            )
            .await?;
        let session = Self::read_session(response, "anonymous sign-in").await?;
        self.store_and_emit(AuthChangeKind::SignedIn, Some(session));
        Ok(())
    }

    #[instrument(name = "session_sync.supabase.sign_out", skip_all)]
    async fn sign_out(&self) -> Result<()> {
        let token = self.access_token();
        let Some(token) = token else {
            self.store_and_emit(AuthChangeKind::SignedOut, None);
            return Ok(());
        };

        let request = self
            .http
            .request(reqwest::Method::POST, self.auth_url("logout")?.as_str())
            .header("apikey", &self.anon_key)
            .bearer_auth(&token);
        let response = self
            .http
            .send(request)
            .await
            .context("sign out: request failed")?;

        // 401/404: the session is already gone server-side.
        let status = response.status();
        if !matches!(status.as_u16(), 401 | 404) {
            ensure_success(response, "sign out").await?;
        }

        self.store_and_emit(AuthChangeKind::SignedOut, None);
        Ok(())
    }
}
