use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Identity attached to an active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    /// Absent for anonymous identities.
    pub email: Option<String>,
    pub is_anonymous: bool,
}

/// Credential bundle issued by the auth provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// True when the session expires within `margin` of `now` (or already has).
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp - margin <= now)
    }
}

// Tokens never reach logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// User-editable display metadata, keyed by `User::id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub avatar_url: Option<String>,
    pub job_title: Option<String>,
}

impl Profile {
    /// Fallback used when no profile row exists yet for `user`.
    pub fn default_for(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            ..Self::default()
        }
    }

    /// Overwrite every field that is set on `patch`.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        let ProfilePatch {
            name,
            email,
            company_name,
            avatar_url,
            job_title,
        } = patch;
        for (slot, value) in [
            (&mut self.name, name),
            (&mut self.email, email),
            (&mut self.company_name, company_name),
            (&mut self.avatar_url, avatar_url),
            (&mut self.job_title, job_title),
        ] {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }
    }

    /// Name shown in the sidebar: name, else email, else "Anonymous".
    pub fn display_name(&self) -> &str {
        [&self.name, &self.email]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("Anonymous")
    }

    /// Up to two uppercase initials for the avatar placeholder.
    pub fn initials(&self) -> String {
        let source = self.display_name();
        let source = source.split('@').next().unwrap_or(source);
        source
            .split(|c: char| c.is_whitespace() || c == '.' || c == '_' || c == '-')
            .filter_map(|word| word.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// Partial profile update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub avatar_url: Option<String>,
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Session-change notification delivered by the auth client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthChangeKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn new(kind: AuthChangeKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }

    pub fn signed_out() -> Self {
        Self::new(AuthChangeKind::SignedOut, None)
    }
}

/// What consumers observe. Written only by the session controller.
///
/// While `loading` is true, `user` and `profile` are not settled yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub session: Option<Session>,
    pub user: Option<User>,
    pub profile: Option<Profile>,
    pub loading: bool,
    /// Bumped by every write that invalidates an in-flight profile fetch.
    pub(crate) profile_epoch: u64,
}

impl SessionState {
    /// State before the first resolution cycle completes.
    pub fn initial() -> Self {
        Self {
            session: None,
            user: None,
            profile: None,
            loading: true,
            profile_epoch: 0,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}
