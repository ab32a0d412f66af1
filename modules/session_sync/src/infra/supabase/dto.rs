//! Wire shapes of the GoTrue and PostgREST APIs and their mapping to
//! contract models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::contract::model::{Profile, ProfilePatch, Session, User};

/// Columns read back from the profiles table.
pub(super) const PROFILE_COLUMNS: &str = "name,email,company_name,avatar_url,job_title";

#[derive(Debug, Deserialize)]
pub(super) struct GoTrueUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// Session payload returned by `/verify`, `/signup` and `/token`.
#[derive(Debug, Deserialize)]
pub(super) struct GoTrueSession {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: GoTrueUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl From<GoTrueUser> for User {
    fn from(u: GoTrueUser) -> Self {
        Self {
            id: u.id,
            // GoTrue reports anonymous users with an empty email.
            email: u.email.filter(|e| !e.trim().is_empty()),
            is_anonymous: u.is_anonymous,
        }
    }
}

impl GoTrueSession {
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            token_type: self.token_type,
            expires_at,
            user: self.user.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct OtpRequest<'a> {
    pub email: &'a str,
    pub create_user: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct VerifyRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub email: &'a str,
    pub token: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// A profiles row as stored; every column nullable.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ProfileRow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(r: ProfileRow) -> Self {
        Self {
            name: r.name,
            email: r.email,
            company_name: r.company_name,
            avatar_url: r.avatar_url,
            job_title: r.job_title,
        }
    }
}

/// Upsert body: the key plus only the columns the patch sets.
#[derive(Debug, Serialize)]
pub(super) struct ProfileUpsertRow<'a> {
    pub id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<&'a str>,
}

impl<'a> ProfileUpsertRow<'a> {
    pub fn new(id: &'a str, patch: &'a ProfilePatch) -> Self {
        Self {
            id,
            name: patch.name.as_deref(),
            email: patch.email.as_deref(),
            company_name: patch.company_name.as_deref(),
            avatar_url: patch.avatar_url.as_deref(),
            job_title: patch.job_title.as_deref(),
        }
    }
}
