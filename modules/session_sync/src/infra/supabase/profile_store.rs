use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

use runtime::TracedClient;

use super::dto::{ProfileRow, ProfileUpsertRow, PROFILE_COLUMNS};
use super::http::{endpoint, ensure_success};
use crate::contract::model::{Profile, ProfilePatch};
use crate::domain::ports::ProfileStore;

/// Supplies the bearer token for row-level-security checks.
pub trait AccessTokenSource: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

/// PostgREST-backed profile table.
pub struct SupabaseProfileStore {
    http: TracedClient,
    api_url: Url,
    anon_key: String,
    table: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl SupabaseProfileStore {
    pub fn new(
        http: TracedClient,
        api_url: Url,
        anon_key: impl Into<String>,
        table: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            http,
            api_url,
            anon_key: anon_key.into(),
            table: table.into(),
            tokens,
        }
    }

    fn table_url(&self) -> Result<Url> {
        endpoint(&self.api_url, &["rest", "v1", &self.table])
    }

    /// Signed-in requests run as the user; otherwise as the anon role.
    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self
            .tokens
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());
        request.header("apikey", &self.anon_key).bearer_auth(bearer)
    }
}

#[async_trait]
impl ProfileStore for SupabaseProfileStore {
    #[instrument(
        name = "session_sync.supabase.find_profile",
        skip(self),
        fields(table = %self.table)
    )]
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Profile>> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{user_id}"))
            .append_pair("select", PROFILE_COLUMNS)
            .append_pair("limit", "1");

        let request = self.authorized(
            self.http
                .request(reqwest::Method::GET, url.as_str())
                .header("Accept", "application/json"),
        );
        let response = self
            .http
            .send(request)
            .await
            .context("profile lookup: request failed")?;
        let response = ensure_success(response, "profile lookup").await?;

        let rows: Vec<ProfileRow> = response
            .json()
            .await
            .context("profile lookup: malformed response")?;
        let found = rows.into_iter().next().map(Profile::from);
        debug!(found = found.is_some(), "profile lookup done");
        Ok(found)
    }

    #[instrument(
        name = "session_sync.supabase.upsert_profile",
        skip(self, patch),
        fields(table = %self.table)
    )]
    async fn upsert(&self, user_id: &str, patch: &ProfilePatch) -> Result<()> {
        let request = self.authorized(
            self.http
                .request(reqwest::Method::POST, self.table_url()?.as_str())
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&ProfileUpsertRow::new(user_id, patch)),
        );
        let response = self
            .http
            .send(request)
            .await
            .context("profile upsert: request failed")?;
        ensure_success(response, "profile upsert").await?;
        Ok(())
    }
}
