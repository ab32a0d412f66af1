use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for the session_sync module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSyncConfig {
    /// Project URL, e.g. `https://<ref>.supabase.co`.
    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_anon_key: String,
    #[serde(default = "default_profiles_table")]
    pub profiles_table: String,
    /// Where the magic link in the sign-in email points.
    #[serde(default)]
    pub email_redirect_to: Option<String>,
    #[serde(default = "default_auto_refresh")]
    pub auto_refresh: bool,
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,
}

impl Default for SessionSyncConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            profiles_table: default_profiles_table(),
            email_redirect_to: None,
            auto_refresh: default_auto_refresh(),
            refresh_margin_secs: default_refresh_margin_secs(),
        }
    }
}

impl SessionSyncConfig {
    /// Check required settings and return the parsed project URL.
    pub fn validate(&self) -> Result<Url> {
        if self.supabase_url.trim().is_empty() {
            bail!("session_sync.supabase_url is not set");
        }
        if self.supabase_anon_key.trim().is_empty() {
            bail!("session_sync.supabase_anon_key is not set");
        }
        if self.profiles_table.trim().is_empty() || self.profiles_table.contains('/') {
            bail!(
                "session_sync.profiles_table '{}' is not a table name",
                self.profiles_table
            );
        }
        let url = Url::parse(self.supabase_url.trim())
            .with_context(|| format!("invalid session_sync.supabase_url '{}'", self.supabase_url))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            bail!("session_sync.supabase_url must be an http(s) URL");
        }
        Ok(url)
    }
}

fn default_profiles_table() -> String {
    "profiles".to_string()
}

fn default_auto_refresh() -> bool {
    true
}

fn default_refresh_margin_secs() -> u64 {
    60
}
