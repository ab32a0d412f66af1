use async_trait::async_trait;

use crate::contract::model::{Profile, ProfilePatch};

/// Persistence port for profile records keyed by user id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Point lookup. `Ok(None)` means no record exists yet.
    async fn find_by_user_id(&self, user_id: &str) -> anyhow::Result<Option<Profile>>;

    /// Insert or merge the fields set on `patch`.
    async fn upsert(&self, user_id: &str, patch: &ProfilePatch) -> anyhow::Result<()>;
}
