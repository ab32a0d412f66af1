use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use runtime::TracedClient;

use crate::config::SessionSyncConfig;
use crate::contract::client::SessionSyncApi;
use crate::domain::service::SessionController;
use crate::gateways::local::SessionSyncLocalClient;
use crate::infra::supabase::{SupabaseAuthClient, SupabaseProfileStore};

/// Wired session_sync module: Supabase adapters, the controller and the
/// optional token refresh task.
pub struct SessionSync {
    controller: Arc<SessionController>,
    auth: Arc<SupabaseAuthClient>,
    api: Arc<dyn SessionSyncApi>,
    refresh_cancel: CancellationToken,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionSync {
    /// Build the adapters from `cfg` and start the controller.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(cfg: &SessionSyncConfig, http: TracedClient) -> Result<Self> {
        info!("Initializing session_sync module");
        let api_url = cfg.validate()?;
        debug!(
            "Loaded session_sync config: url={}, table={}, auto_refresh={}",
            api_url, cfg.profiles_table, cfg.auto_refresh
        );

        let auth = Arc::new(SupabaseAuthClient::new(
            http.clone(),
            api_url.clone(),
            cfg.supabase_anon_key.clone(),
            cfg.email_redirect_to.clone(),
        ));
        let profiles = Arc::new(SupabaseProfileStore::new(
            http,
            api_url,
            cfg.supabase_anon_key.clone(),
            cfg.profiles_table.clone(),
            auth.clone(),
        ));

        let controller = Arc::new(SessionController::start(auth.clone(), profiles));
        let api: Arc<dyn SessionSyncApi> =
            Arc::new(SessionSyncLocalClient::new(controller.clone()));

        let refresh_cancel = CancellationToken::new();
        let refresh_task = cfg.auto_refresh.then(|| {
            tokio::spawn(auth.clone().run_auto_refresh(
                Duration::from_secs(cfg.refresh_margin_secs),
                refresh_cancel.clone(),
            ))
        });

        info!("session_sync module started");
        Ok(Self {
            controller,
            auth,
            api,
            refresh_cancel,
            refresh_task: Mutex::new(refresh_task),
        })
    }

    pub fn client(&self) -> Arc<dyn SessionSyncApi> {
        self.api.clone()
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    pub fn auth(&self) -> &Arc<SupabaseAuthClient> {
        &self.auth
    }

    /// Stop the refresh task and the controller. Idempotent.
    pub async fn stop(&self) {
        self.refresh_cancel.cancel();
        let task = self.refresh_task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        self.controller.shutdown().await;
        info!("session_sync module stopped");
    }
}

impl Drop for SessionSync {
    fn drop(&mut self) {
        self.refresh_cancel.cancel();
    }
}
