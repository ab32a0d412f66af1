use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use crate::contract::{
    client::SessionSyncApi,
    error::SessionSyncError,
    model::{ProfilePatch, SessionState},
};
use crate::domain::service::SessionController;

/// In-process implementation of [`SessionSyncApi`] backed by the controller.
pub struct SessionSyncLocalClient {
    controller: Arc<SessionController>,
}

impl SessionSyncLocalClient {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl SessionSyncApi for SessionSyncLocalClient {
    fn state(&self) -> SessionState {
        self.controller.state()
    }

    fn watch(&self) -> watch::Receiver<SessionState> {
        self.controller.watch()
    }

    async fn wait_until_loaded(&self) -> SessionState {
        self.controller.wait_until_loaded().await
    }

    async fn sign_in_with_email(&self, email: &str) -> Result<(), SessionSyncError> {
        self.controller
            .sign_in_with_email(email)
            .await
            .map_err(Into::into)
    }

    async fn verify_email_otp(&self, email: &str, token: &str) -> Result<(), SessionSyncError> {
        self.controller
            .verify_email_otp(email, token)
            .await
            .map_err(Into::into)
    }

    async fn sign_in_anonymously(&self) -> Result<(), SessionSyncError> {
        self.controller
            .sign_in_anonymously()
            .await
            .map_err(Into::into)
    }

    async fn sign_out(&self) -> Result<(), SessionSyncError> {
        self.controller.sign_out().await.map_err(Into::into)
    }

    async fn update_profile(&self, patch: ProfilePatch) -> Result<(), SessionSyncError> {
        self.controller
            .update_profile(patch)
            .await
            .map_err(Into::into)
    }
}
