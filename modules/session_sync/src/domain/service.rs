use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::contract::model::{AuthEvent, Profile, ProfilePatch, Session, SessionState};
use crate::domain::error::DomainError;
use crate::domain::ports::{AuthClient, ProfileStore};

/// Single source of truth for the signed-in user and their profile.
///
/// A background worker owns the auth event subscription and resolves the
/// initial snapshot plus every session-change event, one at a time, into
/// [`SessionState`]. Consumers read that state through [`Self::watch`] and
/// mutate it only through the operations below.
///
/// Must be started inside a Tokio runtime. The subscription is released by
/// [`Self::shutdown`] or when the controller is dropped.
pub struct SessionController {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    auth: Arc<dyn AuthClient>,
    profiles: Arc<dyn ProfileStore>,
    state: watch::Sender<SessionState>,
}

impl SessionController {
    /// Subscribe to auth events, then spawn the worker that resolves the
    /// initial session and every later change.
    pub fn start(auth: Arc<dyn AuthClient>, profiles: Arc<dyn ProfileStore>) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        let shared = Arc::new(Shared {
            auth,
            profiles,
            state,
        });

        // Subscribe before the snapshot so nothing emitted in between is lost.
        let events = shared.auth.subscribe();
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(
            run_worker(shared.clone(), events, cancel.clone()).in_current_span(),
        );
        info!("session controller started");

        Self {
            shared,
            cancel,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub async fn wait_until_loaded(&self) -> SessionState {
        let mut rx = self.shared.state.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let loaded = rx.wait_for(|s| !s.loading).await.map(|s| s.clone());
        loaded.unwrap_or_else(|_| self.state())
    }

    /// True while the event worker is alive.
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    #[instrument(name = "session_sync.controller.sign_in_with_email", skip(self, email))]
    pub async fn sign_in_with_email(&self, email: &str) -> Result<(), DomainError> {
        self.shared
            .auth
            .sign_in_with_otp(email)
            .await
            .map_err(|e| DomainError::auth_request("sign_in_with_email", &e))?;
        info!("sign-in email requested");
        Ok(())
    }

    #[instrument(name = "session_sync.controller.verify_email_otp", skip_all)]
    pub async fn verify_email_otp(&self, email: &str, token: &str) -> Result<(), DomainError> {
        self.shared
            .auth
            .verify_email_otp(email, token)
            .await
            .map_err(|e| DomainError::auth_request("verify_email_otp", &e))?;
        info!("email code accepted");
        Ok(())
    }

    #[instrument(name = "session_sync.controller.sign_in_anonymously", skip(self))]
    pub async fn sign_in_anonymously(&self) -> Result<(), DomainError> {
        self.shared
            .auth
            .sign_in_anonymously()
            .await
            .map_err(|e| DomainError::auth_request("sign_in_anonymously", &e))?;
        info!("anonymous sign-in accepted");
        Ok(())
    }

    /// On success the profile is cleared right away; the `SignedOut` event
    /// that follows clears the user. On failure nothing changes.
    #[instrument(name = "session_sync.controller.sign_out", skip(self))]
    pub async fn sign_out(&self) -> Result<(), DomainError> {
        self.shared
            .auth
            .sign_out()
            .await
            .map_err(|e| DomainError::auth_request("sign_out", &e))?;

        self.shared.state.send_modify(|s| {
            s.profile = None;
            s.profile_epoch += 1;
        });
        info!("signed out");
        Ok(())
    }

    /// Apply `patch` locally, then persist it.
    ///
    /// No-op without an active user. A failed upsert is returned to the
    /// caller and the local value is kept as is.
    #[instrument(name = "session_sync.controller.update_profile", skip(self, patch))]
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<(), DomainError> {
        let mut target = None;
        self.shared.state.send_if_modified(|s| {
            let Some(user) = s.user.as_ref() else {
                return false;
            };
            s.profile
                .get_or_insert_with(|| Profile::default_for(user))
                .apply(&patch);
            s.profile_epoch += 1;
            target = Some(user.id.clone());
            true
        });

        let Some(user_id) = target else {
            debug!("no active user; profile update ignored");
            return Ok(());
        };

        if let Err(e) = self.shared.profiles.upsert(&user_id, &patch).await {
            let err = DomainError::profile_persist(&user_id, &e);
            error!(error = %err, "profile upsert failed; keeping local value");
            return Err(err);
        }

        debug!(user_id = %user_id, "profile persisted");
        Ok(())
    }

    /// Stop the worker and release the auth subscription. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    error!("session worker panicked: {e}");
                }
            }
            info!("session controller stopped");
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Shared {
    async fn load_snapshot(&self) -> Option<Session> {
        match self.auth.current_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "session snapshot failed; treating as signed out");
                None
            }
        }
    }

    /// Drive one session value into state. Loading is reported false only
    /// after the profile for this cycle is settled.
    #[instrument(name = "session_sync.controller.resolve", skip_all)]
    async fn resolve(&self, session: Option<Session>) {
        let Some(session) = session else {
            self.state.send_modify(|s| {
                s.session = None;
                s.user = None;
                s.profile = None;
                s.loading = false;
                s.profile_epoch += 1;
            });
            debug!("resolved: signed out");
            return;
        };

        let user = session.user.clone();
        let mut epoch = 0;
        self.state.send_modify(|s| {
            if s.user.as_ref().map(|u| &u.id) != Some(&user.id) {
                s.profile = None;
            }
            // User set with no profile yet: held as loading until the fetch settles.
            if s.profile.is_none() {
                s.loading = true;
            }
            s.session = Some(session);
            s.user = Some(user.clone());
            s.profile_epoch += 1;
            epoch = s.profile_epoch;
        });

        let profile = match self.profiles.find_by_user_id(&user.id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                debug!(user_id = %user.id, "no stored profile; using default");
                Profile::default_for(&user)
            }
            Err(e) => {
                let err = DomainError::profile_fetch(&user.id, &e);
                warn!(error = %err, "using default profile");
                Profile::default_for(&user)
            }
        };

        self.state.send_modify(|s| {
            if s.profile_epoch == epoch {
                s.profile = Some(profile);
            } else {
                debug!(user_id = %user.id, "profile fetch superseded; result dropped");
            }
            s.loading = false;
        });
        debug!(user_id = %user.id, "resolved: signed in");
    }
}

enum Next {
    Resolve(Option<Session>),
    Resnapshot,
    Stop,
}

async fn run_worker(
    shared: Arc<Shared>,
    mut events: broadcast::Receiver<AuthEvent>,
    cancel: CancellationToken,
) {
    let mut next = Next::Resnapshot;
    loop {
        let session = match next {
            Next::Stop => break,
            Next::Resolve(session) => session,
            Next::Resnapshot => tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                session = shared.load_snapshot() => session,
            },
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = shared.resolve(session) => {}
        }

        next = tokio::select! {
            biased;
            _ = cancel.cancelled() => Next::Stop,
            received = events.recv() => match received {
                Ok(event) => {
                    debug!(kind = ?event.kind, "auth event");
                    Next::Resolve(event.session)
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth events lagged; re-reading session");
                    Next::Resnapshot
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("auth event stream closed");
                    Next::Stop
                }
            },
        };
    }
    // `events` drops here, which releases the subscription.
    debug!("session worker exiting");
}
