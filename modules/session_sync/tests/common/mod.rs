//! In-memory fakes of the auth and profile ports.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Semaphore};

use session_sync::contract::model::{
    AuthChangeKind, AuthEvent, Profile, ProfilePatch, Session, SessionState, User,
};
use session_sync::domain::ports::{AuthClient, ProfileStore};

pub fn user(id: &str, email: Option<&str>) -> User {
    User {
        id: id.to_string(),
        email: email.map(str::to_string),
        is_anonymous: email.is_none(),
    }
}

pub fn session(id: &str, email: Option<&str>) -> Session {
    Session {
        access_token: format!("access-{id}"),
        refresh_token: Some(format!("refresh-{id}")),
        token_type: "bearer".to_string(),
        expires_at: None,
        user: user(id, email),
    }
}

pub fn signed_in(id: &str, email: Option<&str>) -> AuthEvent {
    AuthEvent::new(AuthChangeKind::SignedIn, Some(session(id, email)))
}

/// Blocks callers until the test adds permits.
#[derive(Clone, Default)]
pub struct Gate(Arc<Mutex<Option<Arc<Semaphore>>>>);

impl Gate {
    pub fn close(&self) {
        *self.0.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, n: usize) {
        if let Some(sem) = self.0.lock().as_ref() {
            sem.add_permits(n);
        }
    }

    pub fn open(&self) {
        if let Some(sem) = self.0.lock().take() {
            sem.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    async fn pass(&self) {
        let sem = self.0.lock().clone();
        if let Some(sem) = sem {
            if let Ok(permit) = sem.acquire().await {
                permit.forget();
            }
        }
    }
}

pub struct FakeAuth {
    events: broadcast::Sender<AuthEvent>,
    pub snapshot: Mutex<Option<Session>>,
    pub snapshot_fails: AtomicBool,
    pub snapshot_calls: AtomicUsize,
    pub snapshot_gate: Gate,
    /// Simulates an offline client: every request method fails.
    pub offline: AtomicBool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeAuth {
    pub fn new() -> Arc<Self> {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        let (events, _) = broadcast::channel(capacity);
        Arc::new(Self {
            events,
            snapshot: Mutex::new(None),
            snapshot_fails: AtomicBool::new(false),
            snapshot_calls: AtomicUsize::new(0),
            snapshot_gate: Gate::default(),
            offline: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_session(session: Session) -> Arc<Self> {
        let auth = Self::new();
        *auth.snapshot.lock() = Some(session);
        auth
    }

    /// Deliver `event` as the provider would, updating the snapshot too.
    pub fn emit(&self, event: AuthEvent) {
        *self.snapshot.lock() = event.session.clone();
        let _ = self.events.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: &str) -> Result<()> {
        self.calls.lock().push(call.to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(anyhow!("network unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthClient for FakeAuth {
    async fn current_session(&self) -> Result<Option<Session>> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        self.snapshot_gate.pass().await;
        if self.snapshot_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("session storage unavailable"));
        }
        Ok(self.snapshot.lock().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_in_with_otp(&self, email: &str) -> Result<()> {
        self.record(&format!("otp:{email}"))?;
        if !email.contains('@') {
            return Err(anyhow!("invalid email address '{email}'"));
        }
        Ok(())
    }

    async fn verify_email_otp(&self, email: &str, token: &str) -> Result<()> {
        self.record(&format!("verify:{email}:{token}"))?;
        if token != "123456" {
            return Err(anyhow!("token has expired or is invalid"));
        }
        self.emit(signed_in("u-email", Some(email)));
        Ok(())
    }

    async fn sign_in_anonymously(&self) -> Result<()> {
        self.record("anonymous")?;
        self.emit(signed_in("anon-1", None));
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        self.record("sign_out")?;
        self.emit(AuthEvent::signed_out());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeProfiles {
    pub rows: Mutex<HashMap<String, Profile>>,
    pub fail_find: AtomicBool,
    pub fail_upsert: AtomicBool,
    pub find_calls: AtomicUsize,
    pub upserts: Mutex<Vec<(String, ProfilePatch)>>,
    pub find_gate: Gate,
    pub upsert_gate: Gate,
}

impl FakeProfiles {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, user_id: &str, profile: Profile) {
        self.rows.lock().insert(user_id.to_string(), profile);
    }

    pub fn upserts(&self) -> Vec<(String, ProfilePatch)> {
        self.upserts.lock().clone()
    }
}

#[async_trait]
impl ProfileStore for FakeProfiles {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Profile>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let row = self.rows.lock().get(user_id).cloned();
        self.find_gate.pass().await;
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(anyhow!("relation \"profiles\" does not exist"));
        }
        Ok(row)
    }

    async fn upsert(&self, user_id: &str, patch: &ProfilePatch) -> Result<()> {
        self.upsert_gate.pass().await;
        self.upserts
            .lock()
            .push((user_id.to_string(), patch.clone()));
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(anyhow!("HTTP 503"));
        }
        self.rows
            .lock()
            .entry(user_id.to_string())
            .or_default()
            .apply(patch);
        Ok(())
    }
}

/// Wait until `state` satisfies `pred`, failing the test after two seconds.
pub async fn wait_state(
    rx: &mut watch::Receiver<SessionState>,
    pred: impl FnMut(&SessionState) -> bool,
) -> SessionState {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred))
        .await
        .expect("timed out waiting for session state")
        .expect("state channel closed")
        .clone()
}

/// Poll `cond` until it holds, failing the test after two seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
