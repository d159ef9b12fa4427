//! Server-side session state
//!
//! Sessions and pending OAuth `state` tokens live in process memory. A
//! session id is an unguessable random token handed to the browser in a
//! cookie; nothing about the principal leaves the server.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;
use uuid::Uuid;

use libris_kernel::settings::AuthSettings;

use crate::principal::Principal;

/// How long an OAuth `state` token stays redeemable
pub const LOGIN_STATE_TTL: Duration = Duration::from_secs(10 * 60);

struct SessionEntry {
    principal: Principal,
    last_seen: Instant,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, SessionEntry>,
    pending_logins: HashMap<String, Instant>,
}

/// Shared, cloneable handle to the session table
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Inner>>,
    idle_ttl: Duration,
    cookie_name: Arc<str>,
}

impl SessionStore {
    pub fn new(cookie_name: impl Into<String>, idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            idle_ttl,
            cookie_name: Arc::from(cookie_name.into()),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(
            settings.session_cookie.clone(),
            Duration::from_secs(settings.session_ttl_secs),
        )
    }

    /// Name of the cookie carrying the session id
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Issue a one-time `state` token for an OAuth round trip
    pub async fn begin_login(&self) -> String {
        let state = random_token();
        self.inner
            .write()
            .await
            .pending_logins
            .insert(state.clone(), Instant::now());
        state
    }

    /// Redeem a `state` token; each token works once and only while fresh
    pub async fn complete_login(&self, state: &str) -> bool {
        match self.inner.write().await.pending_logins.remove(state) {
            Some(issued) => issued.elapsed() <= LOGIN_STATE_TTL,
            None => false,
        }
    }

    /// Open a session for `principal` and return its id
    pub async fn create(&self, principal: Principal) -> String {
        let id = random_token();
        tracing::info!(user = %principal.username, "session opened");
        self.inner.write().await.sessions.insert(
            id.clone(),
            SessionEntry {
                principal,
                last_seen: Instant::now(),
            },
        );
        id
    }

    /// Principal behind `id`, refreshing its idle timer. Expired sessions are
    /// dropped on sight.
    pub async fn resolve(&self, id: &str) -> Option<Principal> {
        let mut inner = self.inner.write().await;
        match inner.sessions.get_mut(id) {
            None => return None,
            Some(entry) if entry.last_seen.elapsed() <= self.idle_ttl => {
                entry.last_seen = Instant::now();
                return Some(entry.principal.clone());
            }
            Some(_) => {}
        }
        inner.sessions.remove(id);
        tracing::debug!("expired session dropped");
        None
    }

    /// Close a session; returns whether it existed
    pub async fn destroy(&self, id: &str) -> bool {
        let removed = self.inner.write().await.sessions.remove(id);
        if let Some(entry) = &removed {
            tracing::info!(user = %entry.principal.username, "session closed");
        }
        removed.is_some()
    }

    /// Drop idle sessions and stale login states; returns sessions removed
    pub async fn purge_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.sessions.len();
        let idle_ttl = self.idle_ttl;
        inner
            .sessions
            .retain(|_, entry| entry.last_seen.elapsed() <= idle_ttl);
        inner
            .pending_logins
            .retain(|_, issued| issued.elapsed() <= LOGIN_STATE_TTL);
        before - inner.sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Outstanding OAuth `state` tokens
    pub async fn pending_logins(&self) -> usize {
        self.inner.read().await.pending_logins.len()
    }
}

fn random_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
