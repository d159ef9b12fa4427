use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use tokio::task::JoinHandle;

use libris_kernel::{InitCtx, Module};

use crate::session::SessionStore;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Core module owning the session table and its expiry sweeper
pub struct SessionModule {
    sessions: SessionStore,
    sweep_interval: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl SessionModule {
    pub fn new(sessions: SessionStore) -> Self {
        Self::with_interval(sessions, SWEEP_INTERVAL)
    }

    pub fn with_interval(sessions: SessionStore, sweep_interval: Duration) -> Self {
        Self {
            sessions,
            sweep_interval,
            sweeper: Mutex::new(None),
        }
    }

    fn take_sweeper(&self) -> Option<JoinHandle<()>> {
        self.sweeper
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

#[async_trait]
impl Module for SessionModule {
    fn name(&self) -> &'static str {
        "authz"
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let sessions = self.sessions.clone();
        let period = self.sweep_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = sessions.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "expired sessions purged");
                }
            }
        });

        if let Some(previous) = self
            .sweeper
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(handle)
        {
            previous.abort();
        }

        tracing::info!(module = self.name(), "session sweeper started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        if let Some(handle) = self.take_sweeper() {
            handle.abort();
        }
        tracing::info!(module = self.name(), "session sweeper stopped");
        Ok(())
    }
}

/// Create a new instance of the session module
pub fn create_module(sessions: SessionStore) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(SessionModule::new(sessions))
}
