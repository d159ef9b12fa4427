pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use libris_authz::{IdentityProvider, SessionStore};
use libris_kernel::{settings::AuthSettings, InitCtx, Module};

use routes::AuthState;

/// GitHub login, logout and `me`, mounted at `/auth`
pub struct AuthModule {
    state: AuthState,
}

impl AuthModule {
    pub fn new(
        sessions: SessionStore,
        provider: Arc<dyn IdentityProvider>,
        settings: &AuthSettings,
    ) -> Self {
        Self {
            state: AuthState {
                sessions,
                provider,
                login_redirect: settings.login_redirect.clone(),
                secure_cookies: settings.secure_cookies,
            },
        }
    }
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            callback = %ctx.settings.auth.callback_url,
            secure_cookies = self.state.secure_cookies,
            "auth module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Option<Router> {
        let (router, _) = routes::router(self.state.clone());
        Some(router)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let (_, doc) = routes::router(self.state.clone());
        serde_json::to_value(doc).ok()
    }
}

/// Create a new instance of the auth module
pub fn create_module(
    sessions: SessionStore,
    provider: Arc<dyn IdentityProvider>,
    settings: &AuthSettings,
) -> Arc<dyn Module> {
    Arc::new(AuthModule::new(sessions, provider, settings))
}
