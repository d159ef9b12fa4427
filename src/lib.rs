//! Libris application library
//!
//! Builds the backends from [`Settings`], registers the `db`/`authz` core
//! modules and the `books`/`auth` feature modules, and runs the server.

use std::sync::Arc;

use anyhow::Context;

use libris_authz::{GithubProvider, IdentityProvider, SessionStore};
use libris_db::Database;
use libris_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub mod modules;

use modules::books::repository::{BookRepository, MemoryBookRepository, SurrealBookRepository};

/// Backends shared by the modules
#[derive(Clone)]
pub struct Services {
    pub books: Arc<dyn BookRepository>,
    pub sessions: SessionStore,
    pub identity: Arc<dyn IdentityProvider>,
    /// Present unless the in-memory book store is selected
    pub database: Option<Database>,
}

impl Services {
    /// Connect to the configured store and build the GitHub client
    pub async fn connect(settings: &Settings) -> anyhow::Result<Self> {
        if settings.database.is_memory() {
            tracing::warn!("database endpoint is 'memory'; books are lost on exit");
            return Self::in_memory(settings);
        }

        let database = Database::connect(&settings.database)
            .await
            .context("failed to connect to SurrealDB")?;

        Ok(Self {
            books: Arc::new(SurrealBookRepository::new(database.clone())),
            sessions: SessionStore::from_settings(&settings.auth),
            identity: github_provider(settings)?,
            database: Some(database),
        })
    }

    /// Services backed by the in-memory book store
    pub fn in_memory(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::with_backends(
            Arc::new(MemoryBookRepository::new()),
            github_provider(settings)?,
            settings,
        ))
    }

    /// Services over caller-supplied backends
    pub fn with_backends(
        books: Arc<dyn BookRepository>,
        identity: Arc<dyn IdentityProvider>,
        settings: &Settings,
    ) -> Self {
        Self {
            books,
            sessions: SessionStore::from_settings(&settings.auth),
            identity,
            database: None,
        }
    }
}

fn github_provider(settings: &Settings) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    let provider =
        GithubProvider::from_settings(&settings.auth).context("failed to build the GitHub client")?;
    Ok(Arc::new(provider))
}

/// Registry with core and feature modules wired to `services`
pub fn build_registry(services: &Services, settings: &Settings) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();

    if let Some(database) = &services.database {
        registry.register_core(libris_db::create_module(database.clone()));
    }
    registry.register_core(libris_authz::create_module(services.sessions.clone()));

    modules::register_all(&mut registry, services, settings);

    tracing::info!(
        core = registry.core_module_count(),
        custom = registry.custom_module_count(),
        "modules registered"
    );
    registry
}

/// Boot every module, serve until a shutdown signal, then stop the modules
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.endpoint,
        "libris bootstrap starting"
    );

    let services = Services::connect(&settings).await?;
    let registry = build_registry(&services, &settings);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.boot(&ctx).await.context("module boot failed")?;
    let served = libris_http::start_server(&registry, &settings).await;

    if let Err(err) = registry.shutdown().await {
        tracing::error!(error = %format!("{err:#}"), "module shutdown failed");
    }
    served
}

/// Merged OpenAPI document, built without touching any backend
pub fn openapi_document(settings: &Settings) -> anyhow::Result<serde_json::Value> {
    let services = Services::in_memory(settings)?;
    let registry = build_registry(&services, settings);
    Ok(libris_http::openapi::merged_document(&registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_services_skip_the_database_module() {
        let settings = Settings::default();
        let services = Services::in_memory(&settings).unwrap();
        let registry = build_registry(&services, &settings);

        assert!(registry.get_module("db").is_none());
        assert!(registry.get_module("authz").is_some());
        assert!(registry.get_module("books").is_some());
        assert!(registry.get_module("auth").is_some());
        assert_eq!(registry.custom_module_count(), 2);
    }

    #[test]
    fn openapi_document_lists_book_and_auth_paths() {
        let doc = openapi_document(&Settings::default()).unwrap();
        let paths = doc["paths"].as_object().unwrap();

        for path in ["/books", "/books/{id}", "/auth/github", "/auth/github/callback", "/auth/me", "/healthz"] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert!(doc["components"]["securitySchemes"]["session_cookie"].is_object());
    }
}
