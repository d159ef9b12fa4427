pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use libris_authz::SessionStore;
use libris_kernel::{InitCtx, Module};

use repository::BookRepository;
use routes::BooksState;

/// CRUD over the `book` collection, mounted at `/books`
pub struct BooksModule {
    state: BooksState,
    sessions: SessionStore,
}

impl BooksModule {
    pub fn new(repository: Arc<dyn BookRepository>, sessions: SessionStore) -> Self {
        Self {
            state: BooksState { repository },
            sessions,
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            collection = %ctx.settings.database.collection,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Option<Router> {
        let (router, _) = routes::router(self.state.clone(), self.sessions.clone());
        Some(router)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let (_, doc) = routes::router(self.state.clone(), self.sessions.clone());
        match serde_json::to_value(doc) {
            Ok(fragment) => Some(fragment),
            Err(err) => {
                tracing::warn!(module = self.name(), error = %err, "books OpenAPI fragment dropped");
                None
            }
        }
    }
}

/// Create a new instance of the books module
pub fn create_module(repository: Arc<dyn BookRepository>, sessions: SessionStore) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(repository, sessions))
}
