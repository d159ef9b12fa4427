//! SurrealDB client factory for Libris.
//!
//! [`Database`] owns the one live client shared by every request. Feature
//! modules build their repositories on top of it and use
//! [`Database::check_connection`] as a cheap readiness probe.

use std::sync::Arc;

use async_trait::async_trait;
use surrealdb::{
    engine::any::{self, Any},
    opt::auth::Root,
    Surreal,
};
use thiserror::Error;
use uuid::Uuid;

use libris_kernel::{settings::DatabaseSettings, InitCtx, Module};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: surrealdb::Error,
    },

    #[error("database unreachable: {0}")]
    Unavailable(String),

    #[error("invalid record id '{0}'")]
    InvalidId(String),

    #[error(transparent)]
    Query(#[from] surrealdb::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Fresh record key; UUIDv7 so keys sort in creation order.
pub fn new_record_key() -> String {
    Uuid::now_v7().to_string()
}

/// Validate a caller-supplied record key and return its canonical form.
pub fn parse_record_key(raw: &str) -> DbResult<String> {
    Uuid::parse_str(raw)
        .map(|uuid| uuid.to_string())
        .map_err(|_| DbError::InvalidId(raw.to_string()))
}

/// Live client plus the collection it serves
#[derive(Clone)]
pub struct Database {
    client: Surreal<Any>,
    collection: String,
}

impl Database {
    /// Connect, authenticate when credentials are configured, and select the
    /// namespace/database.
    pub async fn connect(settings: &DatabaseSettings) -> DbResult<Self> {
        tracing::info!(
            target: "libris-db",
            endpoint = %settings.endpoint,
            namespace = %settings.namespace,
            database = %settings.database,
            "connecting to SurrealDB"
        );

        let client = any::connect(settings.endpoint.as_str())
            .await
            .map_err(|source| DbError::Connect {
                endpoint: settings.endpoint.clone(),
                source,
            })?;

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            client
                .signin(Root {
                    username: username.as_str(),
                    password: password.as_str(),
                })
                .await?;
        }

        client
            .use_ns(settings.namespace.as_str())
            .use_db(settings.database.as_str())
            .await?;

        Ok(Self {
            client,
            collection: settings.collection.clone(),
        })
    }

    pub fn client(&self) -> &Surreal<Any> {
        &self.client
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Fails fast when the server cannot be reached
    pub async fn check_connection(&self) -> DbResult<()> {
        self.client
            .health()
            .await
            .map_err(|err| DbError::Unavailable(err.to_string()))
    }
}

/// Core module owning the database client lifecycle
pub struct DatabaseModule {
    database: Database,
}

impl DatabaseModule {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Module for DatabaseModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.database.check_connection().await?;
        tracing::info!(
            target: "libris-db",
            collection = self.database.collection(),
            "database reachable"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        if let Err(err) = self.database.client().invalidate().await {
            tracing::warn!(target: "libris-db", error = %err, "failed to invalidate session");
        }
        tracing::info!(target: "libris-db", "database module stopped");
        Ok(())
    }
}

/// Create a new instance of the database module
pub fn create_module(database: Database) -> Arc<dyn Module> {
    Arc::new(DatabaseModule::new(database))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keys_are_unique_and_ordered() {
        let first = new_record_key();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = new_record_key();

        assert_ne!(first, second);
        assert!(first < second);
    }

    #[test]
    fn parse_record_key_canonicalizes() {
        let key = new_record_key();
        assert_eq!(parse_record_key(&key).unwrap(), key);
        assert_eq!(parse_record_key(&key.to_uppercase()).unwrap(), key);
    }

    #[test]
    fn parse_record_key_rejects_garbage() {
        let err = parse_record_key("not-a-key").unwrap_err();
        assert!(matches!(err, DbError::InvalidId(ref raw) if raw == "not-a-key"));
        assert_eq!(err.to_string(), "invalid record id 'not-a-key'");
    }
}
