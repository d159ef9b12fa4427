//! Persistence gateway for the `book` collection
//!
//! Handlers only see [`BookRepository`]. Production runs on SurrealDB; the
//! in-memory backend is selected with the `memory` endpoint and backs tests.

mod memory;
mod surreal;

pub use memory::MemoryBookRepository;
pub use surreal::SurrealBookRepository;

use async_trait::async_trait;
use libris_db::DbResult;

use super::models::{Book, BookFields, BookPatch};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Readiness probe run before every book request
    async fn check_connection(&self) -> DbResult<()>;

    /// Every book, oldest first
    async fn find_all(&self) -> DbResult<Vec<Book>>;

    async fn find_by_id(&self, id: &str) -> DbResult<Option<Book>>;

    /// Persist `fields` under a fresh identity and return it
    async fn create(&self, fields: &BookFields) -> DbResult<String>;

    /// Merge `patch` into the record and return the result; `None` when
    /// nothing matched
    async fn update(&self, id: &str, patch: &BookPatch) -> DbResult<Option<Book>>;

    /// Remove the record; `false` when nothing matched
    async fn delete(&self, id: &str) -> DbResult<bool>;
}
