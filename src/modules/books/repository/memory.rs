use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use indexmap::IndexMap;
use libris_db::{new_record_key, parse_record_key, DbError, DbResult};
use tokio::sync::RwLock;

use super::BookRepository;
use crate::modules::books::models::{Book, BookFields, BookPatch};

/// Process-local [`BookRepository`]; insertion order is list order
#[derive(Clone, Default)]
pub struct MemoryBookRepository {
    books: Arc<RwLock<IndexMap<String, Book>>>,
    unreachable: Arc<AtomicBool>,
}

impl MemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the backing store
    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    fn ensure_reachable(&self) -> DbResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable(
                "in-memory store is marked unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn check_connection(&self) -> DbResult<()> {
        self.ensure_reachable()
    }

    async fn find_all(&self) -> DbResult<Vec<Book>> {
        self.ensure_reachable()?;
        Ok(self.books.read().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> DbResult<Option<Book>> {
        self.ensure_reachable()?;
        let key = parse_record_key(id)?;
        Ok(self.books.read().await.get(&key).cloned())
    }

    async fn create(&self, fields: &BookFields) -> DbResult<String> {
        self.ensure_reachable()?;
        let key = new_record_key();
        self.books
            .write()
            .await
            .insert(key.clone(), fields.clone().with_id(key.clone()));
        Ok(key)
    }

    async fn update(&self, id: &str, patch: &BookPatch) -> DbResult<Option<Book>> {
        self.ensure_reachable()?;
        let key = parse_record_key(id)?;
        Ok(self.books.write().await.get_mut(&key).map(|book| {
            patch.apply_to(book);
            book.clone()
        }))
    }

    async fn delete(&self, id: &str) -> DbResult<bool> {
        self.ensure_reachable()?;
        let key = parse_record_key(id)?;
        Ok(self.books.write().await.shift_remove(&key).is_some())
    }
}
