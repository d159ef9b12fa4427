use async_trait::async_trait;
use libris_db::{new_record_key, parse_record_key, Database, DbResult};

use super::BookRepository;
use crate::modules::books::models::{Book, BookFields, BookPatch};

const PROJECTION: &str = "_id, title, authorId, publishedDate, pages";

/// [`BookRepository`] over the shared SurrealDB client
///
/// Records live at `{collection}:⟨uuid⟩` and carry their key again in `_id`
/// so reads can project a flat document.
#[derive(Clone)]
pub struct SurrealBookRepository {
    db: Database,
}

impl SurrealBookRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn table(&self) -> String {
        self.db.collection().to_owned()
    }
}

#[async_trait]
impl BookRepository for SurrealBookRepository {
    async fn check_connection(&self) -> DbResult<()> {
        self.db.check_connection().await
    }

    async fn find_all(&self) -> DbResult<Vec<Book>> {
        let mut response = self
            .db
            .client()
            .query(format!(
                "SELECT {PROJECTION} FROM type::table($tb) ORDER BY _id ASC"
            ))
            .bind(("tb", self.table()))
            .await?
            .check()?;

        let books: Vec<Book> = response.take(0)?;
        tracing::debug!(target: "libris-books", count = books.len(), "listed books");
        Ok(books)
    }

    async fn find_by_id(&self, id: &str) -> DbResult<Option<Book>> {
        let key = parse_record_key(id)?;
        let mut response = self
            .db
            .client()
            .query(format!("SELECT {PROJECTION} FROM type::thing($tb, $id)"))
            .bind(("tb", self.table()))
            .bind(("id", key))
            .await?
            .check()?;

        let book: Option<Book> = response.take(0)?;
        Ok(book)
    }

    async fn create(&self, fields: &BookFields) -> DbResult<String> {
        let key = new_record_key();
        let document = fields.clone().with_id(key.clone());

        self.db
            .client()
            .query("CREATE type::thing($tb, $id) CONTENT $doc RETURN NONE")
            .bind(("tb", self.table()))
            .bind(("id", key.clone()))
            .bind(("doc", document))
            .await?
            .check()?;

        tracing::debug!(target: "libris-books", id = %key, "book stored");
        Ok(key)
    }

    async fn update(&self, id: &str, patch: &BookPatch) -> DbResult<Option<Book>> {
        let key = parse_record_key(id)?;
        // A single statement: the match test and the write share one transaction
        let mut response = self
            .db
            .client()
            .query(format!(
                "UPDATE type::thing($tb, $id) MERGE $patch WHERE _id = $id RETURN {PROJECTION}"
            ))
            .bind(("tb", self.table()))
            .bind(("id", key))
            .bind(("patch", patch.clone()))
            .await?
            .check()?;

        let book: Option<Book> = response.take(0)?;
        Ok(book)
    }

    async fn delete(&self, id: &str) -> DbResult<bool> {
        let key = parse_record_key(id)?;
        let mut response = self
            .db
            .client()
            .query("DELETE type::thing($tb, $id) RETURN BEFORE")
            .bind(("tb", self.table()))
            .bind(("id", key))
            .await?
            .check()?;

        let removed: Option<Book> = response.take(0)?;
        Ok(removed.is_some())
    }
}
