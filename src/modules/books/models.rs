use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

/// A catalog entry as stored and served
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Store-assigned identity
    #[serde(rename = "_id")]
    #[schema(example = "0192f0c4-6f1e-7a35-9b1e-7d2f1c8a4e10")]
    pub id: String,
    #[schema(example = "Dune")]
    pub title: String,
    /// Reference to an author record; not verified
    #[schema(example = "a1")]
    pub author_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Date, example = "1965-08-01")]
    pub published_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 412)]
    pub pages: Option<i64>,
}

/// Validated fields of a book that does not have an identity yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFields {
    pub title: String,
    pub author_id: String,
    pub published_date: Option<NaiveDate>,
    pub pages: Option<i64>,
}

impl BookFields {
    pub fn with_id(self, id: impl Into<String>) -> Book {
        Book {
            id: id.into(),
            title: self.title,
            author_id: self.author_id,
            published_date: self.published_date,
            pages: self.pages,
        }
    }
}

/// Request body for `POST /books`
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    #[validate(
        required(message = "Book title is required"),
        length(min = 1, message = "Book title is required")
    )]
    #[schema(example = "Dune")]
    pub title: Option<String>,
    #[validate(
        required(message = "Book authorId is required"),
        length(min = 1, message = "Book authorId is required")
    )]
    #[schema(example = "a1")]
    pub author_id: Option<String>,
    #[schema(value_type = Option<String>, format = Date, example = "1965-08-01")]
    pub published_date: Option<NaiveDate>,
    pub pages: Option<i64>,
}

impl NewBook {
    /// Check the body and hand back the fields to persist
    pub fn into_fields(self) -> Result<BookFields, String> {
        self.validate().map_err(|errors| first_message(&errors))?;

        match (self.title, self.author_id) {
            (Some(title), Some(author_id)) => Ok(BookFields {
                title,
                author_id,
                published_date: self.published_date,
                pages: self.pages,
            }),
            (None, _) => Err("Book title is required".to_string()),
            (_, None) => Err("Book authorId is required".to_string()),
        }
    }
}

/// Request body for `PUT /books/{id}`; omitted fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Book title cannot be empty"))]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Book authorId cannot be empty"))]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Date)]
    pub published_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<i64>,
}

impl BookPatch {
    pub fn check(&self) -> Result<(), String> {
        self.validate().map_err(|errors| first_message(&errors))
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overwrite the supplied fields of `book`
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(author_id) = &self.author_id {
            book.author_id = author_id.clone();
        }
        if self.published_date.is_some() {
            book.published_date = self.published_date;
        }
        if self.pages.is_some() {
            book.pages = self.pages;
        }
    }
}

/// Documentation shape of a single-book response
#[derive(Debug, Serialize, ToSchema)]
pub struct BookEnvelope {
    pub success: bool,
    pub data: Book,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Book created successfully")]
    pub message: Option<String>,
}

/// Documentation shape of `GET /books`
#[derive(Debug, Serialize, ToSchema)]
pub struct BookListEnvelope {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Book>,
}

const FIELD_ORDER: &[&str] = &["title", "author_id", "published_date", "pages"];

/// Message of the first failing field, in declaration order
fn first_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    FIELD_ORDER
        .iter()
        .filter_map(|name| fields.get(*name))
        .chain(fields.values())
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(|message| message.to_string()))
        .unwrap_or_else(|| "Invalid book".to_string())
}
