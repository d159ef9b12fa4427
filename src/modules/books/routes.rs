//! HTTP surface of the books module
//!
//! Every route sits behind two layers: the session guard (outermost) and the
//! database readiness check. An anonymous caller never reaches the store.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::StatusCode,
    middleware::{from_fn_with_state, Next},
    response::Response,
    Json, Router,
};
use utoipa::{Modify, OpenApi};
use utoipa_axum::{router::OpenApiRouter, routes};

use libris_authz::{require_session, RequestContext, SessionCookieScheme, SessionStore};
use libris_http::{error::ErrorBody, response::MessageBody, AppError, AppResult, Envelope};

use super::{
    models::{Book, BookEnvelope, BookListEnvelope, BookPatch, NewBook},
    repository::BookRepository,
};

/// Shared state of the book handlers
#[derive(Clone)]
pub struct BooksState {
    pub repository: Arc<dyn BookRepository>,
}

#[derive(OpenApi)]
#[openapi(
    components(schemas(Book, NewBook, BookPatch, BookEnvelope, BookListEnvelope)),
    tags((name = "Books", description = "Book catalog; requires a login session"))
)]
struct BooksApi;

/// Router (relative to `/books`) plus the matching OpenAPI fragment
pub fn router(
    state: BooksState,
    sessions: SessionStore,
) -> (Router, utoipa::openapi::OpenApi) {
    let mut doc = BooksApi::openapi();
    SessionCookieScheme(sessions.cookie_name()).modify(&mut doc);

    let (router, doc) = OpenApiRouter::<BooksState>::with_openapi(doc)
        .routes(routes!(list_books, create_book))
        .routes(routes!(get_book, update_book, delete_book))
        .split_for_parts();

    let router = router
        .route_layer(from_fn_with_state(state.clone(), require_database))
        .route_layer(from_fn_with_state(sessions, require_session))
        .with_state(state);

    (router, doc)
}

/// Refuse the request with 500 when the store cannot be reached
async fn require_database(
    State(state): State<BooksState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    state
        .repository
        .check_connection()
        .await
        .map_err(|err| AppError::storage("Database connection unavailable", err))?;
    Ok(next.run(request).await)
}

fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Books",
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "All books, oldest first", body = BookListEnvelope),
        (status = 401, description = "No login session", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
async fn list_books(
    State(state): State<BooksState>,
    ctx: RequestContext,
) -> AppResult<Envelope<Vec<Book>>> {
    let books = state
        .repository
        .find_all()
        .await
        .map_err(|err| AppError::storage("Error retrieving books", err))?;

    tracing::debug!(user = %ctx.principal.username, count = books.len(), "books listed");
    Ok(Envelope::collection(books))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Books",
    security(("session_cookie" = [])),
    params(("id" = String, Path, description = "Book identity")),
    responses(
        (status = 200, description = "The book", body = BookEnvelope),
        (status = 401, description = "No login session", body = ErrorBody),
        (status = 404, description = "Book not found", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> AppResult<Envelope<Book>> {
    let book = state
        .repository
        .find_by_id(&id)
        .await
        .map_err(|err| AppError::storage("Error retrieving book", err))?
        .ok_or_else(|| AppError::not_found("Book not found"))?;

    Ok(Envelope::data(book))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Books",
    security(("session_cookie" = [])),
    request_body = NewBook,
    responses(
        (status = 201, description = "Book created", body = BookEnvelope),
        (status = 400, description = "Missing title or authorId", body = ErrorBody),
        (status = 401, description = "No login session", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
async fn create_book(
    State(state): State<BooksState>,
    ctx: RequestContext,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Envelope<Book>>)> {
    let fields = read_body(payload)?
        .into_fields()
        .map_err(AppError::validation)?;

    let id = state
        .repository
        .create(&fields)
        .await
        .map_err(|err| AppError::storage("Error creating book", err))?;

    let book = state
        .repository
        .find_by_id(&id)
        .await
        .map_err(|err| AppError::storage("Error retrieving book", err))?
        .unwrap_or_else(|| fields.with_id(id.clone()));

    tracing::info!(user = %ctx.principal.username, id = %id, "book created");
    Ok(Envelope::data(book)
        .with_message("Book created successfully")
        .status(StatusCode::CREATED))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Books",
    security(("session_cookie" = [])),
    params(("id" = String, Path, description = "Book identity")),
    request_body = BookPatch,
    responses(
        (status = 200, description = "Book updated", body = BookEnvelope),
        (status = 400, description = "A supplied field is empty", body = ErrorBody),
        (status = 401, description = "No login session", body = ErrorBody),
        (status = 404, description = "Book not found", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
async fn update_book(
    State(state): State<BooksState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    payload: Result<Json<BookPatch>, JsonRejection>,
) -> AppResult<Envelope<Book>> {
    let patch = read_body(payload)?;
    patch.check().map_err(AppError::validation)?;

    // `{}` changes nothing; answer with the current record
    let updated = if patch.is_empty() {
        state
            .repository
            .find_by_id(&id)
            .await
            .map_err(|err| AppError::storage("Error retrieving book", err))?
    } else {
        state
            .repository
            .update(&id, &patch)
            .await
            .map_err(|err| AppError::storage("Error updating book", err))?
    };
    let book = updated.ok_or_else(|| AppError::not_found("Book not found"))?;

    tracing::info!(user = %ctx.principal.username, id = %id, "book updated");
    Ok(Envelope::data(book).with_message("Book updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Books",
    security(("session_cookie" = [])),
    params(("id" = String, Path, description = "Book identity")),
    responses(
        (status = 200, description = "Book deleted", body = MessageBody),
        (status = 401, description = "No login session", body = ErrorBody),
        (status = 404, description = "Book not found", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
async fn delete_book(
    State(state): State<BooksState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> AppResult<Envelope<()>> {
    let matched = state
        .repository
        .delete(&id)
        .await
        .map_err(|err| AppError::storage("Error deleting book", err))?;
    if !matched {
        return Err(AppError::not_found("Book not found"));
    }

    tracing::info!(user = %ctx.principal.username, id = %id, "book deleted");
    Ok(Envelope::message("Book deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::repository::MockBookRepository;
    use axum::{
        body::Body,
        http::{Method, Request},
    };
    use libris_authz::{Principal, Profile};
    use libris_db::DbError;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    const KNOWN_ID: &str = "0192f0c4-6f1e-7a35-9b1e-7d2f1c8a4e10";

    fn dune() -> Book {
        Book {
            id: KNOWN_ID.to_string(),
            title: "Dune".to_string(),
            author_id: "a1".to_string(),
            published_date: None,
            pages: None,
        }
    }

    async fn app_with(repository: MockBookRepository) -> (Router, String) {
        let sessions = SessionStore::new("sid", Duration::from_secs(60));
        let session = sessions
            .create(Principal {
                username: "octocat".to_string(),
                profile: Profile {
                    id: 1,
                    login: "octocat".to_string(),
                    name: None,
                    avatar_url: None,
                    html_url: None,
                },
            })
            .await;

        let state = BooksState {
            repository: Arc::new(repository),
        };
        let (router, _) = router(state, sessions);
        (router, format!("sid={}", session))
    }

    fn request(method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn read_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn anonymous_requests_never_reach_the_store() {
        let calls = [
            (Method::GET, "/".to_string(), None),
            (Method::POST, "/".to_string(), Some(json!({"title": "Dune", "authorId": "a1"}))),
            (Method::GET, format!("/{KNOWN_ID}"), None),
            (Method::PUT, format!("/{KNOWN_ID}"), Some(json!({"pages": 1}))),
            (Method::DELETE, format!("/{KNOWN_ID}"), None),
        ];

        for (method, uri, body) in calls {
            // No expectations: any store call would panic
            let (app, _) = app_with(MockBookRepository::new()).await;
            let response = app
                .oneshot(request(method.clone(), &uri, None, body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(
                read_json(response).await,
                json!({"success": false, "message": "Authentication required"})
            );
        }
    }

    #[tokio::test]
    async fn unreachable_store_short_circuits() {
        let mut repository = MockBookRepository::new();
        repository
            .expect_check_connection()
            .times(1)
            .returning(|| Err(DbError::Unavailable("connection refused".to_string())));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(Method::GET, "/", Some(&cookie), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Database connection unavailable");
        assert_eq!(body["details"], "database unreachable: connection refused");
    }

    #[tokio::test]
    async fn list_failure_surfaces_details() {
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        repository
            .expect_find_all()
            .times(1)
            .returning(|| Err(DbError::Unavailable("socket closed".to_string())));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(Method::GET, "/", Some(&cookie), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["message"], "Error retrieving books");
        assert_eq!(body["details"], "database unreachable: socket closed");
    }

    #[tokio::test]
    async fn list_wraps_books_with_count() {
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        repository
            .expect_find_all()
            .times(1)
            .returning(|| Ok(vec![dune()]));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(Method::GET, "/", Some(&cookie), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({
                "success": true,
                "count": 1,
                "data": [{"_id": KNOWN_ID, "title": "Dune", "authorId": "a1"}]
            })
        );
    }

    #[tokio::test]
    async fn empty_create_body_is_rejected_before_the_store() {
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(Method::POST, "/", Some(&cookie), Some(json!({}))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await,
            json!({"success": false, "message": "Book title is required"})
        );
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/")
                    .header("cookie", &cookie)
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn create_returns_stored_record() {
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        repository
            .expect_create()
            .times(1)
            .returning(|_| Ok(KNOWN_ID.to_string()));
        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(dune())));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(
                Method::POST,
                "/",
                Some(&cookie),
                Some(json!({"title": "Dune", "authorId": "a1"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = read_json(response).await;
        assert_eq!(body["data"]["_id"], KNOWN_ID);
        assert_eq!(body["message"], "Book created successfully");
    }

    #[tokio::test]
    async fn missing_book_is_not_found() {
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(Method::GET, &format!("/{KNOWN_ID}"), Some(&cookie), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            read_json(response).await,
            json!({"success": false, "message": "Book not found"})
        );
    }

    #[tokio::test]
    async fn malformed_id_is_a_storage_error() {
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        repository
            .expect_find_by_id()
            .times(1)
            .returning(|id| Err(DbError::InvalidId(id.to_string())));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(Method::GET, "/nope", Some(&cookie), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["message"], "Error retrieving book");
        assert_eq!(body["details"], "invalid record id 'nope'");
    }

    #[tokio::test]
    async fn update_of_missing_book_is_not_found() {
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        repository
            .expect_update()
            .times(1)
            .returning(|_, _| Ok(None));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(
                Method::PUT,
                &format!("/{KNOWN_ID}"),
                Some(&cookie),
                Some(json!({"pages": 10})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_with_empty_title_is_rejected() {
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(
                Method::PUT,
                &format!("/{KNOWN_ID}"),
                Some(&cookie),
                Some(json!({"title": ""})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["message"], "Book title cannot be empty");
    }

    #[tokio::test]
    async fn delete_confirms_with_message() {
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        repository
            .expect_delete()
            .times(1)
            .returning(|_| Ok(true));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(
                Method::DELETE,
                &format!("/{KNOWN_ID}"),
                Some(&cookie),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({"success": true, "message": "Book deleted successfully"})
        );
    }

    #[tokio::test]
    async fn update_answers_with_the_merged_record() {
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        repository
            .expect_update()
            .times(1)
            .returning(|_, patch| {
                let mut book = dune();
                patch.apply_to(&mut book);
                Ok(Some(book))
            });
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(
                Method::PUT,
                &format!("/{KNOWN_ID}"),
                Some(&cookie),
                Some(json!({"pages": 412})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({
                "success": true,
                "data": {"_id": KNOWN_ID, "title": "Dune", "authorId": "a1", "pages": 412},
                "message": "Book updated successfully"
            })
        );
    }

    #[tokio::test]
    async fn empty_update_skips_the_write() {
        // No update expectation: a write would panic
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(dune())));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(
                Method::PUT,
                &format!("/{KNOWN_ID}"),
                Some(&cookie),
                Some(json!({})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["title"], "Dune");
        assert_eq!(body["message"], "Book updated successfully");
    }

    #[tokio::test]
    async fn empty_update_of_missing_book_is_not_found() {
        let mut repository = MockBookRepository::new();
        repository.expect_check_connection().returning(|| Ok(()));
        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));
        let (app, cookie) = app_with(repository).await;

        let response = app
            .oneshot(request(
                Method::PUT,
                &format!("/{KNOWN_ID}"),
                Some(&cookie),
                Some(json!({})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn fragment_documents_every_operation() {
        let state = BooksState {
            repository: Arc::new(MockBookRepository::new()),
        };
        let (_, doc) = router(state, SessionStore::new("libris.sid", Duration::from_secs(60)));
        let json = serde_json::to_value(&doc).unwrap();

        for method in ["get", "post"] {
            assert!(json["paths"]["/"][method].is_object(), "{method} /");
        }
        for method in ["get", "put", "delete"] {
            assert!(json["paths"]["/{id}"][method].is_object(), "{method} /{{id}}");
        }
        assert_eq!(
            json["components"]["securitySchemes"]["session_cookie"]["name"],
            "libris.sid"
        );
    }
}
