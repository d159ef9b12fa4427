//! Login guard middleware and the per-request context it produces

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify,
};

use libris_http::AppError;

use crate::{error::AuthError, principal::Principal, session::SessionStore};

/// Everything downstream handlers learn about the caller
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Principal,
    /// Value of `x-request-id`, when the request id layer ran
    pub request_id: Option<String>,
}

/// Reject requests without a live session; otherwise attach a
/// [`RequestContext`] and continue.
///
/// Use with `axum::middleware::from_fn_with_state(sessions, require_session)`.
pub async fn require_session(
    State(sessions): State<SessionStore>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = match jar.get(sessions.cookie_name()) {
        Some(cookie) => sessions.resolve(cookie.value()).await,
        None => None,
    };
    let Some(principal) = principal else {
        tracing::debug!(path = %request.uri().path(), "request without a live session");
        return Err(AuthError::Unauthenticated.into());
    };

    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    request.extensions_mut().insert(RequestContext {
        principal,
        request_id,
    });

    Ok(next.run(request).await)
}

/// Name guarded operations list under `security(...)`
pub const SESSION_SCHEME: &str = "session_cookie";

/// Documents the session cookie as an API-key security scheme
pub struct SessionCookieScheme<'a>(pub &'a str);

impl Modify for SessionCookieScheme<'_> {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi
            .components
            .get_or_insert_with(Default::default)
            .add_security_scheme(
                SESSION_SCHEME,
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(self.0))),
            );
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| AuthError::Unauthenticated.into())
    }
}
