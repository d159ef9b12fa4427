//! GitHub login handshake and session endpoints, mounted at `/auth`

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Redirect,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, Modify, OpenApi, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use libris_authz::{
    authenticate, require_session, AuthError, IdentityProvider, Principal, RequestContext,
    SessionCookieScheme, SessionStore,
};
use libris_http::{error::ErrorBody, response::MessageBody, AppResult, Envelope};

/// Short-lived cookie pairing the browser with its pending `state` token
pub const LOGIN_STATE_COOKIE: &str = "libris.login_state";
const LOGIN_STATE_PATH: &str = "/auth";

#[derive(Clone)]
pub struct AuthState {
    pub sessions: SessionStore,
    pub provider: Arc<dyn IdentityProvider>,
    /// Where the browser lands after a successful login
    pub login_redirect: String,
    pub secure_cookies: bool,
}

/// Query string GitHub appends to the callback URL
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// Authorization code to exchange
    code: Option<String>,
    /// Echo of the `state` sent with the authorize redirect
    state: Option<String>,
    /// Set when the user refused access
    error: Option<String>,
}

/// Documentation shape of `GET /auth/me`
#[derive(Debug, Serialize, ToSchema)]
pub struct PrincipalEnvelope {
    pub success: bool,
    pub data: Principal,
}

#[derive(OpenApi)]
#[openapi(
    components(schemas(Principal, PrincipalEnvelope)),
    tags((name = "Auth", description = "GitHub login and session management"))
)]
struct AuthApi;

/// Router (relative to `/auth`) plus the matching OpenAPI fragment
pub fn router(state: AuthState) -> (Router, utoipa::openapi::OpenApi) {
    let mut doc = AuthApi::openapi();
    SessionCookieScheme(state.sessions.cookie_name()).modify(&mut doc);

    let (public, mut doc) = OpenApiRouter::<AuthState>::with_openapi(doc)
        .routes(routes!(login))
        .routes(routes!(callback))
        .routes(routes!(logout))
        .split_for_parts();

    let (guarded, guarded_doc) = OpenApiRouter::<()>::new()
        .routes(routes!(me))
        .split_for_parts();
    doc.merge(guarded_doc);

    let guarded = guarded.route_layer(from_fn_with_state(state.sessions.clone(), require_session));
    let router = public.with_state(state).merge(guarded);

    (router, doc)
}

fn session_cookie(name: &str, id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_owned(), id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

#[utoipa::path(
    get,
    path = "/github",
    tag = "Auth",
    responses(
        (status = 303, description = "Redirect to GitHub's authorize page"),
        (status = 500, description = "OAuth client not configured", body = ErrorBody)
    )
)]
async fn login(State(state): State<AuthState>, jar: CookieJar) -> AppResult<(CookieJar, Redirect)> {
    let login_state = state.sessions.begin_login().await;
    let url = match state.provider.authorize_url(&login_state) {
        Ok(url) => url,
        Err(err) => {
            state.sessions.complete_login(&login_state).await;
            return Err(err.into());
        }
    };

    let cookie = Cookie::build((LOGIN_STATE_COOKIE, login_state))
        .path(LOGIN_STATE_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.secure_cookies);

    Ok((jar.add(cookie), Redirect::to(&url)))
}

#[utoipa::path(
    get,
    path = "/github/callback",
    tag = "Auth",
    params(CallbackParams),
    responses(
        (status = 303, description = "Session established; redirect to the post-login page"),
        (status = 401, description = "Login refused or state mismatch", body = ErrorBody)
    )
)]
async fn callback(
    State(state): State<AuthState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> AppResult<(CookieJar, Redirect)> {
    if let Some(error) = params.error {
        return Err(AuthError::Denied(error).into());
    }

    let returned = params.state.ok_or(AuthError::InvalidState)?;
    let expected = jar.get(LOGIN_STATE_COOKIE).map(|cookie| cookie.value().to_owned());
    if expected.as_deref() != Some(returned.as_str()) {
        return Err(AuthError::InvalidState.into());
    }
    if !state.sessions.complete_login(&returned).await {
        return Err(AuthError::InvalidState.into());
    }

    let code = params
        .code
        .ok_or_else(|| AuthError::Denied("no authorization code".to_string()))?;
    let (token, profile) = state.provider.exchange_code(&code).await?;
    let principal = authenticate(&token, profile)?;

    let session_id = state.sessions.create(principal).await;
    let jar = jar
        .remove(Cookie::build((LOGIN_STATE_COOKIE, "")).path(LOGIN_STATE_PATH))
        .add(session_cookie(
            state.sessions.cookie_name(),
            session_id,
            state.secure_cookies,
        ));

    Ok((jar, Redirect::to(&state.login_redirect)))
}

#[utoipa::path(
    get,
    path = "/logout",
    tag = "Auth",
    responses((status = 200, description = "Session closed", body = MessageBody))
)]
async fn logout(State(state): State<AuthState>, jar: CookieJar) -> (CookieJar, Envelope<()>) {
    let cookie_name = state.sessions.cookie_name().to_owned();
    if let Some(cookie) = jar.get(&cookie_name) {
        state.sessions.destroy(cookie.value()).await;
    }

    let jar = jar.remove(Cookie::build((cookie_name, "")).path("/"));
    (jar, Envelope::message("Logged out successfully"))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "The logged-in principal", body = PrincipalEnvelope),
        (status = 401, description = "No login session", body = ErrorBody)
    )
)]
async fn me(ctx: RequestContext) -> Envelope<Principal> {
    Envelope::data(ctx.principal)
}
