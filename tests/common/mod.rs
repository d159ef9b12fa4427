#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use libris_app::{build_registry, modules::books::repository::MemoryBookRepository, Services};
use libris_authz::{authenticate, AccessToken, AuthError, IdentityProvider, Profile};
use libris_kernel::settings::Settings;

/// Provider that accepts the code `good` and nothing else
pub struct StubProvider;

#[async_trait]
impl IdentityProvider for StubProvider {
    fn authorize_url(&self, state: &str) -> Result<String, AuthError> {
        Ok(format!("https://github.test/login/oauth/authorize?state={state}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<(AccessToken, Profile), AuthError> {
        if code != "good" {
            return Err(AuthError::Denied("bad_verification_code".to_string()));
        }
        Ok((AccessToken::new("gho_stub"), octocat()))
    }
}

pub fn octocat() -> Profile {
    Profile {
        id: 583231,
        login: "octocat".to_string(),
        name: Some("The Octocat".to_string()),
        avatar_url: None,
        html_url: Some("https://github.com/octocat".to_string()),
    }
}

pub struct TestApp {
    pub router: Router,
    pub services: Services,
    pub store: MemoryBookRepository,
    pub settings: Settings,
}

impl TestApp {
    pub fn new() -> Self {
        let settings = Settings::default();
        let store = MemoryBookRepository::new();
        let services =
            Services::with_backends(Arc::new(store.clone()), Arc::new(StubProvider), &settings);
        let registry = build_registry(&services, &settings);
        let router = libris_http::build_router(&registry, &settings);

        Self {
            router,
            services,
            store,
            settings,
        }
    }

    /// Open a session directly and return the matching `Cookie` header
    pub async fn login(&self) -> String {
        let principal =
            authenticate(&AccessToken::new("gho_stub"), octocat()).expect("stub profile is valid");
        let id = self.services.sessions.create(principal).await;
        format!("{}={}", self.settings.auth.session_cookie, id)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .expect("body readable");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
