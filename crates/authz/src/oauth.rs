//! OAuth 2.0 client side of the GitHub login
//!
//! The web layer drives the handshake; this module only knows how to build
//! the authorize URL, trade a code for a token, and fetch the profile.

use async_trait::async_trait;
use reqwest::{header, Url};
use serde::Deserialize;

use libris_kernel::settings::AuthSettings;

use crate::{
    error::AuthError,
    principal::{Principal, Profile},
};

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_URL: &str = "https://api.github.com/user";
const USER_AGENT: &str = concat!("libris/", env!("CARGO_PKG_VERSION"));

/// Bearer token issued by the provider
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(****)")
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start a login
    fn authorize_url(&self, state: &str) -> Result<String, AuthError>;

    /// Trade an authorization code for a token and the caller's profile
    async fn exchange_code(&self, code: &str) -> Result<(AccessToken, Profile), AuthError>;
}

/// Turn the provider's answer into a principal, or refuse it.
pub fn authenticate(token: &AccessToken, profile: Profile) -> Result<Principal, AuthError> {
    if token.secret().trim().is_empty() {
        return Err(AuthError::MissingToken);
    }
    if profile.login.trim().is_empty() {
        return Err(AuthError::InvalidProfile("empty login".to_string()));
    }

    Ok(Principal {
        username: profile.login.clone(),
        profile,
    })
}

pub struct GithubProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    callback_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
    html_url: Option<String>,
}

impl From<GithubUser> for Profile {
    fn from(user: GithubUser) -> Self {
        Profile {
            id: user.id,
            login: user.login,
            name: user.name,
            avatar_url: user.avatar_url,
            html_url: user.html_url,
        }
    }
}

impl GithubProvider {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            callback_url: callback_url.into(),
        })
    }

    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthError> {
        if settings.github_client_id.is_empty() || settings.github_client_secret.is_empty() {
            tracing::warn!("GitHub OAuth credentials are not configured; logins will fail");
        }
        Self::new(
            settings.github_client_id.clone(),
            settings.github_client_secret.clone(),
            settings.callback_url.clone(),
        )
    }

    fn ensure_configured(&self) -> Result<(), AuthError> {
        if self.client_id.is_empty() {
            return Err(AuthError::NotConfigured("github_client_id"));
        }
        if self.client_secret.is_empty() {
            return Err(AuthError::NotConfigured("github_client_secret"));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for GithubProvider {
    fn authorize_url(&self, state: &str) -> Result<String, AuthError> {
        self.ensure_configured()?;
        let url = Url::parse_with_params(
            GITHUB_AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.callback_url.as_str()),
                ("scope", "read:user"),
                ("state", state),
            ],
        )
        .map_err(|_| AuthError::NotConfigured("authorize url"))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<(AccessToken, Profile), AuthError> {
        self.ensure_configured()?;

        let token: TokenResponse = self
            .http
            .post(GITHUB_TOKEN_URL)
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.callback_url.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = token.error {
            let reason = token.error_description.unwrap_or(error);
            return Err(AuthError::Denied(reason));
        }
        let token = AccessToken::new(token.access_token.ok_or(AuthError::MissingToken)?);

        let user: GithubUser = self
            .http
            .get(GITHUB_USER_URL)
            .bearer_auth(token.secret())
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(login = %user.login, "fetched GitHub profile");
        Ok((token, user.into()))
    }
}
