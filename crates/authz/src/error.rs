use libris_http::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("login state is missing, expired, or does not match")]
    InvalidState,

    #[error("identity provider denied the login: {0}")]
    Denied(String),

    #[error("identity provider returned no access token")]
    MissingToken,

    #[error("identity provider profile is unusable: {0}")]
    InvalidProfile(String),

    #[error("OAuth client is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("identity provider request failed: {0}")]
    Provider(#[from] reqwest::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => AppError::unauthorized("Authentication required"),
            AuthError::NotConfigured(_) | AuthError::Provider(_) => {
                AppError::Internal(anyhow::Error::new(err))
            }
            other => AppError::unauthorized(format!("Login failed: {}", other)),
        }
    }
}
