//! Authentication for Libris: server-side sessions, the login guard, and
//! the GitHub OAuth client.
//!
//! There is exactly one permission level. A request either carries a live
//! session cookie, in which case the guard hands a [`RequestContext`] to the
//! handler, or it is refused with 401 before anything else runs.

pub mod error;
pub mod guard;
pub mod module;
pub mod oauth;
pub mod principal;
pub mod session;

pub use error::AuthError;
pub use guard::{require_session, RequestContext, SessionCookieScheme, SESSION_SCHEME};
pub use module::{create_module, SessionModule};
pub use oauth::{authenticate, AccessToken, GithubProvider, IdentityProvider};
pub use principal::{Principal, Profile};
pub use session::SessionStore;
