use crate::middleware::{OutboundRequest, RequestHook, ResponseHook};
use browser::{Location, Storage, StorageError};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use std::sync::Arc;

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "access_token";

/// Client-side path of the login view.
pub const LOGIN_PATH: &str = "/login";

/// Read/write access to the bearer token kept in durable storage.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn Storage>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The stored token, if there is a non-blank one.
    pub fn get(&self) -> Option<String> {
        self.storage
            .get(TOKEN_KEY)
            .filter(|token| !token.trim().is_empty())
    }

    pub fn set(&self, token: &str) -> Result<(), StorageError> {
        self.storage.set(TOKEN_KEY, token.trim())
    }

    /// Removes the token. A storage failure is logged, not returned: callers
    /// clear the token on their way to somewhere else.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(TOKEN_KEY) {
            tracing::warn!(error = %e, "Failed to clear the stored access token.");
        }
    }
}

/// Request hook attaching `Authorization: Bearer <token>` when a token is stored.
pub struct BearerAuth {
    tokens: TokenStore,
}

impl BearerAuth {
    pub fn new(tokens: TokenStore) -> Self {
        Self { tokens }
    }
}

impl RequestHook for BearerAuth {
    fn on_request(&self, request: &mut OutboundRequest) {
        let Some(token) = self.tokens.get() else {
            return;
        };
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!("Stored access token is not a valid header value; sending request without it.");
            }
        }
    }
}

/// Response hook for authentication failures.
///
/// On any 401 it clears the stored token and, unless the page is already the
/// login view, performs a full page navigation to it. The failed call still
/// fails for its caller.
pub struct UnauthorizedRedirect {
    tokens: TokenStore,
    location: Arc<dyn Location>,
    login_path: String,
}

impl UnauthorizedRedirect {
    pub fn new(tokens: TokenStore, location: Arc<dyn Location>) -> Self {
        Self {
            tokens,
            location,
            login_path: LOGIN_PATH.to_string(),
        }
    }
}

impl ResponseHook for UnauthorizedRedirect {
    fn on_response(&self, request: &OutboundRequest, status: StatusCode) {
        if status != StatusCode::UNAUTHORIZED {
            return;
        }
        tracing::debug!(path = %request.path, "API answered 401, dropping credentials.");
        self.tokens.clear();
        if self.location.pathname() != self.login_path {
            self.location.assign(&self.login_path);
        }
    }
}
