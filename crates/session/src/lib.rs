//! Who is logged in.
//!
//! [`CurrentUser`] is the process-wide cache of the signed-in user;
//! [`SessionState`] owns the operations that change it.

use api_client::error::RequestError;
use api_client::middleware::{OutboundRequest, ResponseHook};
use api_client::{BacktestApi, StatusCode, TokenStore};
use browser::Location;
use core_types::{AuthStatus, UserInfo};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use url::Url;

/// The signed-in user, shared by everything that needs to know.
///
/// `is_authenticated` is derived from the stored user and never stored on its
/// own. Clones share the same cell.
#[derive(Clone)]
pub struct CurrentUser {
    cell: Arc<watch::Sender<Option<UserInfo>>>,
}

impl Default for CurrentUser {
    fn default() -> Self {
        let (cell, _) = watch::channel(None);
        Self {
            cell: Arc::new(cell),
        }
    }
}

impl CurrentUser {
    pub fn get(&self) -> Option<UserInfo> {
        self.cell.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.cell.borrow().is_some()
    }

    /// Receives every change to the signed-in user.
    pub fn subscribe(&self) -> watch::Receiver<Option<UserInfo>> {
        self.cell.subscribe()
    }

    fn replace(&self, user: Option<UserInfo>) {
        self.cell.send_replace(user);
    }
}

/// Any 401 from the API means the server no longer recognises us.
impl ResponseHook for CurrentUser {
    fn on_response(&self, _request: &OutboundRequest, status: StatusCode) {
        if status == StatusCode::UNAUTHORIZED && self.is_authenticated() {
            tracing::debug!("Clearing cached user after a 401.");
            self.replace(None);
        }
    }
}

/// Builds the backend's OAuth entry point from the API base.
pub fn oauth_entry_url(api_base: &Url) -> String {
    format!("{}/auth/google", api_base.as_str().trim_end_matches('/'))
}

/// Decrements the in-flight count when a validation ends, however it ends.
struct Loading<'a>(&'a AtomicUsize);

impl<'a> Loading<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct SessionState {
    api: Arc<dyn BacktestApi>,
    user: CurrentUser,
    tokens: TokenStore,
    location: Arc<dyn Location>,
    oauth_entry: String,
    validations_in_flight: AtomicUsize,
}

impl SessionState {
    pub fn new(
        api: Arc<dyn BacktestApi>,
        user: CurrentUser,
        tokens: TokenStore,
        location: Arc<dyn Location>,
        api_base: &Url,
    ) -> Self {
        Self {
            api,
            user,
            tokens,
            location,
            oauth_entry: oauth_entry_url(api_base),
            validations_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn current_user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.user.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_authenticated()
    }

    /// True while a [`validate`](Self::validate) call is waiting on the server.
    pub fn is_loading(&self) -> bool {
        self.validations_in_flight.load(Ordering::SeqCst) > 0
    }

    /// Asks the server who we are and caches the answer.
    ///
    /// Never fails: a negative answer, a malformed answer and a failed request
    /// all clear the user and return `false`.
    pub async fn validate(&self) -> bool {
        let _loading = Loading::start(&self.validations_in_flight);

        let user = match self
            .api
            .check_auth()
            .await
            .and_then(|response| response.json::<AuthStatus>())
        {
            Ok(AuthStatus {
                authenticated: true,
                user: Some(user),
            }) => Some(user),
            Ok(AuthStatus {
                authenticated: true,
                user: None,
            }) => {
                tracing::warn!("Auth check reported authenticated without a user.");
                None
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Auth check failed; treating session as signed out.");
                None
            }
        };

        let authenticated = user.is_some();
        if let Some(user) = &user {
            tracing::debug!(user_id = user.id, "Session validated.");
        }
        self.user.replace(user);
        authenticated
    }

    /// The OAuth entry URL [`login_redirect`](Self::login_redirect) navigates to.
    pub fn oauth_entry(&self) -> &str {
        &self.oauth_entry
    }

    /// Leaves the application for the identity provider. This is a full page
    /// navigation, not a route change.
    pub fn login_redirect(&self) {
        tracing::info!(target = %self.oauth_entry, "Starting OAuth login.");
        self.location.assign(&self.oauth_entry);
    }

    /// Finishes the OAuth round trip: the backend hands the access token back
    /// on the callback route. Stores it and re-validates the session.
    pub async fn complete_oauth_callback(&self, token: &str) -> bool {
        if token.trim().is_empty() {
            tracing::warn!("OAuth callback arrived without a token.");
            return false;
        }
        if let Err(e) = self.tokens.set(token) {
            tracing::warn!(error = %e, "Failed to store the access token.");
            return false;
        }
        let authenticated = self.validate().await;
        if authenticated {
            tracing::info!("Signed in.");
        }
        authenticated
    }

    /// Reloads the user's profile from `GET /auth/me`.
    pub async fn refresh_user(&self) -> Result<UserInfo, RequestError> {
        let user = self.api.get_me().await?.json::<UserInfo>()?;
        self.user.replace(Some(user.clone()));
        Ok(user)
    }

    /// Signs out. The server call is best effort; locally the user and the
    /// stored token are always cleared.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::warn!(error = %e, "Logout request failed; clearing local session anyway.");
        }
        self.tokens.clear();
        self.user.replace(None);
    }
}
