use crate::routes::Route;
use api_client::LOGIN_PATH;
use session::SessionState;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::form_urlencoded;

/// What the guard decided for one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Navigate here instead.
    Redirect(String),
}

/// Keeps signed-out users away from protected routes.
///
/// The session is validated against the server once per process, on the first
/// protected navigation. Navigations that arrive while that validation is in
/// flight wait for it instead of starting their own. Later decisions read the
/// cached session, which 401 responses and logout keep current.
pub struct AuthGuard {
    session: Arc<SessionState>,
    validated: OnceCell<bool>,
}

impl AuthGuard {
    pub fn new(session: Arc<SessionState>) -> Self {
        Self {
            session,
            validated: OnceCell::new(),
        }
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    /// Whether the one-shot validation has completed.
    pub fn has_validated(&self) -> bool {
        self.validated.initialized()
    }

    /// Counts a validation that happened outside the guard (OAuth completion)
    /// as the one-shot check. Does nothing once the check has run.
    pub fn record_validation(&self, authenticated: bool) {
        if self.validated.set(authenticated).is_err() {
            tracing::debug!("Session already validated, keeping the first result.");
        }
    }

    /// `requested` is the full path (with query) the user asked for; it is
    /// carried to the login page so the user can be sent back afterwards.
    pub async fn check(&self, route: &Route, requested: &str) -> GuardDecision {
        if route.meta.public {
            return GuardDecision::Allow;
        }

        self.validated
            .get_or_init(|| async {
                tracing::debug!("First protected navigation, validating session.");
                self.session.validate().await
            })
            .await;

        if self.session.is_authenticated() {
            GuardDecision::Allow
        } else {
            tracing::debug!(requested, "Not signed in, redirecting to login.");
            GuardDecision::Redirect(login_location(requested))
        }
    }
}

/// `/login?redirect=<requested>`.
pub fn login_location(requested: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(requested.as_bytes()).collect();
    format!("{LOGIN_PATH}?redirect={encoded}")
}

/// Where to go after signing in, given the login page's query string.
///
/// Only in-app absolute paths are honoured; anything else goes to `/`.
pub fn post_login_target(query: &str) -> String {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == "redirect")
        .map(|(_, value)| value.into_owned())
        .filter(|target| is_in_app_path(target))
        .unwrap_or_else(|| "/".to_string())
}

/// An absolute path on this origin (`/...`, but not a protocol-relative `//...`).
pub fn is_in_app_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_location_encodes_requested_path() {
        assert_eq!(login_location("/history"), "/login?redirect=%2Fhistory");
        assert_eq!(
            login_location("/history?page=2"),
            "/login?redirect=%2Fhistory%3Fpage%3D2"
        );
    }

    #[test]
    fn post_login_target_round_trips_login_location() {
        let location = login_location("/history?page=2");
        let query = location.split_once('?').unwrap().1;
        assert_eq!(post_login_target(query), "/history?page=2");
    }

    #[test]
    fn post_login_target_rejects_foreign_destinations() {
        assert_eq!(post_login_target(""), "/");
        assert_eq!(post_login_target("redirect=https%3A%2F%2Fevil.example"), "/");
        assert_eq!(post_login_target("redirect=%2F%2Fevil.example"), "/");
        assert_eq!(post_login_target("?other=1&redirect=%2Fcompare"), "/compare");
    }
}
