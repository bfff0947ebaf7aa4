//! Client-side routing with an authentication guard.

pub mod error;
pub mod guard;
pub mod routes;

pub use error::RouterError;
pub use guard::{AuthGuard, GuardDecision, is_in_app_path, login_location, post_login_target};
pub use routes::{FALLBACK_TITLE, Route, RouteMeta, TITLE_SUFFIX, View, default_routes, page_title};

use browser::{Document, Location};
use std::sync::{Arc, Mutex, MutexGuard};
use url::form_urlencoded;

/// Redirect hops one navigation may take before it is abandoned.
const MAX_REDIRECTS: usize = 3;

/// A navigation that was allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub route: Route,
    /// Path plus query string, as pushed onto the history.
    pub full_path: String,
    /// Query string without the leading `?`.
    pub query: Option<String>,
}

impl ResolvedRoute {
    pub fn query_param(&self, key: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

pub struct Router {
    routes: Vec<Route>,
    guard: AuthGuard,
    document: Arc<dyn Document>,
    location: Arc<dyn Location>,
    current: Mutex<Option<ResolvedRoute>>,
}

impl Router {
    pub fn new(
        routes: Vec<Route>,
        guard: AuthGuard,
        document: Arc<dyn Document>,
        location: Arc<dyn Location>,
    ) -> Self {
        Self {
            routes,
            guard,
            document,
            location,
            current: Mutex::new(None),
        }
    }

    pub fn guard(&self) -> &AuthGuard {
        &self.guard
    }

    /// The route of the last allowed navigation.
    pub fn current(&self) -> Option<ResolvedRoute> {
        self.current_slot().clone()
    }

    /// Navigates to `target` (`/path?query#fragment`), following guard
    /// redirects. Every attempt, allowed or not, sets the document title.
    pub async fn navigate(&self, target: &str) -> Result<ResolvedRoute, RouterError> {
        let mut next = target.to_string();

        for _ in 0..=MAX_REDIRECTS {
            let resolved = self.resolve(&next)?;
            self.document.set_title(&page_title(&resolved.route));

            match self.guard.check(&resolved.route, &resolved.full_path).await {
                GuardDecision::Allow => {
                    tracing::debug!(path = %resolved.full_path, route = resolved.route.name, "Navigation allowed.");
                    self.location.push_state(&resolved.full_path);
                    *self.current_slot() = Some(resolved.clone());
                    return Ok(resolved);
                }
                GuardDecision::Redirect(location) => {
                    tracing::debug!(from = %resolved.full_path, to = %location, "Navigation redirected.");
                    next = location;
                }
            }
        }

        Err(RouterError::TooManyRedirects(target.to_string()))
    }

    /// Matches a target against the route table without navigating.
    pub fn resolve(&self, target: &str) -> Result<ResolvedRoute, RouterError> {
        let without_fragment = target.split('#').next().unwrap_or(target);
        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string()).filter(|q| !q.is_empty())),
            None => (without_fragment, None),
        };
        if !is_in_app_path(path) {
            return Err(RouterError::InvalidTarget(target.to_string()));
        }

        let normalized = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        let route = self
            .routes
            .iter()
            .find(|route| route.path == normalized)
            .cloned()
            .ok_or_else(|| RouterError::NotFound(normalized.to_string()))?;

        let full_path = match &query {
            Some(query) => format!("{normalized}?{query}"),
            None => normalized.to_string(),
        };
        Ok(ResolvedRoute {
            route,
            full_path,
            query,
        })
    }

    fn current_slot(&self) -> MutexGuard<'_, Option<ResolvedRoute>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
