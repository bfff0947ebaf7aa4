/// The page a route renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Backtest,
    Compare,
    Optimize,
    History,
    Login,
    AuthCallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMeta {
    pub title: Option<&'static str>,
    /// Reachable without signing in.
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub name: &'static str,
    pub view: View,
    pub meta: RouteMeta,
}

impl Route {
    const fn protected(path: &'static str, name: &'static str, view: View, title: &'static str) -> Self {
        Self {
            path,
            name,
            view,
            meta: RouteMeta {
                title: Some(title),
                public: false,
            },
        }
    }

    const fn public(path: &'static str, name: &'static str, view: View, title: Option<&'static str>) -> Self {
        Self {
            path,
            name,
            view,
            meta: RouteMeta { title, public: true },
        }
    }
}

/// Suffix appended to every page title.
pub const TITLE_SUFFIX: &str = " - Stock Backtester";

/// Title used for routes that do not declare one.
pub const FALLBACK_TITLE: &str = "Stock Backtest";

/// The document title shown while `route` is active.
pub fn page_title(route: &Route) -> String {
    format!("{}{TITLE_SUFFIX}", route.meta.title.unwrap_or(FALLBACK_TITLE))
}

/// The application's route table.
pub fn default_routes() -> Vec<Route> {
    vec![
        Route::protected("/", "Dashboard", View::Dashboard, "Dashboard"),
        Route::protected("/backtest", "Backtest", View::Backtest, "Backtest"),
        Route::protected("/compare", "Compare", View::Compare, "Compare Strategies"),
        Route::protected("/optimize", "Optimize", View::Optimize, "Optimize Parameters"),
        Route::protected("/history", "History", View::History, "History"),
        Route::public("/login", "Login", View::Login, Some("Login")),
        Route::public("/auth/callback", "AuthCallback", View::AuthCallback, None),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_login_and_callback_are_public() {
        let public: Vec<_> = default_routes()
            .into_iter()
            .filter(|r| r.meta.public)
            .map(|r| r.path)
            .collect();
        assert_eq!(public, vec!["/login", "/auth/callback"]);
    }

    #[test]
    fn untitled_routes_use_fallback_title() {
        let routes = default_routes();
        let dashboard = routes.iter().find(|r| r.view == View::Dashboard).unwrap();
        let callback = routes.iter().find(|r| r.view == View::AuthCallback).unwrap();

        assert_eq!(page_title(dashboard), "Dashboard - Stock Backtester");
        assert_eq!(page_title(callback), "Stock Backtest - Stock Backtester");
    }
}
