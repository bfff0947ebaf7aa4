use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// The parts of the DOM document the application writes to.
pub trait Document: Send + Sync {
    fn title(&self) -> String;
    fn set_title(&self, title: &str);
    /// Adds (`enabled`) or removes a class on the root element.
    fn set_root_class(&self, class: &str, enabled: bool);
    fn has_root_class(&self, class: &str) -> bool;
}

/// The page location.
///
/// `push_state` is a client-side route change that keeps the application
/// running; `assign` is a full page load that leaves it (or reloads it).
pub trait Location: Send + Sync {
    /// Path of the current page, without query string.
    fn pathname(&self) -> String;
    fn push_state(&self, path: &str);
    fn assign(&self, href: &str);
}

#[derive(Debug)]
struct WindowState {
    title: String,
    classes: BTreeSet<String>,
    pathname: String,
    history: Vec<String>,
    page_loads: Vec<String>,
}

/// An in-process stand-in for the browser window: a document and a location
/// that record everything done to them.
#[derive(Debug)]
pub struct HeadlessWindow {
    origin: Url,
    state: Mutex<WindowState>,
}

impl HeadlessWindow {
    /// Creates a window showing `/` on the given origin.
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            state: Mutex::new(WindowState {
                title: String::new(),
                classes: BTreeSet::new(),
                pathname: "/".to_string(),
                history: Vec::new(),
                page_loads: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every href passed to [`Location::assign`], oldest first.
    pub fn page_loads(&self) -> Vec<String> {
        self.state().page_loads.clone()
    }

    /// Every path passed to [`Location::push_state`], oldest first.
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }
}

impl Document for HeadlessWindow {
    fn title(&self) -> String {
        self.state().title.clone()
    }

    fn set_title(&self, title: &str) {
        self.state().title = title.to_string();
    }

    fn set_root_class(&self, class: &str, enabled: bool) {
        let mut state = self.state();
        if enabled {
            state.classes.insert(class.to_string());
        } else {
            state.classes.remove(class);
        }
    }

    fn has_root_class(&self, class: &str) -> bool {
        self.state().classes.contains(class)
    }
}

impl Location for HeadlessWindow {
    fn pathname(&self) -> String {
        self.state().pathname.clone()
    }

    fn push_state(&self, path: &str) {
        let mut state = self.state();
        state.pathname = path.split(['?', '#']).next().unwrap_or(path).to_string();
        state.history.push(path.to_string());
    }

    fn assign(&self, href: &str) {
        let mut state = self.state();
        match self.origin.join(href) {
            Ok(target) if target.origin() == self.origin.origin() => {
                tracing::info!(href, "Full page navigation.");
                state.pathname = target.path().to_string();
            }
            Ok(_) => tracing::info!(href, "Leaving the application."),
            Err(e) => tracing::warn!(href, error = %e, "Ignoring navigation to an invalid href."),
        }
        state.page_loads.push(href.to_string());
    }
}
