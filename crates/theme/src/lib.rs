use browser::{Document, Storage};
use core_types::ThemeMode;
use std::sync::Arc;
use tokio::sync::watch;

/// Storage key of the persisted preference.
pub const THEME_KEY: &str = "stock-app-theme";

/// Root element class present exactly when dark mode is on.
pub const DARK_CLASS: &str = "dark";

/// The light/dark preference, persisted and mirrored onto the document.
///
/// The document class and the stored value are written inside the same update
/// as the mode itself, so readers never observe them out of step. A failed
/// storage write is logged and otherwise ignored: the in-memory mode and the
/// document class still change, and the stored value catches up on the next
/// successful write.
pub struct ThemeState {
    mode: watch::Sender<ThemeMode>,
    storage: Arc<dyn Storage>,
    document: Arc<dyn Document>,
}

impl ThemeState {
    /// Reads the persisted preference (light when absent or unrecognised),
    /// applies it to the document and writes it back, so an unrecognised
    /// value is replaced by the mode in effect.
    pub fn load(storage: Arc<dyn Storage>, document: Arc<dyn Document>) -> Self {
        let stored = storage.get(THEME_KEY);
        let mode = ThemeMode::from_stored(stored.as_deref());
        tracing::debug!(mode = mode.as_str(), "Loaded theme preference.");

        let (sender, _) = watch::channel(mode);
        let state = Self {
            mode: sender,
            storage,
            document,
        };
        state.apply(mode);
        state
    }

    pub fn mode(&self) -> ThemeMode {
        *self.mode.borrow()
    }

    pub fn is_dark(&self) -> bool {
        self.mode().is_dark()
    }

    /// Flips between light and dark and returns the new mode.
    pub fn toggle(&self) -> ThemeMode {
        let mut next = ThemeMode::default();
        self.mode.send_modify(|mode| {
            *mode = mode.toggled();
            self.apply(*mode);
            next = *mode;
        });
        next
    }

    pub fn set(&self, mode: ThemeMode) {
        self.mode.send_if_modified(|current| {
            if *current == mode {
                return false;
            }
            *current = mode;
            self.apply(mode);
            true
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemeMode> {
        self.mode.subscribe()
    }

    fn apply(&self, mode: ThemeMode) {
        self.document.set_root_class(DARK_CLASS, mode.is_dark());
        if let Err(e) = self.storage.set(THEME_KEY, mode.as_str()) {
            tracing::warn!(error = %e, "Failed to persist theme preference.");
        }
        tracing::debug!(mode = mode.as_str(), "Theme changed.");
    }
}
