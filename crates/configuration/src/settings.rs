use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

/// The root configuration structure for the console client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

/// Where the backend API lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the API. May be relative (the default `/api`), in which case
    /// it is resolved against `origin` the way a browser resolves it against
    /// the page's origin.
    pub base_url: String,
    /// The origin the application is served from.
    pub origin: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "/api".to_string(),
            origin: "http://localhost:8000".to_string(),
        }
    }
}

impl ApiSettings {
    /// Resolves the configured base into an absolute URL that always ends with
    /// a `/`, so endpoint paths can be joined onto it without losing the
    /// `/api` segment.
    pub fn resolve_base_url(&self) -> Result<Url, ConfigError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::ValidationError(
                "api.base_url must not be empty".to_string(),
            ));
        }

        let mut url = match Url::parse(base) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let origin = Url::parse(self.origin.trim()).map_err(|e| {
                    ConfigError::ValidationError(format!("api.origin '{}': {}", self.origin, e))
                })?;
                origin.join(base).map_err(|e| {
                    ConfigError::ValidationError(format!("api.base_url '{}': {}", base, e))
                })?
            }
            Err(e) => {
                return Err(ConfigError::ValidationError(format!(
                    "api.base_url '{}': {}",
                    base, e
                )));
            }
        };

        if url.cannot_be_a_base() {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url '{}' cannot carry endpoint paths",
                base
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

/// Durable client-side storage (theme preference, bearer token).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// JSON file backing the key-value store.
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".backtest-console.json"),
        }
    }
}

/// Logging output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs go to a daily rolling file in this directory instead of stderr.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "backtest-console.log".to_string(),
        }
    }
}
