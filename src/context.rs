use crate::error::AppError;
use api_client::{BearerAuth, HttpApiClient, TokenStore, UnauthorizedRedirect};
use browser::{FileStorage, HeadlessWindow, Location, Storage};
use configuration::ClientConfig;
use configuration::error::ConfigError;
use core_types::UserInfo;
use router::{AuthGuard, ResolvedRoute, Router, View, default_routes, is_in_app_path, post_login_target};
use session::{CurrentUser, SessionState};
use std::sync::Arc;
use theme::ThemeState;
use url::Url;

/// Storage key of the page to open once the OAuth round trip completes.
pub const POST_LOGIN_KEY: &str = "post_login_redirect";

/// Route the backend's OAuth callback lands on.
pub const AUTH_CALLBACK_PATH: &str = "/auth/callback";

/// Everything the client shares, built once at start-up.
pub struct AppContext {
    config: ClientConfig,
    storage: Arc<dyn Storage>,
    window: Arc<HeadlessWindow>,
    api: Arc<HttpApiClient>,
    tokens: TokenStore,
    session: Arc<SessionState>,
    theme: ThemeState,
    router: Router,
}

impl AppContext {
    /// Builds the context with the JSON file storage named in the configuration.
    pub fn from_config(config: ClientConfig) -> Result<Self, AppError> {
        let storage = Arc::new(FileStorage::open(&config.storage.path)?);
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: ClientConfig, storage: Arc<dyn Storage>) -> Result<Self, AppError> {
        let origin = Url::parse(config.api.origin.trim()).map_err(|e| {
            ConfigError::ValidationError(format!("api.origin '{}': {}", config.api.origin, e))
        })?;
        let window = Arc::new(HeadlessWindow::new(origin));
        let tokens = TokenStore::new(storage.clone());
        let user = CurrentUser::default();

        let api = Arc::new(
            HttpApiClient::builder_from_settings(&config.api)?
                .request_hook(BearerAuth::new(tokens.clone()))
                .response_hook(user.clone())
                .response_hook(UnauthorizedRedirect::new(tokens.clone(), window.clone()))
                .build()?,
        );
        tracing::debug!(base_url = %api.base_url(), "API client ready.");

        let session = Arc::new(SessionState::new(
            api.clone(),
            user,
            tokens.clone(),
            window.clone(),
            api.base_url(),
        ));
        let theme = ThemeState::load(storage.clone(), window.clone());
        let router = Router::new(
            default_routes(),
            AuthGuard::new(session.clone()),
            window.clone(),
            window.clone(),
        );

        Ok(Self {
            config,
            storage,
            window,
            api,
            tokens,
            session,
            theme,
            router,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &HttpApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn theme(&self) -> &ThemeState {
        &self.theme
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn window(&self) -> &HeadlessWindow {
        &self.window
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Remembers where to go after signing in, then leaves for the identity
    /// provider. Destinations outside the application are ignored. Without an
    /// explicit destination, the login page's `redirect` parameter is used.
    pub fn begin_login(&self, return_to: Option<&str>) -> Result<(), AppError> {
        match return_to {
            Some(path) if is_in_app_path(path) => self.storage.set(POST_LOGIN_KEY, path)?,
            Some(path) => {
                tracing::warn!(path, "Ignoring post-login destination outside the application.");
                self.storage.remove(POST_LOGIN_KEY)?;
            }
            None => match self.login_page_target() {
                Some(target) => self.storage.set(POST_LOGIN_KEY, &target)?,
                None => self.storage.remove(POST_LOGIN_KEY)?,
            },
        }
        self.session.login_redirect();
        Ok(())
    }

    /// Handles the OAuth callback: stores the token, validates it, and opens
    /// the remembered destination. Lands on the login page when the token is
    /// not accepted.
    pub async fn finish_login(&self, token: &str) -> Result<ResolvedRoute, AppError> {
        self.router.navigate(AUTH_CALLBACK_PATH).await?;

        let authenticated = self.session.complete_oauth_callback(token).await;
        self.router.guard().record_validation(authenticated);
        if !authenticated {
            self.tokens.clear();
            return Ok(self.router.navigate(api_client::LOGIN_PATH).await?);
        }

        let destination = self
            .storage
            .get(POST_LOGIN_KEY)
            .filter(|path| is_in_app_path(path))
            .unwrap_or_else(|| "/".to_string());
        self.storage.remove(POST_LOGIN_KEY)?;

        Ok(self.router.navigate(&destination).await?)
    }

    /// The signed-in user as the server sees them now, `None` when the server
    /// rejects the session. A rejection also runs the 401 hooks.
    pub async fn whoami(&self) -> Result<Option<UserInfo>, AppError> {
        match self.session.refresh_user().await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_unauthorized() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Signs out and shows the login page.
    pub async fn logout(&self) -> Result<ResolvedRoute, AppError> {
        self.session.logout().await;
        Ok(self.router.navigate(api_client::LOGIN_PATH).await?)
    }

    /// Destination carried by the login page, when that is the current page.
    fn login_page_target(&self) -> Option<String> {
        let current = self.router.current()?;
        (current.route.view == View::Login)
            .then(|| post_login_target(current.query.as_deref().unwrap_or_default()))
    }

    /// Path the page currently shows.
    pub fn current_path(&self) -> String {
        self.window.pathname()
    }
}
