use crate::error::RequestError;
use crate::middleware::{OutboundRequest, Pipeline, RequestHook, ResponseHook};
use async_trait::async_trait;
use configuration::ApiSettings;
use core_types::{BacktestRequest, CompareRequest, HistoryQuery, OptimizeRequest};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

pub mod auth;
pub mod error;
pub mod middleware;
pub mod responses;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// --- Public API ---
pub use auth::{BearerAuth, LOGIN_PATH, TOKEN_KEY, TokenStore, UnauthorizedRedirect};
pub use responses::ApiResponse;
pub use reqwest::{Method, StatusCode};

/// The backtest server's HTTP API, one operation per endpoint.
///
/// Every operation resolves to the raw response or fails with a
/// [`RequestError`]. Nothing is retried. This trait is the contract the session
/// and views use, so the HTTP implementation can be swapped for a fake.
#[async_trait]
pub trait BacktestApi: Send + Sync {
    /// `GET /items`
    async fn get_items(&self) -> Result<ApiResponse, RequestError>;
    /// `GET /items/{id}`
    async fn get_item(&self, id: i64) -> Result<ApiResponse, RequestError>;
    /// `POST /items`
    async fn create_item(&self, item: &Value) -> Result<ApiResponse, RequestError>;
    /// `DELETE /items/{id}`
    async fn delete_item(&self, id: i64) -> Result<ApiResponse, RequestError>;
    /// `GET /health`
    async fn health_check(&self) -> Result<ApiResponse, RequestError>;

    /// `POST /backtest/run`
    async fn run_backtest(&self, request: &BacktestRequest) -> Result<ApiResponse, RequestError>;
    /// `GET /backtest/dashboard`
    async fn get_dashboard(&self) -> Result<ApiResponse, RequestError>;
    /// `GET /backtest/history`
    async fn get_history(&self, query: &HistoryQuery) -> Result<ApiResponse, RequestError>;
    /// `GET /backtest/result/{id}`
    async fn get_backtest_result(&self, id: i64) -> Result<ApiResponse, RequestError>;
    /// `DELETE /backtest/history/{id}`
    async fn delete_history(&self, id: i64) -> Result<ApiResponse, RequestError>;

    /// `POST /strategy/compare` with body `{ "ids": [...] }`
    async fn compare_strategies(&self, ids: &[i64]) -> Result<ApiResponse, RequestError>;
    /// `POST /strategy/optimize`
    async fn optimize_strategy(&self, request: &OptimizeRequest) -> Result<ApiResponse, RequestError>;

    /// `GET /auth/check`
    async fn check_auth(&self) -> Result<ApiResponse, RequestError>;
    /// `GET /auth/me`
    async fn get_me(&self) -> Result<ApiResponse, RequestError>;
    /// `POST /auth/logout`
    async fn logout(&self) -> Result<ApiResponse, RequestError>;
}

/// The reqwest-backed implementation of [`BacktestApi`].
///
/// Each call runs the request hooks in order, sends the request, runs the
/// response hooks in order for any response that arrived, and only then
/// classifies the status.
#[derive(Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: Url,
    pipeline: Pipeline,
}

/// Collects hooks before the client is built.
pub struct HttpApiClientBuilder {
    base_url: Url,
    pipeline: Pipeline,
}

impl HttpApiClientBuilder {
    pub fn request_hook(mut self, hook: impl RequestHook + 'static) -> Self {
        self.pipeline.push_request_hook(Arc::new(hook));
        self
    }

    pub fn response_hook(mut self, hook: impl ResponseHook + 'static) -> Self {
        self.pipeline.push_response_hook(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<HttpApiClient, RequestError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(HttpApiClient {
            client,
            base_url: self.base_url,
            pipeline: self.pipeline,
        })
    }
}

impl HttpApiClient {
    /// Starts a client for the given absolute base URL. A missing trailing
    /// slash is added so endpoint paths append to the base path.
    pub fn builder(mut base_url: Url) -> HttpApiClientBuilder {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        HttpApiClientBuilder {
            base_url,
            pipeline: Pipeline::default(),
        }
    }

    /// Starts a client for the configured API base.
    pub fn builder_from_settings(settings: &ApiSettings) -> Result<HttpApiClientBuilder, RequestError> {
        Ok(Self::builder(settings.resolve_base_url()?))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn send(&self, mut request: OutboundRequest) -> Result<ApiResponse, RequestError> {
        self.pipeline.before_send(&mut request);

        let mut url = self.base_url.join(request.path.trim_start_matches('/'))?;
        url.set_query(request.query.as_deref());

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(method = %request.method, path = %request.path, error = %e, "API request failed without a response.");
                return Err(RequestError::Transport(e));
            }
        };
        // Hooks need only the status; the body may still fail to arrive.
        let status = response.status();
        self.pipeline.after_receive(&request, status);

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) if !status.is_success() => {
                tracing::debug!(path = %request.path, %status, error = %e, "Failed to read error body.");
                String::new()
            }
            Err(e) => return Err(RequestError::Transport(e)),
        };

        if status.is_success() {
            Ok(ApiResponse::from_text(status, &text))
        } else {
            tracing::debug!(method = %request.method, path = %request.path, %status, "API request rejected.");
            Err(RequestError::Status { status, body: text })
        }
    }

    async fn get(&self, path: impl Into<String>) -> Result<ApiResponse, RequestError> {
        self.send(OutboundRequest::new(Method::GET, path)).await
    }

    async fn delete(&self, path: impl Into<String>) -> Result<ApiResponse, RequestError> {
        self.send(OutboundRequest::new(Method::DELETE, path)).await
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<ApiResponse, RequestError> {
        let body = serde_json::to_value(body)?;
        self.send(OutboundRequest::new(Method::POST, path).with_body(body))
            .await
    }
}

#[async_trait]
impl BacktestApi for HttpApiClient {
    async fn get_items(&self) -> Result<ApiResponse, RequestError> {
        self.get("items").await
    }

    async fn get_item(&self, id: i64) -> Result<ApiResponse, RequestError> {
        self.get(format!("items/{id}")).await
    }

    async fn create_item(&self, item: &Value) -> Result<ApiResponse, RequestError> {
        self.post("items", item).await
    }

    async fn delete_item(&self, id: i64) -> Result<ApiResponse, RequestError> {
        self.delete(format!("items/{id}")).await
    }

    async fn health_check(&self) -> Result<ApiResponse, RequestError> {
        self.get("health").await
    }

    async fn run_backtest(&self, request: &BacktestRequest) -> Result<ApiResponse, RequestError> {
        self.post("backtest/run", request).await
    }

    async fn get_dashboard(&self) -> Result<ApiResponse, RequestError> {
        self.get("backtest/dashboard").await
    }

    async fn get_history(&self, query: &HistoryQuery) -> Result<ApiResponse, RequestError> {
        let query = serde_qs::to_string(query)?;
        self.send(OutboundRequest::new(Method::GET, "backtest/history").with_query(query))
            .await
    }

    async fn get_backtest_result(&self, id: i64) -> Result<ApiResponse, RequestError> {
        self.get(format!("backtest/result/{id}")).await
    }

    async fn delete_history(&self, id: i64) -> Result<ApiResponse, RequestError> {
        self.delete(format!("backtest/history/{id}")).await
    }

    async fn compare_strategies(&self, ids: &[i64]) -> Result<ApiResponse, RequestError> {
        let body = CompareRequest { ids: ids.to_vec() };
        self.post("strategy/compare", &body).await
    }

    async fn optimize_strategy(&self, request: &OptimizeRequest) -> Result<ApiResponse, RequestError> {
        self.post("strategy/optimize", request).await
    }

    async fn check_auth(&self) -> Result<ApiResponse, RequestError> {
        self.get("auth/check").await
    }

    async fn get_me(&self) -> Result<ApiResponse, RequestError> {
        self.get("auth/me").await
    }

    async fn logout(&self) -> Result<ApiResponse, RequestError> {
        self.send(OutboundRequest::new(Method::POST, "auth/logout")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser::{HeadlessWindow, Location, MemoryStorage};
    use core_types::StrategyType;
    use httpmock::prelude::*;
    use reqwest::StatusCode;
    use serde_json::json;

    fn sample_request(start: &str) -> BacktestRequest {
        BacktestRequest::new(
            "test",
            "2330.TW",
            start.parse().unwrap(),
            "2023-12-31".parse().unwrap(),
        )
    }

    struct Fixture {
        client: HttpApiClient,
        tokens: TokenStore,
        window: Arc<HeadlessWindow>,
    }

    fn fixture(base: &str) -> Fixture {
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
        let window = Arc::new(HeadlessWindow::new(Url::parse("http://localhost:5173").unwrap()));
        let client = HttpApiClient::builder(Url::parse(base).unwrap())
            .request_hook(BearerAuth::new(tokens.clone()))
            .response_hook(UnauthorizedRedirect::new(tokens.clone(), window.clone()))
            .build()
            .unwrap();
        Fixture {
            client,
            tokens,
            window,
        }
    }

    fn api_base(server: &MockServer) -> String {
        format!("{}/api", server.base_url())
    }

    #[tokio::test]
    async fn get_items_returns_raw_json_with_bearer_token() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/items")
                .header("authorization", "Bearer jwt-1")
                .header("content-type", "application/json");
            then.status(200).json_body(json!([{ "id": 1, "name": "first" }]));
        });

        let fx = fixture(&api_base(&server));
        fx.tokens.set("jwt-1").unwrap();
        let response = fx.client.get_items().await.unwrap();

        mock.assert();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, json!([{ "id": 1, "name": "first" }]));
    }

    #[tokio::test]
    async fn requests_without_token_carry_no_authorization_header() {
        let server = MockServer::start_async().await;
        // Only matches when the header is present; anything else falls through to a 404.
        server.mock(|when, then| {
            when.method(GET).path("/api/health").header_exists("authorization");
            then.status(200);
        });

        let fx = fixture(&api_base(&server));
        let err = fx.client.health_check().await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn history_query_object_becomes_query_parameters() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/backtest/history")
                .query_param("page", "2")
                .query_param("limit", "10")
                .query_param("stock", "AAPL");
            then.status(200).json_body(json!([]));
        });

        let fx = fixture(&api_base(&server));
        let query = HistoryQuery {
            page: Some(2),
            limit: Some(10),
            strategy: None,
            stock: Some("AAPL".to_string()),
        };
        fx.client.get_history(&query).await.unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn compare_posts_ids_body() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/strategy/compare")
                .json_body(json!({ "ids": [3, 7] }));
            then.status(200).json_body(json!({ "metrics": [], "equityCurves": {} }));
        });

        let fx = fixture(&api_base(&server));
        let response = fx.client.compare_strategies(&[3, 7]).await.unwrap();

        mock.assert();
        assert_eq!(response.body["metrics"], json!([]));
    }

    #[tokio::test]
    async fn run_backtest_posts_request_body() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/backtest/run")
                .body_includes("\"strategy_type\":\"MA_CROSS\"")
                .body_includes("\"start_date\":\"2021-06-01\"");
            then.status(200).json_body(json!({ "id": 42 }));
        });

        let fx = fixture(&api_base(&server));
        let request = sample_request("2021-06-01");
        assert_eq!(request.strategy_type, StrategyType::MaCross);
        let response = fx.client.run_backtest(&request).await.unwrap();

        mock.assert();
        assert_eq!(response.body["id"], json!(42));
    }

    #[tokio::test]
    async fn delete_paths_carry_the_id() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/api/backtest/history/9");
            then.status(200).json_body(json!({ "message": "deleted", "id": 9 }));
        });

        let fx = fixture(&api_base(&server));
        fx.client.delete_history(9).await.unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn unauthorized_clears_token_redirects_and_still_fails() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/backtest/dashboard");
            then.status(401).json_body(json!({ "detail": "Not authenticated" }));
        });

        let fx = fixture(&api_base(&server));
        fx.tokens.set("expired").unwrap();
        fx.window.push_state("/");

        let err = fx.client.get_dashboard().await.unwrap_err();

        // Exactly one request: no retry after the 401.
        mock.assert();
        assert!(err.is_unauthorized());
        assert!(matches!(&err, RequestError::Status { body, .. } if body.contains("Not authenticated")));
        assert_eq!(fx.tokens.get(), None);
        assert_eq!(fx.window.page_loads(), vec!["/login"]);
        assert_eq!(fx.window.pathname(), "/login");
    }

    #[tokio::test]
    async fn unauthorized_on_login_page_does_not_navigate() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/auth/me");
            then.status(401);
        });

        let fx = fixture(&api_base(&server));
        fx.window.push_state("/login");

        let err = fx.client.get_me().await.unwrap_err();

        assert!(err.is_unauthorized());
        assert!(fx.window.page_loads().is_empty());
    }

    #[tokio::test]
    async fn server_errors_carry_status_and_body_without_redirect() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/strategy/optimize");
            then.status(400).body("param1_range must have two values");
        });

        let fx = fixture(&api_base(&server));
        fx.tokens.set("valid").unwrap();
        let request = OptimizeRequest {
            strategy_type: StrategyType::Rsi,
            stock_symbol: "AAPL".into(),
            start_date: "2020-01-01".parse().unwrap(),
            end_date: "2021-01-01".parse().unwrap(),
            param1_range: [10, 20],
            param1_step: 2,
            param2_range: [60, 80],
            param2_step: 5,
        };
        let err = fx.client.optimize_strategy(&request).await.unwrap_err();

        match err {
            RequestError::Status { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body, "param1_range must have two values");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fx.tokens.get().as_deref(), Some("valid"));
        assert!(fx.window.page_loads().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_has_no_side_effects() {
        // Nothing listens on port 1.
        let fx = fixture("http://127.0.0.1:1/api");
        fx.tokens.set("kept").unwrap();

        let err = fx.client.check_auth().await.unwrap_err();

        assert!(matches!(err, RequestError::Transport(_)));
        assert_eq!(err.status(), None);
        assert_eq!(fx.tokens.get().as_deref(), Some("kept"));
        assert!(fx.window.page_loads().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_with_truncated_body_still_signs_out() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            // Promises 100 bytes of body, sends 9, then hangs up.
            socket
                .write_all(b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 100\r\n\r\n{\"detail\"")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let fx = fixture(&format!("http://{addr}/api"));
        fx.tokens.set("stale").unwrap();
        fx.window.push_state("/history");

        let err = fx.client.get_dashboard().await.unwrap_err();
        server.await.unwrap();

        assert!(err.is_unauthorized());
        assert_eq!(fx.tokens.get(), None);
        assert_eq!(fx.window.page_loads(), vec!["/login"]);
    }

    #[test]
    fn builder_appends_trailing_slash_to_base() {
        let builder = HttpApiClient::builder(Url::parse("http://localhost:8000/api").unwrap());
        assert_eq!(builder.base_url.as_str(), "http://localhost:8000/api/");
    }
}
