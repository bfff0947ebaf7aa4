//! A scripted, in-memory [`BacktestApi`] for tests of code that sits on top of the client.

use crate::error::RequestError;
use crate::responses::ApiResponse;
use crate::BacktestApi;
use async_trait::async_trait;
use core_types::{BacktestRequest, HistoryQuery, OptimizeRequest, UserInfo};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::time::Duration;

/// What `GET /auth/check` (and `GET /auth/me`) should answer.
#[derive(Debug, Clone)]
pub enum AuthScript {
    SignedIn(UserInfo),
    SignedOut,
    /// The call fails with this status.
    Fails(StatusCode),
}

/// A fake API that records every call and answers auth endpoints from a script.
/// Endpoints without a script answer `200` with a `null` body.
pub struct FakeApi {
    auth: Mutex<AuthScript>,
    logout_status: Mutex<Option<StatusCode>>,
    latency: Option<Duration>,
    calls: Mutex<Vec<&'static str>>,
}

pub fn sample_user() -> UserInfo {
    UserInfo {
        id: 7,
        email: "trader@example.com".to_string(),
        name: "Test Trader".to_string(),
        picture: None,
    }
}

impl FakeApi {
    pub fn new(auth: AuthScript) -> Self {
        Self {
            auth: Mutex::new(auth),
            logout_status: Mutex::new(None),
            latency: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn signed_in(user: UserInfo) -> Self {
        Self::new(AuthScript::SignedIn(user))
    }

    pub fn signed_out() -> Self {
        Self::new(AuthScript::SignedOut)
    }

    pub fn failing(status: StatusCode) -> Self {
        Self::new(AuthScript::Fails(status))
    }

    /// Makes `check_auth` take this long, so callers can observe it in flight.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes `logout` fail with this status.
    pub fn with_failing_logout(self, status: StatusCode) -> Self {
        *self.logout_status.lock().unwrap() = Some(status);
        self
    }

    pub fn set_auth(&self, auth: AuthScript) {
        *self.auth.lock().unwrap() = auth;
    }

    /// How many times the named operation was called.
    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|name| **name == operation)
            .count()
    }

    pub fn call_log(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) {
        self.calls.lock().unwrap().push(operation);
    }

    fn ok(&self, operation: &'static str) -> Result<ApiResponse, RequestError> {
        self.record(operation);
        Ok(ApiResponse::new(StatusCode::OK, Value::Null))
    }

    fn script(&self) -> AuthScript {
        self.auth.lock().unwrap().clone()
    }
}

fn rejected(status: StatusCode) -> RequestError {
    RequestError::Status {
        status,
        body: String::new(),
    }
}

#[async_trait]
impl BacktestApi for FakeApi {
    async fn get_items(&self) -> Result<ApiResponse, RequestError> {
        self.ok("get_items")
    }

    async fn get_item(&self, _id: i64) -> Result<ApiResponse, RequestError> {
        self.ok("get_item")
    }

    async fn create_item(&self, _item: &Value) -> Result<ApiResponse, RequestError> {
        self.ok("create_item")
    }

    async fn delete_item(&self, _id: i64) -> Result<ApiResponse, RequestError> {
        self.ok("delete_item")
    }

    async fn health_check(&self) -> Result<ApiResponse, RequestError> {
        self.ok("health_check")
    }

    async fn run_backtest(&self, _request: &BacktestRequest) -> Result<ApiResponse, RequestError> {
        self.ok("run_backtest")
    }

    async fn get_dashboard(&self) -> Result<ApiResponse, RequestError> {
        self.ok("get_dashboard")
    }

    async fn get_history(&self, _query: &HistoryQuery) -> Result<ApiResponse, RequestError> {
        self.ok("get_history")
    }

    async fn get_backtest_result(&self, _id: i64) -> Result<ApiResponse, RequestError> {
        self.ok("get_backtest_result")
    }

    async fn delete_history(&self, _id: i64) -> Result<ApiResponse, RequestError> {
        self.ok("delete_history")
    }

    async fn compare_strategies(&self, _ids: &[i64]) -> Result<ApiResponse, RequestError> {
        self.ok("compare_strategies")
    }

    async fn optimize_strategy(&self, _request: &OptimizeRequest) -> Result<ApiResponse, RequestError> {
        self.ok("optimize_strategy")
    }

    async fn check_auth(&self) -> Result<ApiResponse, RequestError> {
        self.record("check_auth");
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.script() {
            AuthScript::SignedIn(user) => Ok(ApiResponse::new(
                StatusCode::OK,
                json!({ "authenticated": true, "user": user }),
            )),
            AuthScript::SignedOut => Ok(ApiResponse::new(
                StatusCode::OK,
                json!({ "authenticated": false, "user": null }),
            )),
            AuthScript::Fails(status) => Err(rejected(status)),
        }
    }

    async fn get_me(&self) -> Result<ApiResponse, RequestError> {
        self.record("get_me");
        match self.script() {
            AuthScript::SignedIn(user) => Ok(ApiResponse::new(StatusCode::OK, json!(user))),
            AuthScript::SignedOut => Err(rejected(StatusCode::UNAUTHORIZED)),
            AuthScript::Fails(status) => Err(rejected(status)),
        }
    }

    async fn logout(&self) -> Result<ApiResponse, RequestError> {
        self.record("logout");
        match *self.logout_status.lock().unwrap() {
            Some(status) => Err(rejected(status)),
            None => Ok(ApiResponse::new(
                StatusCode::OK,
                json!({ "message": "Logged out successfully" }),
            )),
        }
    }
}
