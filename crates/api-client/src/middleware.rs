use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;

/// A request as the hooks see it, before it is handed to the transport.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    /// Endpoint path relative to the API base, e.g. `backtest/history`.
    pub path: String,
    /// Encoded query string without the leading `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the query string; an empty string means no query at all.
    pub fn with_query(mut self, query: String) -> Self {
        self.query = Some(query).filter(|q| !q.is_empty());
        self
    }
}

/// Runs before every request, in registration order.
pub trait RequestHook: Send + Sync {
    fn on_request(&self, request: &mut OutboundRequest);
}

/// Runs after every response that arrived, success or not, in registration order.
/// Transport failures never reach response hooks.
pub trait ResponseHook: Send + Sync {
    fn on_response(&self, request: &OutboundRequest, status: StatusCode);
}

/// The ordered hook lists an [`HttpApiClient`](crate::HttpApiClient) runs around the transport.
#[derive(Clone, Default)]
pub struct Pipeline {
    request_hooks: Vec<Arc<dyn RequestHook>>,
    response_hooks: Vec<Arc<dyn ResponseHook>>,
}

impl Pipeline {
    pub fn push_request_hook(&mut self, hook: Arc<dyn RequestHook>) {
        self.request_hooks.push(hook);
    }

    pub fn push_response_hook(&mut self, hook: Arc<dyn ResponseHook>) {
        self.response_hooks.push(hook);
    }

    pub fn before_send(&self, request: &mut OutboundRequest) {
        for hook in &self.request_hooks {
            hook.on_request(request);
        }
    }

    pub fn after_receive(&self, request: &OutboundRequest, status: StatusCode) {
        for hook in &self.response_hooks {
            hook.on_response(request, status);
        }
    }
}
