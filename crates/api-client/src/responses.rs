use crate::error::RequestError;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A successful response, kept raw so callers decide how much of it to type.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// Builds a response from the raw body text. An empty body becomes `null`
    /// and a body that is not JSON is kept as a JSON string.
    pub fn from_text(status: StatusCode, text: &str) -> Self {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        };
        Self { status, body }
    }

    /// Decodes the body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        Ok(T::deserialize(&self.body)?)
    }

    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, RequestError> {
        Ok(serde_json::from_value(self.body)?)
    }
}
