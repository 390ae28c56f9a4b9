// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for API mutations.
//!
//! [`HttpTransport`] is the seam the retry and replay logic talks to; the
//! production implementation is [`ReqwestTransport`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;
use tend_core::{Method, PendingRequest};

use crate::retry::Retryable;

/// Longest response body kept in a status error message.
const MAX_ERROR_BODY: usize = 512;

/// Error type for HTTP operations.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// No response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("request failed ({code}): {message}")]
    Status { code: u16, message: String },

    /// The response could not be interpreted.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The client could not be built.
    #[error("invalid HTTP client configuration: {0}")]
    Config(String),
}

impl HttpError {
    /// Create a status error.
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        HttpError::Status {
            code,
            message: message.into(),
        }
    }

    /// Whether the failure means the server could not be reached.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, HttpError::Transport(_))
    }
}

impl Retryable for HttpError {
    fn is_transport(&self) -> bool {
        self.is_connectivity()
    }

    fn status_code(&self) -> Option<u16> {
        match self {
            HttpError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Sends API requests.
pub trait HttpTransport: Send + Sync {
    /// Send a request; resolves to the parsed JSON body (`null` if empty).
    fn send<'a>(
        &'a self,
        request: &'a PendingRequest,
    ) -> Pin<Box<dyn Future<Output = HttpResult<Value>> + Send + 'a>>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ReqwestTransport {
    /// Create a transport for the API at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> HttpResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::Config(e.to_string()))?;

        Ok(ReqwestTransport {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Authenticate requests with a bearer token.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    async fn execute(&self, request: &PendingRequest) -> HttpResult<Value> {
        let url = self.url_for(&request.endpoint);
        let mut builder = self.client.request(reqwest_method(request.method), &url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if !request.data.is_null() {
            builder = builder.json(&request.data);
        }

        // Any error before a response arrives is a transport failure.
        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        tracing::debug!(method = %request.method, %url, status = status.as_u16(), "api response");

        if !status.is_success() {
            return Err(HttpError::status(status.as_u16(), truncate(&body)));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| HttpError::Decode(e.to_string()))
    }
}

impl HttpTransport for ReqwestTransport {
    fn send<'a>(
        &'a self,
        request: &'a PendingRequest,
    ) -> Pin<Box<dyn Future<Output = HttpResult<Value>> + Send + 'a>> {
        Box::pin(self.execute(request))
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
