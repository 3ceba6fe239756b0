//! reqwest-based implementation of the network transport.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tether_core::api::{ApiRequest, ApiResponse, ApiTransport, HttpMethod};
use tether_core::config::ServerConfig;

pub const NETWORK_ERROR: &str = "Network connection failed. Please check your internet connection.";
pub const TIMEOUT_ERROR: &str = "Request timed out. Please try again.";

/// JSON-over-HTTP transport for the admin REST API.
///
/// Every failure becomes an unsuccessful [`ApiResponse`]; nothing is retried
/// here. Retrying is the sync coordinator's job.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
    auth_token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            auth_token,
        }
    }

    pub fn from_config(server: &ServerConfig) -> Self {
        Self::new(server.base_url(), server.timeout(), server.auth_token.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.auth_token {
            request.header("Authorization", format!("Bearer {}", token))
        } else {
            request
        }
    }

    fn build(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, request.endpoint);
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };
        self.auth_request(builder.timeout(self.timeout))
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn request(&self, request: ApiRequest) -> ApiResponse {
        tracing::debug!(
            "[HttpTransport] {:?} {}{}",
            request.method,
            self.base_url,
            request.endpoint
        );

        let response = match self.build(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("[HttpTransport] Request to {} failed: {}", request.endpoint, e);
                return ApiResponse::failure(describe_send_error(&e));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return ApiResponse::failure(TIMEOUT_ERROR),
            Err(e) => return ApiResponse::failure(e.to_string()),
        };

        if !status.is_success() {
            return ApiResponse::failure(status_error_message(status, &body));
        }

        if body.trim().is_empty() {
            return ApiResponse::ok(Value::Null);
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(data) => ApiResponse::ok(data),
            Err(e) => ApiResponse::failure(format!("Invalid JSON response: {}", e)),
        }
    }
}

fn describe_send_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        TIMEOUT_ERROR.to_string()
    } else if err.is_connect() {
        NETWORK_ERROR.to_string()
    } else {
        err.to_string()
    }
}

/// Error text for a non-2xx response: the body's `error` field when the
/// server sent one, otherwise the status line.
pub fn status_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| {
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        })
}
