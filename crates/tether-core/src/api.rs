//! Request/response shapes and the network-facing traits.
//!
//! Two seams live here:
//! - [`ApiTransport`] is the raw "perform request" capability (HTTP in
//!   production, mocks in tests).
//! - [`RemoteApi`] is the typed view of the backend the offline layer needs:
//!   fetch a resource, deliver a mutation. Both the façade and the sync
//!   coordinator depend on this trait only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mutation::MutationKind;
use crate::resource::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

/// A single request against the backend, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub endpoint: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: HttpMethod::Get,
            body: None,
        }
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: HttpMethod::Post,
            body: Some(body),
        }
    }
}

/// Outcome of a backend call: success flag plus data or error text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Data worth caching. A `null` body counts as no data.
    pub fn payload(&self) -> Option<&Value> {
        self.data.as_ref().filter(|data| !data.is_null())
    }

    /// Error text, or a generic message when the transport gave none.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "An unexpected error occurred. Please try again.".to_string())
    }
}

/// The raw network transport.
///
/// Implementations report every failure (status, connection, decode) as an
/// unsuccessful [`ApiResponse`]; they do not return errors or panic. Retry
/// and auth policy inside the transport are opaque to the offline layer.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn request(&self, request: ApiRequest) -> ApiResponse;
}

/// The backend operations the offline layer performs.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Reads the current server-side value of a resource.
    async fn fetch_resource(&self, kind: ResourceKind) -> ApiResponse;

    /// Delivers a write. Delivery failures are not classified: a validation
    /// error and a dropped connection look the same to the caller.
    async fn deliver_mutation(&self, kind: MutationKind, payload: &Value) -> ApiResponse;
}
