//! Maps resource and mutation kinds onto REST calls.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tether_core::api::{ApiRequest, ApiResponse, ApiTransport, RemoteApi};
use tether_core::config::EndpointConfig;
use tether_core::mutation::MutationKind;
use tether_core::resource::ResourceKind;
use tether_infrastructure::http_transport::TIMEOUT_ERROR;

/// [`RemoteApi`] over any [`ApiTransport`].
///
/// Every call is bounded by `timeout`; expiry is reported as a failed
/// response, never as an error.
pub struct ApiGateway<T: ApiTransport> {
    transport: T,
    endpoints: EndpointConfig,
    timeout: Duration,
}

impl<T: ApiTransport> ApiGateway<T> {
    pub fn new(transport: T, endpoints: EndpointConfig, timeout: Duration) -> Self {
        Self {
            transport,
            endpoints,
            timeout,
        }
    }

    pub fn endpoints(&self) -> &EndpointConfig {
        &self.endpoints
    }

    async fn send(&self, request: ApiRequest) -> ApiResponse {
        let endpoint = request.endpoint.clone();
        match tokio::time::timeout(self.timeout, self.transport.request(request)).await {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(
                    "[ApiGateway] {} timed out after {:?}",
                    endpoint,
                    self.timeout
                );
                ApiResponse::failure(TIMEOUT_ERROR)
            }
        }
    }
}

#[async_trait]
impl<T: ApiTransport> RemoteApi for ApiGateway<T> {
    async fn fetch_resource(&self, kind: ResourceKind) -> ApiResponse {
        self.send(ApiRequest::get(self.endpoints.resource(kind))).await
    }

    async fn deliver_mutation(&self, kind: MutationKind, payload: &Value) -> ApiResponse {
        self.send(ApiRequest::post(self.endpoints.mutation(kind), payload.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use tether_core::api::HttpMethod;

    struct RecordingTransport {
        requests: Mutex<Vec<ApiRequest>>,
        delay: Duration,
    }

    impl RecordingTransport {
        fn new(delay: Duration) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                delay,
            }
        }
    }

    #[async_trait]
    impl ApiTransport for RecordingTransport {
        async fn request(&self, request: ApiRequest) -> ApiResponse {
            self.requests.lock().unwrap().push(request);
            tokio::time::sleep(self.delay).await;
            ApiResponse::ok(json!([]))
        }
    }

    #[tokio::test]
    async fn test_resources_use_configured_paths() {
        let gateway = ApiGateway::new(
            RecordingTransport::new(Duration::ZERO),
            EndpointConfig::default(),
            Duration::from_secs(1),
        );

        gateway.fetch_resource(ResourceKind::Commands).await;
        gateway.fetch_resource(ResourceKind::Stats).await;

        let requests = gateway.transport.requests.lock().unwrap().clone();
        assert_eq!(requests[0], ApiRequest::get("/admin/tasks"));
        assert_eq!(requests[1], ApiRequest::get("/admin/stats"));
    }

    #[tokio::test]
    async fn test_mutations_post_payload() {
        let endpoints = EndpointConfig {
            discover_targets: "/v2/discover".to_string(),
            ..EndpointConfig::default()
        };
        let gateway = ApiGateway::new(
            RecordingTransport::new(Duration::ZERO),
            endpoints,
            Duration::from_secs(1),
        );

        let payload = json!({"network_range": "10.0.0.0/24"});
        gateway
            .deliver_mutation(MutationKind::TargetDiscovery, &payload)
            .await;

        let requests = gateway.transport.requests.lock().unwrap().clone();
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].endpoint, "/v2/discover");
        assert_eq!(requests[0].body, Some(payload));
    }

    #[tokio::test]
    async fn test_slow_transport_times_out() {
        let gateway = ApiGateway::new(
            RecordingTransport::new(Duration::from_secs(5)),
            EndpointConfig::default(),
            Duration::from_millis(20),
        );

        let response = gateway.fetch_resource(ResourceKind::Bots).await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some(TIMEOUT_ERROR));
    }
}
