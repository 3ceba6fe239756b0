//! Hand-written doubles shared by the unit tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use tether_core::api::{ApiResponse, RemoteApi};
use tether_core::clock::Clock;
use tether_core::error::{Result, TetherError};
use tether_core::mutation::MutationKind;
use tether_core::resource::ResourceKind;
use tether_core::storage::KeyValueStore;

pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Store whose every operation fails.
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(TetherError::storage("disk unavailable"))
    }

    async fn set(&self, _key: &str, _value: String) -> Result<()> {
        Err(TetherError::storage("disk unavailable"))
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Err(TetherError::storage("disk unavailable"))
    }

    async fn all_keys(&self) -> Result<Vec<String>> {
        Err(TetherError::storage("disk unavailable"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Fetch(ResourceKind),
    Deliver(MutationKind, Value),
}

/// Remote API that records calls and answers from scripted queues.
///
/// Fetches answer with `fetch_response`; deliveries pop from `deliveries`
/// and fall back to `default_delivery` when the script runs out.
pub struct ScriptedRemoteApi {
    pub calls: Mutex<Vec<RemoteCall>>,
    fetch_response: Box<dyn Fn(ResourceKind) -> ApiResponse + Send + Sync>,
    deliveries: Mutex<VecDeque<ApiResponse>>,
    default_delivery: ApiResponse,
}

impl ScriptedRemoteApi {
    pub fn new<F>(fetch_response: F, default_delivery: ApiResponse) -> Self
    where
        F: Fn(ResourceKind) -> ApiResponse + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            fetch_response: Box::new(fetch_response),
            deliveries: Mutex::new(VecDeque::new()),
            default_delivery,
        }
    }

    pub fn script_deliveries(&self, responses: impl IntoIterator<Item = ApiResponse>) {
        self.deliveries.lock().unwrap().extend(responses);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteApi for ScriptedRemoteApi {
    async fn fetch_resource(&self, kind: ResourceKind) -> ApiResponse {
        self.calls.lock().unwrap().push(RemoteCall::Fetch(kind));
        (self.fetch_response)(kind)
    }

    async fn deliver_mutation(&self, kind: MutationKind, payload: &Value) -> ApiResponse {
        self.calls
            .lock()
            .unwrap()
            .push(RemoteCall::Deliver(kind, payload.clone()));
        self.deliveries
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_delivery.clone())
    }
}
