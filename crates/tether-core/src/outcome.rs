//! Result structures returned across the UI boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiResponse;

/// Result of an offline-aware read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when `data` came from the local snapshot, not the network.
    pub from_cache: bool,
}

impl FetchResult {
    pub fn fresh(response: ApiResponse) -> Self {
        Self {
            success: response.success,
            data: response.data,
            error: response.error,
            from_cache: false,
        }
    }

    pub fn cached(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            from_cache: true,
        }
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            from_cache: false,
        }
    }
}

/// Result of an offline-aware write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when the write was accepted for later delivery rather than
    /// confirmed by the server.
    pub queued: bool,
}

impl MutationResult {
    pub fn delivered(response: ApiResponse) -> Self {
        Self {
            success: response.success,
            data: response.data,
            error: response.error,
            queued: false,
        }
    }

    pub fn queued(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            queued: true,
        }
    }
}

/// Summary of local offline storage for a settings screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub cached_items: usize,
    pub queue_items: usize,
    pub last_sync: String,
    pub cache_size: String,
}

/// Formats a byte count the way the settings screen shows it.
pub fn format_bytes(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;
    if bytes < KIB {
        format!("{} B", bytes)
    } else if bytes < MIB {
        format!("{:.2} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    }
}
