//! Infrastructure for the Tether offline layer: storage backends, the HTTP
//! transport, the connectivity monitor, configuration and logging.

pub mod config_service;
pub mod connectivity;
pub mod http_transport;
pub mod logging;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::connectivity::ManualConnectivityMonitor;
pub use crate::http_transport::HttpTransport;
pub use crate::paths::TetherPaths;
pub use crate::storage::{FileKeyValueStore, InMemoryKeyValueStore};
