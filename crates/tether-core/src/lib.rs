//! Domain types and collaborator traits for the Tether offline layer.
//!
//! Nothing in this crate performs I/O. Storage, transport and connectivity
//! are traits implemented in `tether-infrastructure`; the cache, queue and
//! sync logic live in `tether-application`.

pub mod api;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod event;
pub mod mutation;
pub mod outcome;
pub mod resource;
pub mod snapshot;
pub mod storage;

// Re-export common types
pub use api::{ApiRequest, ApiResponse, ApiTransport, HttpMethod, RemoteApi};
pub use clock::{Clock, SystemClock};
pub use config::TetherConfig;
pub use connectivity::{ConnectivityMonitor, ConnectivityState};
pub use error::{Result, TetherError};
pub use event::{DrainReport, SyncEvent, SyncReport, SyncTrigger};
pub use mutation::{MAX_RETRIES, MutationKind, QueueItem};
pub use outcome::{FetchResult, MutationResult, StorageInfo};
pub use resource::ResourceKind;
pub use snapshot::CacheSnapshot;
pub use storage::KeyValueStore;
