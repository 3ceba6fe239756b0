//! Application services for the Tether offline layer.
//!
//! [`OfflineContext`] wires a [`CacheStore`], a [`MutationQueue`], a
//! [`SyncCoordinator`] and its [`SyncScheduler`] behind the
//! [`OfflineClient`] façade the UI calls.

pub mod cache_store;
pub mod context;
pub mod events;
pub mod gateway;
pub mod mutation_queue;
pub mod offline_client;
pub mod scheduler;
pub mod sync_coordinator;

#[cfg(test)]
mod test_support;

pub use cache_store::CacheStore;
pub use context::OfflineContext;
pub use events::EventBus;
pub use gateway::ApiGateway;
pub use mutation_queue::MutationQueue;
pub use offline_client::OfflineClient;
pub use scheduler::SyncScheduler;
pub use sync_coordinator::{SyncCoordinator, SyncOutcome};
