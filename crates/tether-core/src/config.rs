use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::mutation::MutationKind;
use crate::resource::ResourceKind;

/// Root configuration, read from `config.toml`.
///
/// Every section is optional in the file; missing values take the defaults
/// the mobile client shipped with.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TetherConfig {
    pub server: ServerConfig,
    pub sync: SyncConfig,
    pub endpoints: EndpointConfig,
    pub storage: StorageConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8443,
            use_ssl: true,
            timeout_ms: 30_000,
            auth_token: None,
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Interval between full resync-and-drain cycles; 0 disables the timer.
    pub auto_sync_interval_secs: u64,
    /// Upper bound of the random delay added to each periodic tick.
    pub jitter_ms: u64,
    /// Run one cycle as soon as background work starts, if online.
    pub sync_on_start: bool,
    /// Per-resource polling intervals. Resources without an entry are only
    /// refreshed by full cycles.
    pub refresh_intervals_ms: BTreeMap<ResourceKind, u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let refresh_intervals_ms = BTreeMap::from([
            (ResourceKind::Stats, 30_000),
            (ResourceKind::Bots, 15_000),
            (ResourceKind::Commands, 10_000),
            (ResourceKind::Targets, 60_000),
            (ResourceKind::Campaigns, 30_000),
        ]);
        Self {
            auto_sync_interval_secs: 300,
            jitter_ms: 0,
            sync_on_start: true,
            refresh_intervals_ms,
        }
    }
}

impl SyncConfig {
    /// Config with every timer switched off; cycles only run on demand or on
    /// reconnect.
    pub fn manual() -> Self {
        Self {
            auto_sync_interval_secs: 0,
            jitter_ms: 0,
            sync_on_start: false,
            refresh_intervals_ms: BTreeMap::new(),
        }
    }

    pub fn auto_sync_interval(&self) -> Option<Duration> {
        (self.auto_sync_interval_secs > 0)
            .then(|| Duration::from_secs(self.auto_sync_interval_secs))
    }

    pub fn refresh_interval(&self, kind: ResourceKind) -> Option<Duration> {
        self.refresh_intervals_ms
            .get(&kind)
            .filter(|ms| **ms > 0)
            .map(|ms| Duration::from_millis(*ms))
    }
}

/// REST paths per resource and mutation kind.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    pub bots: String,
    pub commands: String,
    pub targets: String,
    pub payloads: String,
    pub campaigns: String,
    pub stats: String,
    pub send_command: String,
    pub generate_payload: String,
    pub create_campaign: String,
    pub discover_targets: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            bots: "/admin/bots".to_string(),
            commands: "/admin/tasks".to_string(),
            targets: "/admin/targets".to_string(),
            payloads: "/admin/payloads".to_string(),
            campaigns: "/admin/campaigns".to_string(),
            stats: "/admin/stats".to_string(),
            send_command: "/admin/commands".to_string(),
            generate_payload: "/admin/payloads".to_string(),
            create_campaign: "/admin/campaigns".to_string(),
            discover_targets: "/admin/targets/discover".to_string(),
        }
    }
}

impl EndpointConfig {
    pub fn resource(&self, kind: ResourceKind) -> &str {
        match kind {
            ResourceKind::Bots => &self.bots,
            ResourceKind::Commands => &self.commands,
            ResourceKind::Targets => &self.targets,
            ResourceKind::Payloads => &self.payloads,
            ResourceKind::Campaigns => &self.campaigns,
            ResourceKind::Stats => &self.stats,
        }
    }

    pub fn mutation(&self, kind: MutationKind) -> &str {
        match kind {
            MutationKind::Command => &self.send_command,
            MutationKind::PayloadGeneration => &self.generate_payload,
            MutationKind::CampaignCreation => &self.create_campaign,
            MutationKind::TargetDiscovery => &self.discover_targets,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Location of the key-value store file. Defaults to the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}
