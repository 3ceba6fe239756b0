//! Resource kinds mirrored by the offline cache.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TetherError;

/// A named server-side collection (or the stats singleton) the cache mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Bots,
    /// Commands are served by the task listing endpoint.
    Commands,
    Targets,
    Payloads,
    Campaigns,
    /// Dashboard statistics, the only singleton resource.
    Stats,
}

impl ResourceKind {
    /// Every resource kind, in resync fan-out order.
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Bots,
        ResourceKind::Commands,
        ResourceKind::Targets,
        ResourceKind::Payloads,
        ResourceKind::Campaigns,
        ResourceKind::Stats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Bots => "bots",
            ResourceKind::Commands => "commands",
            ResourceKind::Targets => "targets",
            ResourceKind::Payloads => "payloads",
            ResourceKind::Campaigns => "campaigns",
            ResourceKind::Stats => "stats",
        }
    }

    /// Returns true for resources cached as an ordered list of records.
    pub fn is_collection(&self) -> bool {
        !matches!(self, ResourceKind::Stats)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = TetherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bots" => Ok(ResourceKind::Bots),
            // The server calls them tasks; the cache calls them commands.
            "commands" | "tasks" => Ok(ResourceKind::Commands),
            "targets" => Ok(ResourceKind::Targets),
            "payloads" => Ok(ResourceKind::Payloads),
            "campaigns" => Ok(ResourceKind::Campaigns),
            "stats" => Ok(ResourceKind::Stats),
            other => Err(TetherError::not_found("resource kind", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_display() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_tasks_alias_maps_to_commands() {
        assert_eq!("tasks".parse::<ResourceKind>().unwrap(), ResourceKind::Commands);
    }

    #[test]
    fn test_unknown_kind_is_not_found() {
        let err = "exploits".parse::<ResourceKind>().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_only_stats_is_singleton() {
        let singletons: Vec<_> = ResourceKind::ALL
            .iter()
            .filter(|kind| !kind.is_collection())
            .collect();
        assert_eq!(singletons, vec![&ResourceKind::Stats]);
    }
}
