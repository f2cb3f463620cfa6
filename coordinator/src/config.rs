use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// How long a tab gets to answer a liveness ping.
    pub probe_timeout_ms: u64,
    /// Upper bound on any call the coordinator makes into a tab.
    pub relay_timeout_ms: u64,
    /// Hosts whose pages can act as the source.
    pub source_hosts: Vec<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 2000,
            relay_timeout_ms: 10_000,
            source_hosts: vec!["localhost:3000".to_owned(), "sharedgametimer.com".to_owned()],
        }
    }
}

impl CoordinatorConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_timeout_ms)
    }
}
