use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// How long `connect` waits for the game page to appear.
    pub anchor_timeout_ms: u64,
    /// How long the bank-transfer panel gets to produce a final answer.
    pub back_channel_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            anchor_timeout_ms: 2000,
            back_channel_timeout_ms: 5000,
        }
    }
}

impl SourceConfig {
    pub fn anchor_timeout(&self) -> Duration {
        Duration::from_millis(self.anchor_timeout_ms)
    }

    pub fn back_channel_timeout(&self) -> Duration {
        Duration::from_millis(self.back_channel_timeout_ms)
    }
}
