use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Time the action tray needs to slide out before new buttons go in.
    pub action_swap_delay_ms: u64,
    pub time_share_interval_ms: u64,
    pub bank_log_window: usize,
    /// How long fresh log entries keep their "new" flag.
    pub new_entry_flash_ms: u64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            action_swap_delay_ms: 1000,
            time_share_interval_ms: 10_000,
            bank_log_window: 8,
            new_entry_flash_ms: 10,
        }
    }
}

impl OverlayConfig {
    pub fn action_swap_delay(&self) -> Duration {
        Duration::from_millis(self.action_swap_delay_ms)
    }

    pub fn time_share_interval(&self) -> Duration {
        Duration::from_millis(self.time_share_interval_ms)
    }

    pub fn new_entry_flash(&self) -> Duration {
        Duration::from_millis(self.new_entry_flash_ms)
    }
}
