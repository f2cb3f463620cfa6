use std::time::Duration;

use host::{
    page::{Mutation, ANCHOR_ID, VERSION_ATTRIBUTE},
    GamePage,
};
use msgs::SyncError;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    time::{timeout_at, Instant},
};

/// Waits until the anchor node exists. The returned receiver was subscribed
/// before the anchor was checked, so no later mutation is missed.
pub async fn wait_for_anchor(page: &dyn GamePage, limit: Duration) -> Result<broadcast::Receiver<Mutation>, SyncError> {
    let mut mutations = page.observe();
    if page.anchor().is_some() {
        return Ok(mutations);
    }

    let deadline = Instant::now() + limit;
    loop {
        let received = timeout_at(deadline, mutations.recv()).await.map_err(|_| SyncError::AnchorNotFound)?;
        match received {
            Ok(Mutation::NodeAdded { id }) if id == ANCHOR_ID => return Ok(mutations),
            Ok(_) => {}
            Err(RecvError::Lagged(_)) => {
                if page.anchor().is_some() {
                    return Ok(mutations);
                }
            }
            Err(RecvError::Closed) => return Err(SyncError::AnchorNotFound),
        }
    }
}

pub fn is_version_change(mutation: &Mutation) -> bool {
    matches!(mutation, Mutation::AttributeChanged { node, attribute } if node == ANCHOR_ID && attribute == VERSION_ATTRIBUTE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChange {
    Unchanged,
    Advanced,
    Regressed { last_seen: u64 },
}

/// Remembers the last version that was published.
#[derive(Debug, Default)]
pub struct VersionTracker {
    last_seen: Option<u64>,
}

impl VersionTracker {
    pub fn new() -> VersionTracker {
        VersionTracker::default()
    }

    pub fn reset(&mut self) {
        self.last_seen = None;
    }

    pub fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }

    /// Classifies `version` against the last one and records it if it advanced.
    pub fn observe(&mut self, version: u64) -> VersionChange {
        match self.last_seen {
            Some(last_seen) if version == last_seen => VersionChange::Unchanged,
            Some(last_seen) if version < last_seen => VersionChange::Regressed { last_seen },
            _ => {
                self.last_seen = Some(version);
                VersionChange::Advanced
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use page_emulator::{SimulatedTimerPage, TimerGame};

    use super::*;

    #[test]
    fn versions_only_move_forward() {
        let mut tracker = VersionTracker::new();
        assert_eq!(tracker.observe(3), VersionChange::Advanced);
        assert_eq!(tracker.observe(3), VersionChange::Unchanged);
        assert_eq!(tracker.observe(2), VersionChange::Regressed { last_seen: 3 });
        assert_eq!(tracker.last_seen(), Some(3));
        tracker.reset();
        assert_eq!(tracker.observe(2), VersionChange::Advanced);
    }

    #[tokio::test]
    async fn present_anchor_is_found_at_once() {
        let page = SimulatedTimerPage::new(TimerGame::sample());
        assert!(wait_for_anchor(&page, Duration::from_millis(10)).await.is_ok());
    }

    #[tokio::test]
    async fn missing_anchor_times_out() {
        let page = SimulatedTimerPage::without_anchor(TimerGame::sample());
        let result = wait_for_anchor(&page, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(SyncError::AnchorNotFound)));
    }

    #[tokio::test]
    async fn late_anchor_is_picked_up() {
        let page = Arc::new(SimulatedTimerPage::without_anchor(TimerGame::sample()));
        let mounting = page.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            mounting.mount_anchor();
        });
        assert!(wait_for_anchor(page.as_ref(), Duration::from_millis(500)).await.is_ok());
    }
}
