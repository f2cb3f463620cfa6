use std::sync::Arc;

use msgs::{GameSnapshot, TabId};
use tokio::sync::watch;

/// The process-wide key/value area.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageArea {
    pub game_state: Option<GameSnapshot>,
    pub timer_tab: Option<TabId>,
    pub active_game: Option<String>,
}

/// A partial write. Keys left unset are untouched.
#[derive(Debug, Clone, Default)]
pub struct StorageUpdate {
    game_state: Option<Option<GameSnapshot>>,
    timer_tab: Option<Option<TabId>>,
    active_game: Option<Option<String>>,
}

impl StorageUpdate {
    pub fn new() -> StorageUpdate {
        StorageUpdate::default()
    }

    pub fn clear_all() -> StorageUpdate {
        StorageUpdate::new().game_state(None).timer_tab(None).active_game(None)
    }

    pub fn game_state(mut self, game_state: Option<GameSnapshot>) -> StorageUpdate {
        self.game_state = Some(game_state);
        self
    }

    pub fn timer_tab(mut self, timer_tab: Option<TabId>) -> StorageUpdate {
        self.timer_tab = Some(timer_tab);
        self
    }

    pub fn active_game(mut self, active_game: Option<String>) -> StorageUpdate {
        self.active_game = Some(active_game);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub area: StorageArea,
    /// Bumped on every write that changed at least one key.
    pub generation: u64,
    /// Bumped only when `game_state` changed.
    pub game_state_generation: u64,
}

/// Versioned store shared by every context. Readers see writes in order but
/// only the latest value at the time they look.
#[derive(Clone)]
pub struct SnapshotStore {
    tx: Arc<watch::Sender<StoreState>>,
}

impl SnapshotStore {
    pub fn new() -> SnapshotStore {
        let (tx, _) = watch::channel(StoreState::default());
        SnapshotStore { tx: Arc::new(tx) }
    }

    /// Applies `update` atomically. Keys whose value does not change are not
    /// reported as changed. Returns whether anything changed.
    pub fn set(&self, update: StorageUpdate) -> bool {
        self.tx.send_if_modified(|state| {
            let mut changed = false;
            if let Some(game_state) = update.game_state {
                if state.area.game_state != game_state {
                    state.area.game_state = game_state;
                    state.game_state_generation += 1;
                    changed = true;
                }
            }
            if let Some(timer_tab) = update.timer_tab {
                if state.area.timer_tab != timer_tab {
                    state.area.timer_tab = timer_tab;
                    changed = true;
                }
            }
            if let Some(active_game) = update.active_game {
                if state.area.active_game != active_game {
                    state.area.active_game = active_game;
                    changed = true;
                }
            }
            if changed {
                state.generation += 1;
            }
            changed
        })
    }

    /// Wipes every key, as on process activation.
    pub fn clear(&self) {
        if self.set(StorageUpdate::clear_all()) {
            tracing::info!("storage cleared");
        }
    }

    pub fn get(&self) -> StorageArea {
        self.tx.borrow().area.clone()
    }

    pub fn game_state(&self) -> Option<GameSnapshot> {
        self.tx.borrow().area.game_state.clone()
    }

    pub fn timer_tab(&self) -> Option<TabId> {
        self.tx.borrow().area.timer_tab
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.tx.subscribe()
    }
}

impl Default for SnapshotStore {
    fn default() -> SnapshotStore {
        SnapshotStore::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use msgs::snapshot::TurnOrderEntry;

    use super::*;

    fn snapshot(version: u64) -> GameSnapshot {
        GameSnapshot {
            version,
            turn_order: vec![TurnOrderEntry {
                player_id: "p1".into(),
                color_vars: Vec::new(),
                has_passed: false,
                is_current: true,
                accumulated_time_excluding_current_turn: 0,
            }],
            token_totals: BTreeMap::from([("p1".to_string(), BTreeMap::new())]),
            bank_log_preview: Vec::new(),
            available_actions: Vec::new(),
            own_player_id: "p1".into(),
            player_names: BTreeMap::new(),
            allow_inter_player_transactions: false,
            captured_at: 0,
        }
    }

    #[test]
    fn unchanged_writes_do_not_notify() {
        let store = SnapshotStore::new();
        let rx = store.subscribe();

        assert!(!store.set(StorageUpdate::clear_all()));
        assert!(!rx.has_changed().unwrap());

        assert!(store.set(StorageUpdate::new().game_state(Some(snapshot(1)))));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow().game_state_generation, 1);
    }

    #[test]
    fn readers_see_only_the_latest_write() {
        let store = SnapshotStore::new();
        let mut rx = store.subscribe();

        store.set(StorageUpdate::new().game_state(Some(snapshot(1))));
        store.set(StorageUpdate::new().game_state(Some(snapshot(2))));
        store.set(StorageUpdate::new().timer_tab(Some(4)));

        let state = rx.borrow_and_update().clone();
        assert_eq!(state.area.game_state.map(|s| s.version), Some(2));
        assert_eq!(state.game_state_generation, 2);
        assert_eq!(state.generation, 3);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn clear_wipes_every_key_in_one_write() {
        let store = SnapshotStore::new();
        store.set(StorageUpdate::new().game_state(Some(snapshot(1))).timer_tab(Some(2)).active_game(Some("g".into())));
        let generation = store.subscribe().borrow().generation;

        store.clear();

        assert_eq!(store.get(), StorageArea::default());
        assert_eq!(store.subscribe().borrow().generation, generation + 1);
    }
}
