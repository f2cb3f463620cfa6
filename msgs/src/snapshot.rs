use std::collections::{BTreeMap, HashSet};

use crate::error::SyncError;

pub type PlayerId = String;
pub type TokenKind = String;

/// One extraction of the source page. Replaced wholesale on every publish.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub version: u64,
    pub turn_order: Vec<TurnOrderEntry>,
    pub token_totals: BTreeMap<PlayerId, BTreeMap<TokenKind, i64>>,
    /// Most recent last.
    pub bank_log_preview: Vec<BankLogEntry>,
    pub available_actions: Vec<String>,
    pub own_player_id: PlayerId,
    pub player_names: BTreeMap<PlayerId, String>,
    pub allow_inter_player_transactions: bool,
    /// Milliseconds since the unix epoch.
    pub captured_at: i64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOrderEntry {
    pub player_id: PlayerId,
    /// CSS custom properties (`--name`, value) the page styles the player with.
    pub color_vars: Vec<(String, String)>,
    pub has_passed: bool,
    pub is_current: bool,
    /// Milliseconds.
    pub accumulated_time_excluding_current_turn: i64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankLogEntry {
    pub formula: Option<String>,
    pub initiator_id: PlayerId,
    pub associate_id: Option<PlayerId>,
    pub token_kind: TokenKind,
    pub amount: i64,
    /// Natural key of the entry.
    pub timestamp: i64,
}

impl GameSnapshot {
    pub fn check_shape(&self) -> Result<(), SyncError> {
        if self.turn_order.is_empty() {
            return Err(SyncError::IllegalSnapshot("turn order is empty".into()));
        }

        let mut player_ids = HashSet::new();
        for entry in &self.turn_order {
            if !player_ids.insert(entry.player_id.as_str()) {
                return Err(SyncError::IllegalSnapshot(format!("player {} appears twice in the turn order", entry.player_id)));
            }
        }

        if !player_ids.contains(self.own_player_id.as_str()) {
            return Err(SyncError::IllegalSnapshot(format!("own player {} is not in the turn order", self.own_player_id)));
        }

        if self.token_totals.len() != player_ids.len() || self.token_totals.keys().any(|id| !player_ids.contains(id.as_str())) {
            return Err(SyncError::IllegalSnapshot("token totals and turn order disagree on the players".into()));
        }

        let mut timestamps = HashSet::new();
        for entry in &self.bank_log_preview {
            if !timestamps.insert(entry.timestamp) {
                return Err(SyncError::IllegalSnapshot(format!("bank log timestamp {} is not unique", entry.timestamp)));
            }
        }

        Ok(())
    }

    pub fn current_player(&self) -> Option<&TurnOrderEntry> {
        self.turn_order.iter().find(|entry| entry.is_current)
    }

    /// Token kinds the local player holds, in a stable order.
    pub fn own_tokens(&self) -> Vec<TokenKind> {
        self.token_totals
            .get(&self.own_player_id)
            .map(|tokens| tokens.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Turn order ids with the local player moved to the front.
    pub fn player_ids_own_first(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.turn_order.iter().map(|entry| entry.player_id.clone()).collect();
        if let Some(index) = ids.iter().position(|id| *id == self.own_player_id) {
            let own = ids.remove(index);
            ids.insert(0, own);
        }
        ids
    }

    pub fn color_vars_of(&self, player_id: &str) -> &[(String, String)] {
        self.turn_order
            .iter()
            .find(|entry| entry.player_id == player_id)
            .map(|entry| entry.color_vars.as_slice())
            .unwrap_or(&[])
    }
}
