use std::sync::{Mutex, MutexGuard, PoisonError};

use host::page::{
    AnchorNode, GamePage, LogNode, Mutation, PanelAttributes, PanelTrigger, PlayerTile, TransferField, ANCHOR_ID, BANK_PANEL_ID,
    PANEL_ERROR_SENTINEL, VERSION_ATTRIBUTE,
};
use tokio::sync::broadcast;

use crate::{
    formula_eval::{evaluate, format_number},
    game::TimerGame,
};

/// How many log entries the page keeps in its preview.
pub const BANK_LOG_PREVIEW_LEN: usize = 10;
const MUTATION_CAPACITY: usize = 256;
const TURN_TIME_MS: i64 = 5_000;

#[derive(Default)]
struct TransferFields {
    associate: String,
    formula: String,
    token: String,
}

struct PageState {
    game: TimerGame,
    anchor_mounted: bool,
    version_override: Option<String>,
    panel: PanelAttributes,
    fields: TransferFields,
    responsive: bool,
    clicked: Vec<String>,
}

/// In-process stand-in for the third-party timer page.
pub struct SimulatedTimerPage {
    state: Mutex<PageState>,
    mutations: broadcast::Sender<Mutation>,
}

impl SimulatedTimerPage {
    pub fn new(game: TimerGame) -> SimulatedTimerPage {
        let (mutations, _) = broadcast::channel(MUTATION_CAPACITY);
        SimulatedTimerPage {
            state: Mutex::new(PageState {
                game,
                anchor_mounted: true,
                version_override: None,
                panel: PanelAttributes::default(),
                fields: TransferFields::default(),
                responsive: true,
                clicked: Vec::new(),
            }),
            mutations,
        }
    }

    /// A page that has not rendered the game yet.
    pub fn without_anchor(game: TimerGame) -> SimulatedTimerPage {
        let page = SimulatedTimerPage::new(game);
        page.lock().anchor_mounted = false;
        page
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, mutation: Mutation) {
        // nobody observing is fine
        let _ = self.mutations.send(mutation);
    }

    fn emit_version(&self) {
        self.emit(Mutation::AttributeChanged { node: ANCHOR_ID.to_owned(), attribute: VERSION_ATTRIBUTE.to_owned() });
    }

    fn emit_panel(&self, attribute: &str) {
        self.emit(Mutation::AttributeChanged { node: BANK_PANEL_ID.to_owned(), attribute: attribute.to_owned() });
    }

    /// Applies `change` to the game and announces the new version.
    pub fn update(&self, change: impl FnOnce(&mut TimerGame)) {
        {
            let mut state = self.lock();
            change(&mut state.game);
            state.game.version += 1;
        }
        self.emit_version();
    }

    pub fn game(&self) -> TimerGame {
        self.lock().game.clone()
    }

    pub fn version(&self) -> u64 {
        self.lock().game.version
    }

    pub fn bump_version(&self) {
        self.update(|_| {});
    }

    /// Rewrites the version attribute with its current value.
    pub fn touch_version(&self) {
        self.emit_version();
    }

    pub fn corrupt_version(&self, text: &str) {
        self.lock().version_override = Some(text.to_owned());
        self.emit_version();
    }

    pub fn advance_turn(&self) {
        self.lock().game.advance_turn(TURN_TIME_MS);
        self.emit_version();
    }

    pub fn set_actions(&self, actions: &[&str]) {
        self.update(|game| game.actions = actions.iter().map(|action| action.to_string()).collect());
    }

    pub fn set_allow_inter_player_transactions(&self, allow: bool) {
        self.update(|game| game.allow_inter_player_transactions = allow);
    }

    /// Books a bank transaction for the local player as if typed on the page.
    pub fn log_transaction(&self, token: &str, amount: i64) -> Result<(), String> {
        self.lock().game.transfer(token, amount, None, None)?;
        self.emit_version();
        Ok(())
    }

    pub fn mount_anchor(&self) {
        self.lock().anchor_mounted = true;
        self.emit(Mutation::NodeAdded { id: ANCHOR_ID.to_owned() });
    }

    pub fn unmount_anchor(&self) {
        self.lock().anchor_mounted = false;
        self.emit(Mutation::NodeRemoved { id: ANCHOR_ID.to_owned() });
    }

    /// An unresponsive page ignores panel clicks.
    pub fn set_responsive(&self, responsive: bool) {
        self.lock().responsive = responsive;
    }

    pub fn clicked_actions(&self) -> Vec<String> {
        self.lock().clicked.clone()
    }

    fn set_panel(&self, result: &str, error: &str) {
        {
            let mut state = self.lock();
            state.panel = PanelAttributes { result: result.to_owned(), error: error.to_owned() };
        }
        self.emit_panel("data-result");
    }

    /// Walks the panel through clear, then (on error) the flagged state, then the answer.
    fn answer_panel(&self, outcome: Result<String, String>) {
        self.set_panel("", "");
        match outcome {
            Ok(result) => self.set_panel(&result, ""),
            Err(error) => {
                self.set_panel(PANEL_ERROR_SENTINEL, "");
                self.set_panel(PANEL_ERROR_SENTINEL, &error);
            }
        }
    }

    fn submit_transaction(&self) -> Result<String, String> {
        let mut state = self.lock();
        let formula = state.fields.formula.trim().to_owned();
        let amount = evaluate(&formula).map_err(|e| e.to_string())?;
        if !amount.is_finite() {
            return Err("Result is infinite".to_owned());
        }
        if amount.fract() != 0.0 {
            return Err("The formula must evaluate to a whole number".to_owned());
        }
        let token = state.fields.token.clone();
        let associate = Some(state.fields.associate.clone()).filter(|associate| !associate.is_empty());
        let recorded_formula = formula.parse::<f64>().is_err().then(|| formula.clone());
        state.game.transfer(&token, amount as i64, associate.as_deref(), recorded_formula)?;
        Ok(format_number(amount))
    }
}

impl GamePage for SimulatedTimerPage {
    fn observe(&self) -> broadcast::Receiver<Mutation> {
        self.mutations.subscribe()
    }

    fn anchor(&self) -> Option<AnchorNode> {
        let state = self.lock();
        if !state.anchor_mounted {
            return None;
        }
        Some(AnchorNode {
            version: Some(state.version_override.clone().unwrap_or_else(|| state.game.version.to_string())),
            allow_inter_player_transactions: Some(state.game.allow_inter_player_transactions.to_string()),
        })
    }

    fn player_tiles(&self) -> Vec<PlayerTile> {
        let state = self.lock();
        if !state.anchor_mounted {
            return Vec::new();
        }
        let game = &state.game;
        game.players
            .iter()
            .enumerate()
            .map(|(index, player)| {
                let is_user = player.id == game.user;
                PlayerTile {
                    player_id: Some(player.id.clone()),
                    style: Some(player.style.clone()),
                    name: Some(player.name.clone()),
                    is_admin: player.is_admin,
                    is_user,
                    has_passed: player.has_passed,
                    is_active_player: index == game.current,
                    time_total_except_current_turn: Some(player.time_ms.to_string()),
                    token_amounts: player.tokens.iter().map(|(token, amount)| (token.clone(), amount.to_string())).collect(),
                    actions: if is_user { game.actions.clone() } else { Vec::new() },
                }
            })
            .collect()
    }

    fn bank_log_preview(&self) -> Vec<LogNode> {
        let state = self.lock();
        let log = &state.game.bank_log;
        log[log.len().saturating_sub(BANK_LOG_PREVIEW_LEN)..]
            .iter()
            .map(|record| LogNode {
                formula: record.formula.clone(),
                initiator: Some(record.initiator.clone()),
                associate: record.associate.clone(),
                token: Some(record.token.clone()),
                amount: Some(record.amount.to_string()),
                ts: Some(record.ts.to_string()),
            })
            .collect()
    }

    fn click_user_action(&self, label: &str) -> usize {
        let clicked = {
            let mut state = self.lock();
            let clicked = state.game.actions.iter().filter(|action| action.trim() == label).count();
            for _ in 0..clicked {
                state.clicked.push(label.to_owned());
            }
            if clicked > 0 {
                match label {
                    "End Turn" => state.game.advance_turn(TURN_TIME_MS),
                    "Pass" => {
                        let user = state.game.user.clone();
                        if let Some(player) = state.game.player_mut(&user) {
                            player.has_passed = true;
                        }
                        state.game.advance_turn(TURN_TIME_MS);
                    }
                    _ => state.game.version += 1,
                }
            }
            clicked
        };
        if clicked > 0 {
            self.emit_version();
        }
        clicked
    }

    fn set_transfer_field(&self, field: TransferField, value: &str) -> bool {
        let mut state = self.lock();
        if !state.anchor_mounted {
            return false;
        }
        let slot = match field {
            TransferField::Associate => &mut state.fields.associate,
            TransferField::Formula => &mut state.fields.formula,
            TransferField::Token => &mut state.fields.token,
        };
        *slot = value.to_owned();
        true
    }

    fn click_panel(&self, trigger: PanelTrigger) -> bool {
        let (mounted, responsive) = {
            let state = self.lock();
            (state.anchor_mounted, state.responsive)
        };
        if !mounted {
            return false;
        }
        if !responsive {
            tracing::debug!(?trigger, "simulated page ignores the click");
            return true;
        }

        let outcome = match trigger {
            PanelTrigger::Check => {
                let formula = self.lock().fields.formula.clone();
                evaluate(&formula).map(format_number).map_err(|e| e.to_string())
            }
            PanelTrigger::Submit => self.submit_transaction(),
        };
        let booked = trigger == PanelTrigger::Submit && outcome.is_ok();
        self.answer_panel(outcome);
        if booked {
            self.emit_version();
        }
        true
    }

    fn panel_attributes(&self) -> Option<PanelAttributes> {
        let state = self.lock();
        state.anchor_mounted.then(|| state.panel.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_passes_through_the_flagged_state_on_errors() {
        let page = SimulatedTimerPage::new(TimerGame::sample());
        let mut mutations = page.observe();
        page.set_transfer_field(TransferField::Formula, "2*(");
        page.click_panel(PanelTrigger::Check);

        let mut count = 0;
        while mutations.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 3);
        let attributes = page.panel_attributes().unwrap();
        assert_eq!(attributes.result, PANEL_ERROR_SENTINEL);
        assert!(!attributes.error.is_empty());
    }

    #[test]
    fn clicking_end_turn_moves_the_game_on() {
        let page = SimulatedTimerPage::new(TimerGame::sample());
        assert_eq!(page.click_user_action("End Turn"), 1);
        assert_eq!(page.click_user_action("Dance"), 0);
        let game = page.game();
        assert_eq!(game.version, 2);
        assert_eq!(game.current_player().map(|p| p.id.as_str()), Some("bob"));
    }

    #[test]
    fn preview_keeps_the_latest_entries() {
        let page = SimulatedTimerPage::new(TimerGame::sample());
        for amount in 1..=12 {
            page.log_transaction("💲", amount).unwrap();
        }
        let preview = page.bank_log_preview();
        assert_eq!(preview.len(), BANK_LOG_PREVIEW_LEN);
        assert_eq!(preview.last().and_then(|node| node.amount.clone()).as_deref(), Some("12"));
    }

    #[test]
    fn admin_tiles_are_marked() {
        let page = SimulatedTimerPage::new(TimerGame::sample());
        let tiles = page.player_tiles();
        assert!(tiles[0].is_admin);
        assert!(tiles[1].is_user && tiles[1].is_active_player);
        assert_eq!(tiles[1].actions.len(), 2);
        assert!(tiles[2].actions.is_empty());
    }
}
