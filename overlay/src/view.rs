//! What the overlay currently shows. Published as a whole after every change
//! so observers never see a half-applied render.

use msgs::snapshot::{PlayerId, TokenKind};

use crate::{
    actions_tray::ActionButton,
    bank::{AssociateChoice, BankTotals},
    bank_log::LogLine,
};

pub const HELP_TEXT: &str = "Type a number or a formula, e.g. 2*3+1. \
Allowed are digits, + - * /, parentheses and the rounding functions \
r(..) to round, d(..) to round down and u(..) to round up. \
Type = for +. Enter submits, Shift+Enter submits and closes, Escape leaves the input.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerMarker {
    pub player_id: PlayerId,
    pub color_vars: Vec<(String, String)>,
    pub active: bool,
    pub passed: bool,
    /// Zero-based place in the turn order.
    pub position: usize,
    /// Percent of the total play time, once anybody has played.
    pub time_share: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayView {
    pub buttons: Vec<ActionButton>,
    pub revealed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormView {
    pub open: bool,
    pub focused: bool,
    pub tokens: Vec<TokenKind>,
    pub token: Option<TokenKind>,
    pub associates: Vec<AssociateChoice>,
    pub associate: Option<PlayerId>,
    pub formula: String,
    pub cursor: usize,
    pub hint: String,
    pub hover: Option<String>,
    pub submit_label: String,
    pub submit_enabled: bool,
    pub in_error: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BankView {
    pub totals: BankTotals,
    pub log: Vec<LogLine>,
    pub log_visible: bool,
    pub opponents_visible: bool,
    pub form: FormView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Alert (String),
    Help,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayView {
    pub active: bool,
    pub placeholder: bool,
    pub players: Vec<PlayerMarker>,
    pub tray: Option<TrayView>,
    pub bank: Option<BankView>,
    pub notice: Option<Notice>,
    /// Number of times a store change was rendered.
    pub renders: u64,
    pub placeholder_renders: u64,
}

impl OverlayView {
    pub fn button(&self, label: &str) -> Option<&ActionButton> {
        self.tray.as_ref()?.buttons.iter().find(|button| button.label == label)
    }

    pub fn marker(&self, player_id: &str) -> Option<&PlayerMarker> {
        self.players.iter().find(|marker| marker.player_id == player_id)
    }

    pub fn form(&self) -> Option<&FormView> {
        self.bank.as_ref().map(|bank| &bank.form)
    }
}
