use msgs::{
    snapshot::{PlayerId, TokenKind},
    GameSnapshot,
};

use crate::formula::{FormStatus, FormulaInput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsRow {
    pub player_id: PlayerId,
    pub name: String,
    pub is_opponent: bool,
    /// One amount per column of [`BankTotals::tokens`].
    pub amounts: Vec<i64>,
}

/// Token totals per player, own player on the first row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankTotals {
    pub tokens: Vec<TokenKind>,
    pub rows: Vec<TotalsRow>,
}

fn amounts_of(snapshot: &GameSnapshot, player_id: &str, tokens: &[TokenKind]) -> Vec<i64> {
    let totals = snapshot.token_totals.get(player_id);
    tokens
        .iter()
        .map(|token| totals.and_then(|totals| totals.get(token)).copied().unwrap_or(0))
        .collect()
}

fn name_of(snapshot: &GameSnapshot, player_id: &str) -> String {
    snapshot.player_names.get(player_id).cloned().unwrap_or_else(|| player_id.to_owned())
}

impl BankTotals {
    /// `None` while the local player holds no tokens, as there is no bank to show.
    pub fn build(snapshot: &GameSnapshot) -> Option<BankTotals> {
        let tokens = snapshot.own_tokens();
        if tokens.is_empty() {
            return None;
        }
        let rows = snapshot
            .player_ids_own_first()
            .into_iter()
            .map(|player_id| TotalsRow {
                name: name_of(snapshot, &player_id),
                is_opponent: player_id != snapshot.own_player_id,
                amounts: amounts_of(snapshot, &player_id, &tokens),
                player_id,
            })
            .collect();
        Some(BankTotals { tokens, rows })
    }

    /// Updates the amounts in place. Rows and columns stay as first built.
    pub fn refresh(&mut self, snapshot: &GameSnapshot) {
        for row in &mut self.rows {
            row.amounts = amounts_of(snapshot, &row.player_id, &self.tokens);
        }
    }

    pub fn amount(&self, player_id: &str, token: &str) -> Option<i64> {
        let column = self.tokens.iter().position(|t| t == token)?;
        let row = self.rows.iter().find(|row| row.player_id == player_id)?;
        row.amounts.get(column).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociateChoice {
    /// `None` is the bank.
    pub player_id: Option<PlayerId>,
    pub label: String,
}

pub const BANK_LABEL: &str = "Bank";

#[derive(Debug, Clone, Default)]
pub struct TransactionForm {
    pub open: bool,
    pub focused: bool,
    pub tokens: Vec<TokenKind>,
    pub token: Option<TokenKind>,
    pub associates: Vec<AssociateChoice>,
    pub associate: Option<PlayerId>,
    pub allow_inter_player_transactions: bool,
    pub input: FormulaInput,
    pub status: FormStatus,
}

impl TransactionForm {
    pub fn new() -> TransactionForm {
        TransactionForm::default()
    }

    /// Takes over the choices a snapshot offers.
    pub fn refresh(&mut self, snapshot: &GameSnapshot) {
        self.tokens = snapshot.own_tokens();
        if !self.token.as_ref().is_some_and(|token| self.tokens.contains(token)) {
            self.token = self.tokens.first().cloned();
        }

        self.associates = std::iter::once(AssociateChoice { player_id: None, label: BANK_LABEL.to_owned() })
            .chain(
                snapshot
                    .turn_order
                    .iter()
                    .filter(|entry| entry.player_id != snapshot.own_player_id)
                    .map(|entry| AssociateChoice {
                        label: name_of(snapshot, &entry.player_id),
                        player_id: Some(entry.player_id.clone()),
                    }),
            )
            .collect();

        self.allow_inter_player_transactions = snapshot.allow_inter_player_transactions;
        let known = self.associates.iter().any(|choice| choice.player_id == self.associate);
        if !self.allow_inter_player_transactions || !known {
            self.associate = None;
        }
    }

    fn reset_input(&mut self) {
        self.input.clear();
        self.status = FormStatus::Neutral;
    }

    pub fn toggle(&mut self) {
        if self.open {
            self.close();
        } else {
            self.reset_input();
            self.open = true;
        }
    }

    pub fn close(&mut self) {
        self.open = false;
        self.focused = false;
    }

    /// Opens the form for `token` with the formula input focused.
    pub fn start_transaction(&mut self, token: &str) {
        if !self.open {
            self.reset_input();
            self.open = true;
        }
        self.select_token(token);
        self.focused = true;
    }

    pub fn select_token(&mut self, token: &str) -> bool {
        if !self.tokens.iter().any(|t| t == token) {
            return false;
        }
        self.token = Some(token.to_owned());
        true
    }

    pub fn select_associate(&mut self, associate: Option<PlayerId>) -> bool {
        if associate.is_some() && !self.allow_inter_player_transactions {
            return false;
        }
        if !self.associates.iter().any(|choice| choice.player_id == associate) {
            return false;
        }
        self.associate = associate;
        true
    }

    pub fn focus(&mut self) {
        self.focused = self.open;
    }

    /// Back to a closed, empty form.
    pub fn clear(&mut self) {
        *self = TransactionForm::new();
    }
}
