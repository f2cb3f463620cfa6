use std::collections::BTreeMap;

use host::{
    page::{LogNode, PlayerTile},
    GamePage,
};
use msgs::{
    snapshot::{BankLogEntry, TurnOrderEntry},
    GameSnapshot, SyncError,
};

fn illegal(reason: impl Into<String>) -> SyncError {
    SyncError::IllegalSnapshot(reason.into())
}

fn parse_int(what: &str, raw: Option<&str>) -> Result<i64, SyncError> {
    let raw = raw.ok_or_else(|| illegal(format!("{what} is missing")))?;
    raw.trim().parse().map_err(|_| illegal(format!("{what} is not a whole number: {raw:?}")))
}

pub fn parse_version(raw: Option<&str>) -> Result<u64, SyncError> {
    let raw = raw.ok_or_else(|| illegal("game state version is missing"))?;
    raw.trim().parse().map_err(|_| illegal(format!("game state version is not a counter: {raw:?}")))
}

/// Pulls every `--name: value;` declaration out of an inline style.
pub fn parse_color_vars(style: &str) -> Vec<(String, String)> {
    let mut declarations: Vec<&str> = style.split(';').collect();
    // whatever follows the last ';' is unterminated
    declarations.pop();

    declarations
        .into_iter()
        .filter_map(|declaration| {
            let start = declaration.find("--")?;
            let (name, value) = declaration[start..].split_once(':')?;
            let valid_name = name.len() > 2 && name[2..].chars().all(|c| c.is_ascii_alphabetic() || c == '-');
            let value = value.trim();
            (valid_name && !value.is_empty()).then(|| (name.to_owned(), value.to_owned()))
        })
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|value| !value.is_empty()).cloned()
}

fn extract_player(tile: &PlayerTile) -> Result<(TurnOrderEntry, BTreeMap<String, i64>), SyncError> {
    let player_id = non_empty(&tile.player_id).ok_or_else(|| illegal("player tile without an id"))?;
    let time = parse_int("time of player", tile.time_total_except_current_turn.as_deref())?;

    let mut tokens = BTreeMap::new();
    for (token, amount) in &tile.token_amounts {
        tokens.insert(token.clone(), parse_int("token amount", Some(amount))?);
    }

    let entry = TurnOrderEntry {
        color_vars: tile.style.as_deref().map(parse_color_vars).unwrap_or_default(),
        has_passed: tile.has_passed,
        is_current: tile.is_active_player,
        accumulated_time_excluding_current_turn: time,
        player_id,
    };
    Ok((entry, tokens))
}

fn extract_log_entry(node: &LogNode) -> Result<BankLogEntry, SyncError> {
    Ok(BankLogEntry {
        formula: non_empty(&node.formula),
        initiator_id: non_empty(&node.initiator).ok_or_else(|| illegal("log entry without initiator"))?,
        associate_id: non_empty(&node.associate),
        token_kind: non_empty(&node.token).ok_or_else(|| illegal("log entry without token"))?,
        amount: parse_int("log amount", node.amount.as_deref())?,
        timestamp: parse_int("log timestamp", node.ts.as_deref())?,
    })
}

/// Reads the whole page into a snapshot. Admin tiles are not players.
pub fn extract_snapshot(page: &dyn GamePage, captured_at: i64) -> Result<GameSnapshot, SyncError> {
    let anchor = page.anchor().ok_or_else(|| illegal("the game page is missing"))?;
    let version = parse_version(anchor.version.as_deref())?;
    let tiles = page.player_tiles();

    let mut turn_order = Vec::new();
    let mut token_totals = BTreeMap::new();
    let mut player_names = BTreeMap::new();
    for tile in tiles.iter().filter(|tile| !tile.is_admin) {
        let (entry, tokens) = extract_player(tile)?;
        token_totals.insert(entry.player_id.clone(), tokens);
        player_names.insert(entry.player_id.clone(), tile.name.clone().unwrap_or_default());
        turn_order.push(entry);
    }

    let user = tiles.iter().find(|tile| tile.is_user).ok_or_else(|| illegal("no tile belongs to the local player"))?;
    let own_player_id = non_empty(&user.player_id).ok_or_else(|| illegal("the local player has no id"))?;

    let bank_log_preview = page.bank_log_preview().iter().map(extract_log_entry).collect::<Result<Vec<_>, _>>()?;

    let snapshot = GameSnapshot {
        version,
        turn_order,
        token_totals,
        bank_log_preview,
        available_actions: user.actions.iter().map(|action| action.trim().to_owned()).collect(),
        own_player_id,
        player_names,
        allow_inter_player_transactions: anchor.allow_inter_player_transactions.as_deref() == Some("true"),
        captured_at,
    };
    snapshot.check_shape()?;
    Ok(snapshot)
}
