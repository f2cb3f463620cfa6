use msgs::snapshot::TurnOrderEntry;

/// Percentage of the total play time each player has used, in turn order.
/// The current player is charged the time since the snapshot was taken.
/// `None` while nobody has used any time.
pub fn project_time_shares(turn_order: &[TurnOrderEntry], captured_at: i64, now: i64) -> Vec<Option<u32>> {
    let added = if turn_order.iter().any(|entry| entry.is_current) {
        (now - captured_at).max(0)
    } else {
        0
    };
    let total: i64 = turn_order.iter().map(|entry| entry.accumulated_time_excluding_current_turn).sum::<i64>() + added;

    turn_order
        .iter()
        .map(|entry| {
            let time = entry.accumulated_time_excluding_current_turn + if entry.is_current { added } else { 0 };
            (total > 0).then(|| (100.0 * time as f64 / total as f64).round() as u32)
        })
        .collect()
}
