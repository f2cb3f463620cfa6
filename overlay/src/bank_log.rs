use msgs::snapshot::{BankLogEntry, PlayerId, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub ts: i64,
    pub initiator_id: PlayerId,
    pub associate_id: Option<PlayerId>,
    pub token: TokenKind,
    pub amount: i64,
    /// Shown on hover. Absent for plain numbers.
    pub formula: Option<String>,
    pub is_new: bool,
}

impl From<&BankLogEntry> for LogLine {
    fn from(entry: &BankLogEntry) -> LogLine {
        LogLine {
            ts: entry.timestamp,
            initiator_id: entry.initiator_id.clone(),
            associate_id: entry.associate_id.clone(),
            token: entry.token_kind.clone(),
            amount: entry.amount,
            formula: entry.formula.clone(),
            is_new: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogChange {
    pub inserted: usize,
    pub removed: usize,
}

/// The last few bank transactions, newest first, keyed by timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankLog {
    window: usize,
    lines: Vec<LogLine>,
}

impl BankLog {
    pub fn new(window: usize) -> BankLog {
        BankLog { window, lines: Vec::new() }
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// `entries` is most-recent-last, as in the snapshot.
    pub fn reconcile(&mut self, entries: &[BankLogEntry]) -> LogChange {
        let window = &entries[entries.len().saturating_sub(self.window)..];
        let mut change = LogChange::default();

        for entry in window {
            if self.lines.iter().any(|line| line.ts == entry.timestamp) {
                continue;
            }
            let mut line = LogLine::from(entry);
            line.is_new = true;
            self.lines.insert(0, line);
            change.inserted += 1;
        }

        let before = self.lines.len();
        self.lines.retain(|line| window.iter().any(|entry| entry.timestamp == line.ts));
        change.removed = before - self.lines.len();
        change
    }

    /// Clears the "new" flags. Returns whether any were set.
    pub fn settle(&mut self) -> bool {
        let mut settled = false;
        for line in self.lines.iter_mut().filter(|line| line.is_new) {
            line.is_new = false;
            settled = true;
        }
        settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(timestamps: std::ops::RangeInclusive<i64>) -> Vec<BankLogEntry> {
        timestamps
            .map(|ts| BankLogEntry {
                formula: None,
                initiator_id: "p1".into(),
                associate_id: None,
                token_kind: "💲".into(),
                amount: ts,
                timestamp: ts,
            })
            .collect()
    }

    fn timestamps(log: &BankLog) -> Vec<i64> {
        log.lines().iter().map(|line| line.ts).collect()
    }

    #[test]
    fn only_the_window_is_shown_newest_first() {
        let mut log = BankLog::new(8);
        let change = log.reconcile(&entries(1..=9));
        assert_eq!(change, LogChange { inserted: 8, removed: 0 });
        assert_eq!(timestamps(&log), vec![9, 8, 7, 6, 5, 4, 3, 2]);
        assert!(log.lines().iter().all(|line| line.is_new));
    }

    #[test]
    fn repeated_snapshots_change_nothing() {
        let mut log = BankLog::new(8);
        log.reconcile(&entries(1..=9));
        assert!(log.settle());
        assert_eq!(log.reconcile(&entries(1..=9)), LogChange::default());
        assert_eq!(log.lines().len(), 8);
        assert!(!log.settle());
    }

    #[test]
    fn sliding_window_inserts_once_and_drops_the_oldest() {
        let mut log = BankLog::new(8);
        log.reconcile(&entries(1..=9));
        log.settle();

        let change = log.reconcile(&entries(1..=10));
        assert_eq!(change, LogChange { inserted: 1, removed: 1 });
        assert_eq!(timestamps(&log), vec![10, 9, 8, 7, 6, 5, 4, 3]);
        assert_eq!(log.lines().iter().filter(|line| line.is_new).count(), 1);
    }
}
