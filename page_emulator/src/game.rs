use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: String,
    pub name: String,
    /// Inline style of the tile.
    pub style: String,
    pub is_admin: bool,
    pub time_ms: i64,
    pub tokens: BTreeMap<String, i64>,
    pub has_passed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub formula: Option<String>,
    pub initiator: String,
    pub associate: Option<String>,
    pub token: String,
    pub amount: i64,
    pub ts: i64,
}

/// State the timer page renders.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerGame {
    pub version: u64,
    pub players: Vec<Player>,
    /// Index into `players` of whoever's turn it is.
    pub current: usize,
    pub user: String,
    pub actions: Vec<String>,
    pub bank_log: Vec<LogRecord>,
    pub allow_inter_player_transactions: bool,
    pub next_ts: i64,
}

fn player(id: &str, name: &str, style: &str, time_ms: i64, money: i64) -> Player {
    Player {
        id: id.to_owned(),
        name: name.to_owned(),
        style: style.to_owned(),
        is_admin: false,
        time_ms,
        tokens: BTreeMap::from([("💲".to_owned(), money), ("⭐".to_owned(), 0)]),
        has_passed: false,
    }
}

impl TimerGame {
    /// Three players and an admin; it is Alice's turn and Alice is the local player.
    pub fn sample() -> TimerGame {
        let admin = Player {
            is_admin: true,
            tokens: BTreeMap::new(),
            ..player("admin", "Admin", "", 0, 0)
        };
        TimerGame {
            version: 1,
            players: vec![
                admin,
                player("alice", "Alice", "background-color: rgb(221, 51, 51); --player-color: #dd3333; --text-color: white;", 60_000, 10),
                player("bob", "Bob", "--player-color: #3366dd; --text-color: white;", 30_000, 20),
                player("carol", "Carol", "--player-color: #33aa55; --text-color: black;", 10_000, 5),
            ],
            current: 1,
            user: "alice".to_owned(),
            actions: vec!["End Turn".to_owned(), "Pass".to_owned()],
            bank_log: Vec::new(),
            allow_inter_player_transactions: true,
            next_ts: 1_700_000_000_000,
        }
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current)
    }

    /// Moves the turn to the next non-admin player and charges the elapsed
    /// time to the one who had it.
    pub fn advance_turn(&mut self, elapsed_ms: i64) {
        if let Some(player) = self.players.get_mut(self.current) {
            player.time_ms += elapsed_ms;
        }
        let count = self.players.len();
        for step in 1..=count {
            let candidate = (self.current + step) % count;
            if !self.players[candidate].is_admin {
                self.current = candidate;
                break;
            }
        }
        self.version += 1;
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    /// Books `amount` of `token` to the local player, taken from `associate`
    /// or from the bank.
    pub fn transfer(&mut self, token: &str, amount: i64, associate: Option<&str>, formula: Option<String>) -> Result<(), String> {
        if associate.is_some() && !self.allow_inter_player_transactions {
            return Err("Transactions between players are not allowed in this game".to_owned());
        }
        let user = self.user.clone();
        let owns_token = self.player_mut(&user).is_some_and(|player| player.tokens.contains_key(token));
        if !owns_token {
            return Err(format!("Unknown token {token}"));
        }
        if let Some(associate) = associate {
            let Some(other) = self.player_mut(associate) else {
                return Err(format!("Unknown player {associate}"));
            };
            *other.tokens.entry(token.to_owned()).or_default() -= amount;
        }
        if let Some(player) = self.player_mut(&user) {
            *player.tokens.entry(token.to_owned()).or_default() += amount;
        }

        let ts = self.next_ts;
        self.next_ts += 1;
        self.bank_log.push(LogRecord {
            formula,
            initiator: user,
            associate: associate.map(str::to_owned),
            token: token.to_owned(),
            amount,
            ts,
        });
        self.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_skip_the_admin() {
        let mut game = TimerGame::sample();
        game.advance_turn(1000);
        game.advance_turn(1000);
        game.advance_turn(1000);
        assert_eq!(game.current_player().map(|p| p.id.as_str()), Some("alice"));
        assert_eq!(game.players[1].time_ms, 61_000);
        assert_eq!(game.version, 4);
    }

    #[test]
    fn transfers_move_tokens_and_log() {
        let mut game = TimerGame::sample();
        game.transfer("💲", 5, Some("bob"), Some("2+3".into())).unwrap();
        assert_eq!(game.players[1].tokens["💲"], 15);
        assert_eq!(game.players[2].tokens["💲"], 15);
        assert_eq!(game.bank_log.len(), 1);

        game.allow_inter_player_transactions = false;
        assert!(game.transfer("💲", 5, Some("bob"), None).is_err());
        assert!(game.transfer("🍎", 5, None, None).is_err());
    }
}
