#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameSuffix {
    Join,
    Create,
}

/// A URL of the timer site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl {
    pub game_id: Option<String>,
    pub suffix: Option<GameSuffix>,
    ends_with_join: bool,
}

impl SourceUrl {
    /// The game this tab may be bound to. Join pages are not games yet.
    pub fn connectable_game(&self) -> Option<&str> {
        if self.ends_with_join {
            return None
        }
        self.game_id.as_deref()
    }
}

/// Matches `http(s)://<host>/[game/<id>[/join|/create]]...` against the known hosts.
pub fn match_source_url(url: &str, hosts: &[String]) -> Option<SourceUrl> {
    let rest = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://"))?;
    let path = hosts.iter().find_map(|host| rest.strip_prefix(host.as_str())?.strip_prefix('/'))?;

    let mut source_url = SourceUrl {
        game_id: None,
        suffix: None,
        ends_with_join: url.ends_with("/join"),
    };

    let Some(game) = path.strip_prefix("game/") else {
        return Some(source_url)
    };
    let id_len = game
        .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'))
        .unwrap_or(game.len());
    if id_len == 0 {
        return Some(source_url)
    }

    let (id, tail) = game.split_at(id_len);
    source_url.game_id = Some(id.to_owned());
    source_url.suffix = if tail.starts_with("/join") {
        Some(GameSuffix::Join)
    } else if tail.starts_with("/create") {
        Some(GameSuffix::Create)
    } else {
        None
    };
    Some(source_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<String> {
        vec!["localhost:3000".into(), "sharedgametimer.com".into()]
    }

    #[test]
    fn game_pages_carry_their_id() {
        let url = match_source_url("https://sharedgametimer.com/game/abc-12", &hosts()).unwrap();
        assert_eq!(url.game_id.as_deref(), Some("abc-12"));
        assert_eq!(url.connectable_game(), Some("abc-12"));

        let url = match_source_url("http://localhost:3000/game/x1/create", &hosts()).unwrap();
        assert_eq!(url.suffix, Some(GameSuffix::Create));
        assert_eq!(url.connectable_game(), Some("x1"));
    }

    #[test]
    fn join_pages_are_not_connectable() {
        let url = match_source_url("https://sharedgametimer.com/game/abc/join", &hosts()).unwrap();
        assert_eq!(url.suffix, Some(GameSuffix::Join));
        assert_eq!(url.connectable_game(), None);
    }

    #[test]
    fn site_pages_without_a_game_still_match() {
        let url = match_source_url("https://sharedgametimer.com/", &hosts()).unwrap();
        assert_eq!(url.game_id, None);
        let url = match_source_url("https://sharedgametimer.com/game/", &hosts()).unwrap();
        assert_eq!(url.game_id, None);
    }

    #[test]
    fn foreign_hosts_do_not_match() {
        assert!(match_source_url("https://example.com/game/abc", &hosts()).is_none());
        assert!(match_source_url("https://sharedgametimer.com", &hosts()).is_none());
        assert!(match_source_url("ftp://localhost:3000/game/abc", &hosts()).is_none());
    }
}
