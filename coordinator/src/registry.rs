use msgs::TabId;
use thiserror::Error;

/// Role of the one tab allowed to act as the source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceBinding {
    #[default]
    Unbound,
    Connecting { tab: TabId },
    Connected { tab: TabId, game_id: String },
    Disconnected { tab: TabId },
    Failed { tab: TabId },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {action} tab {tab} while {state:?}")]
    Illegal {
        action: &'static str,
        tab: TabId,
        state: SourceBinding,
    },
}

/// Owned by the coordinator loop. Never holds two source tabs.
#[derive(Debug, Default)]
pub struct Registry {
    binding: SourceBinding,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn binding(&self) -> &SourceBinding {
        &self.binding
    }

    /// The tab relayed requests go to.
    pub fn source_tab(&self) -> Option<TabId> {
        match self.binding {
            SourceBinding::Connected { tab, .. } => Some(tab),
            _ => None,
        }
    }

    /// The tab holding the source role, connected or still connecting.
    pub fn claimed_tab(&self) -> Option<TabId> {
        match self.binding {
            SourceBinding::Connecting { tab } | SourceBinding::Connected { tab, .. } => Some(tab),
            _ => None,
        }
    }

    pub fn active_game(&self) -> Option<&str> {
        match &self.binding {
            SourceBinding::Connected { game_id, .. } => Some(game_id),
            _ => None,
        }
    }

    fn illegal(&self, action: &'static str, tab: TabId) -> TransitionError {
        TransitionError::Illegal { action, tab, state: self.binding.clone() }
    }

    pub fn begin_connect(&mut self, tab: TabId) -> Result<(), TransitionError> {
        match self.binding {
            SourceBinding::Unbound | SourceBinding::Disconnected { .. } | SourceBinding::Failed { .. } => {
                self.binding = SourceBinding::Connecting { tab };
                Ok(())
            }
            _ => Err(self.illegal("connect", tab)),
        }
    }

    pub fn connected(&mut self, tab: TabId, game_id: &str) -> Result<(), TransitionError> {
        match self.binding {
            SourceBinding::Connecting { tab: connecting } if connecting == tab => {
                self.binding = SourceBinding::Connected { tab, game_id: game_id.to_owned() };
                Ok(())
            }
            _ => Err(self.illegal("confirm", tab)),
        }
    }

    pub fn failed(&mut self, tab: TabId) -> Result<(), TransitionError> {
        match self.binding {
            SourceBinding::Connecting { tab: connecting } if connecting == tab => {
                self.binding = SourceBinding::Failed { tab };
                Ok(())
            }
            _ => Err(self.illegal("fail", tab)),
        }
    }

    /// Disconnecting a tab that is not bound only records it; disconnecting
    /// while another tab is bound is refused.
    pub fn disconnected(&mut self, tab: TabId) -> Result<(), TransitionError> {
        match self.binding {
            SourceBinding::Connected { tab: bound, .. } | SourceBinding::Connecting { tab: bound } if bound != tab => {
                Err(self.illegal("disconnect", tab))
            }
            _ => {
                self.binding = SourceBinding::Disconnected { tab };
                Ok(())
            }
        }
    }
}
