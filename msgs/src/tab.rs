pub type TabId = u32;

/// Connection state shown on the toolbar icon of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Indicator {
    #[default]
    Default,
    Success,
    Failure,
}

impl Indicator {
    pub fn from_connected(connected: Option<bool>) -> Indicator {
        match connected {
            Some(true) => Indicator::Success,
            Some(false) => Indicator::Failure,
            None => Indicator::Default,
        }
    }
}
