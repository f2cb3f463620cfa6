use tokio::sync::broadcast;

/// Id of the node whose version attribute the page bumps on every state change.
pub const ANCHOR_ID: &str = "game-page";
pub const VERSION_ATTRIBUTE: &str = "data-game-state-version";
pub const BANK_PANEL_ID: &str = "bank-transfer-overlay-control-panel";
/// Sentinel the panel writes into its result attribute when the detail is in the error attribute.
pub const PANEL_ERROR_SENTINEL: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    NodeAdded { id: String },
    NodeRemoved { id: String },
    AttributeChanged { node: String, attribute: String },
}

/// Raw attributes of the anchor node. Parsing is left to the reader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorNode {
    pub version: Option<String>,
    pub allow_inter_player_transactions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerTile {
    pub player_id: Option<String>,
    /// Inline style attribute, carrying `--name: value;` colour variables.
    pub style: Option<String>,
    pub name: Option<String>,
    pub is_admin: bool,
    pub is_user: bool,
    pub has_passed: bool,
    pub is_active_player: bool,
    pub time_total_except_current_turn: Option<String>,
    /// (token, amount) pairs as the page renders them.
    pub token_amounts: Vec<(String, String)>,
    /// Labels of the action buttons inside the tile.
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogNode {
    pub formula: Option<String>,
    pub initiator: Option<String>,
    pub associate: Option<String>,
    pub token: Option<String>,
    pub amount: Option<String>,
    pub ts: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferField {
    Associate,
    Formula,
    Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelTrigger {
    Submit,
    Check,
}

/// The result/error attribute pair of the bank-transfer panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelAttributes {
    pub result: String,
    pub error: String,
}

/// Contract of the third-party page the source adapter scrapes. The page is
/// not ours; everything comes back as raw attribute text.
pub trait GamePage: Send + Sync {
    /// Starts observing the document. Every mutation after this call is delivered.
    fn observe(&self) -> broadcast::Receiver<Mutation>;

    fn anchor(&self) -> Option<AnchorNode>;

    /// Tiles inside the timer container, in page order.
    fn player_tiles(&self) -> Vec<PlayerTile>;

    fn bank_log_preview(&self) -> Vec<LogNode>;

    /// Clicks every action control of the local player labelled `label`.
    /// Returns how many were clicked.
    fn click_user_action(&self, label: &str) -> usize;

    /// Returns false when the field is missing from the page.
    fn set_transfer_field(&self, field: TransferField, value: &str) -> bool;

    fn click_panel(&self, trigger: PanelTrigger) -> bool;

    fn panel_attributes(&self) -> Option<PanelAttributes>;
}
