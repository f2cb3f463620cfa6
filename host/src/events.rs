use msgs::TabId;

use crate::{host::TabInfo, port::Delivery};

/// Everything the host tells the coordinator about.
#[derive(Debug)]
pub enum HostEvent {
    /// The toolbar action was clicked while `TabInfo` was the active tab.
    ActionClicked (TabInfo),
    TabRemoved (TabId),
    /// A navigation finished. `new_document` is false for same-document navigations.
    TabUpdated { tab: TabInfo, new_document: bool },
    /// A keyboard shortcut command fired in a tab.
    Command { tab: TabInfo, command: String },
    /// A content script sent a message to the coordinator.
    RuntimeMessage { sender: TabId, delivery: Delivery },
}
