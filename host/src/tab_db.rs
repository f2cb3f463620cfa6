use std::sync::Arc;

use msgs::{Indicator, TabId};
use tokio::sync::oneshot;

use crate::{host::{ScriptKind, TabInfo}, page::GamePage, port::ContentPort};

/// A script living in a tab. Dropping it tears the script down.
pub struct ContentScript {
    pub kind: ScriptKind,
    pub port: ContentPort,
    pub kill: oneshot::Sender<()>,
}

pub struct Tab {
    pub id: TabId,
    pub url: String,
    pub page: Option<Arc<dyn GamePage>>,
    pub content: Option<ContentScript>,
    pub indicator: Indicator,
}

impl Tab {
    pub fn info(&self) -> TabInfo {
        TabInfo { id: self.id, url: self.url.clone() }
    }
}

pub struct TabDb {
    pub tab_id_counter: TabId,
    pub tabs: Vec<Tab>,
}

impl TabDb {
    pub fn new() -> TabDb {
        TabDb {
            tab_id_counter: 1,
            tabs: Vec::new(),
        }
    }

    pub fn new_tab(&mut self, url: String, page: Option<Arc<dyn GamePage>>) -> TabId {
        let id = self.tab_id_counter;
        self.tab_id_counter += 1;
        self.tabs.push(Tab { id, url, page, content: None, indicator: Indicator::Default });
        id
    }

    pub fn get(&self, tab_id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == tab_id)
    }

    pub fn get_mut(&mut self, tab_id: TabId) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|tab| tab.id == tab_id)
    }

    pub fn all_tabs(&self) -> impl Iterator<Item = &Tab> {
        self.tabs.iter()
    }

    pub fn remove(&mut self, tab_id: TabId) -> Option<Tab> {
        let index = self.tabs.iter().position(|tab| tab.id == tab_id)?;
        Some(self.tabs.remove(index))
    }
}

impl Default for TabDb {
    fn default() -> TabDb {
        TabDb::new()
    }
}
