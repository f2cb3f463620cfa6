use std::sync::Arc;

use anyhow::anyhow;
use msgs::{Indicator, Request, Response, SyncError, TabId};
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::{
    events::HostEvent,
    page::GamePage,
    port::{self, ContentPort, RuntimePort},
    storage::SnapshotStore,
    tab_db::{ContentScript, TabDb},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Source,
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// History/fragment change. Content scripts survive.
    SameDocument,
    /// Full load. Content scripts of the old document die.
    NewDocument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
}

/// Everything a freshly injected script gets to work with.
pub struct InjectionTarget {
    pub tab: TabId,
    pub script: ScriptKind,
    pub page: Option<Arc<dyn GamePage>>,
    pub store: SnapshotStore,
    pub runtime: RuntimePort,
    /// Resolves when the script is torn down.
    pub shutdown: oneshot::Receiver<()>,
}

/// Starts content scripts. Must be called from within a tokio runtime.
pub trait ScriptInjector: Send + Sync {
    fn inject(&self, target: InjectionTarget) -> anyhow::Result<ContentPort>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSummary {
    pub info: TabInfo,
    pub indicator: Indicator,
    pub script: Option<ScriptKind>,
}

#[derive(Clone)]
pub struct Host {
    tabs: Arc<RwLock<TabDb>>,
    store: SnapshotStore,
    to_coordinator: mpsc::UnboundedSender<HostEvent>,
    injector: Arc<dyn ScriptInjector>,
}

impl Host {
    pub fn new(store: SnapshotStore, injector: Arc<dyn ScriptInjector>) -> (Host, mpsc::UnboundedReceiver<HostEvent>) {
        let (to_coordinator, events) = mpsc::unbounded_channel();
        let host = Host {
            tabs: Arc::new(RwLock::new(TabDb::new())),
            store,
            to_coordinator,
            injector,
        };
        (host, events)
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    fn emit(&self, event: HostEvent) {
        if self.to_coordinator.send(event).is_err() {
            tracing::warn!("coordinator is gone, host event dropped");
        }
    }

    pub async fn open_tab(&self, url: &str, page: Option<Arc<dyn GamePage>>) -> TabId {
        let tab_id = self.tabs.write().await.new_tab(url.to_owned(), page);
        tracing::info!(tab = tab_id, url, "tab opened");
        self.emit(HostEvent::TabUpdated {
            tab: TabInfo { id: tab_id, url: url.to_owned() },
            new_document: true,
        });
        tab_id
    }

    pub async fn navigate(&self, tab_id: TabId, url: &str, page: Option<Arc<dyn GamePage>>, navigation: Navigation) -> anyhow::Result<()> {
        {
            let mut tabs = self.tabs.write().await;
            let tab = tabs.get_mut(tab_id).ok_or_else(|| anyhow!("no tab {tab_id}"))?;
            tab.url = url.to_owned();
            if navigation == Navigation::NewDocument {
                tab.content = None;
                tab.page = page;
                tab.indicator = Indicator::Default;
            }
        }
        tracing::info!(tab = tab_id, url, ?navigation, "tab navigated");
        self.emit(HostEvent::TabUpdated {
            tab: TabInfo { id: tab_id, url: url.to_owned() },
            new_document: navigation == Navigation::NewDocument,
        });
        Ok(())
    }

    pub async fn close_tab(&self, tab_id: TabId) -> anyhow::Result<()> {
        self.tabs.write().await.remove(tab_id).ok_or_else(|| anyhow!("no tab {tab_id}"))?;
        tracing::info!(tab = tab_id, "tab closed");
        self.emit(HostEvent::TabRemoved(tab_id));
        Ok(())
    }

    pub async fn click_action(&self, tab_id: TabId) -> anyhow::Result<()> {
        let info = self.tab_info(tab_id).await.ok_or_else(|| anyhow!("no tab {tab_id}"))?;
        self.emit(HostEvent::ActionClicked(info));
        Ok(())
    }

    pub async fn press_shortcut(&self, tab_id: TabId, command: &str) -> anyhow::Result<()> {
        let tab = self.tab_info(tab_id).await.ok_or_else(|| anyhow!("no tab {tab_id}"))?;
        self.emit(HostEvent::Command { tab, command: command.to_owned() });
        Ok(())
    }

    pub async fn tab_info(&self, tab_id: TabId) -> Option<TabInfo> {
        self.tabs.read().await.get(tab_id).map(|tab| tab.info())
    }

    pub async fn list(&self) -> Vec<TabSummary> {
        self.tabs
            .read()
            .await
            .all_tabs()
            .map(|tab| TabSummary {
                info: tab.info(),
                indicator: tab.indicator,
                script: tab.content.as_ref().map(|content| content.kind),
            })
            .collect()
    }

    pub async fn script_kind(&self, tab_id: TabId) -> Option<ScriptKind> {
        self.tabs.read().await.get(tab_id)?.content.as_ref().map(|content| content.kind)
    }

    /// Injects `script` into the tab, replacing whatever script was there.
    pub async fn inject(&self, tab_id: TabId, script: ScriptKind) -> anyhow::Result<()> {
        let mut tabs = self.tabs.write().await;
        let tab = tabs.get_mut(tab_id).ok_or_else(|| anyhow!("no tab {tab_id}"))?;
        if script == ScriptKind::Source && tab.page.is_none() {
            return Err(anyhow!("tab {tab_id} has no game page to inject into"));
        }

        tab.content = None;
        let (kill, shutdown) = oneshot::channel();
        let target = InjectionTarget {
            tab: tab_id,
            script,
            page: tab.page.clone(),
            store: self.store.clone(),
            runtime: self.runtime_port(tab_id),
            shutdown,
        };
        let port = self.injector.inject(target)?;
        tab.content = Some(ContentScript { kind: script, port, kill });
        tracing::info!(tab = tab_id, ?script, "script injected");
        Ok(())
    }

    pub async fn set_indicator(&self, tab_id: TabId, indicator: Indicator) {
        if let Some(tab) = self.tabs.write().await.get_mut(tab_id) {
            tab.indicator = indicator;
        }
    }

    pub async fn indicator(&self, tab_id: TabId) -> Option<Indicator> {
        self.tabs.read().await.get(tab_id).map(|tab| tab.indicator)
    }

    async fn content_port(&self, tab_id: TabId) -> Result<ContentPort, SyncError> {
        let tabs = self.tabs.read().await;
        let Some(tab) = tabs.get(tab_id) else {
            return Err(SyncError::unreachable(format!("No tab with id: {tab_id}.")));
        };
        match &tab.content {
            Some(content) => Ok(content.port.clone()),
            None => Err(SyncError::unreachable("Could not establish connection. Receiving end does not exist.")),
        }
    }

    pub async fn send_message(&self, tab_id: TabId, request: &Request) -> Result<Response, SyncError> {
        let port = self.content_port(tab_id).await?;
        port::send_message(&port, request).await
    }

    pub async fn send_frame(&self, tab_id: TabId, frame: Vec<u8>) -> Result<Vec<u8>, SyncError> {
        let port = self.content_port(tab_id).await?;
        port::send_frame(&port, frame).await
    }

    pub async fn post_message(&self, tab_id: TabId, request: &Request) -> Result<(), SyncError> {
        let port = self.content_port(tab_id).await?;
        port::post_message(&port, request).await
    }

    pub fn runtime_port(&self, tab_id: TabId) -> RuntimePort {
        RuntimePort::new(tab_id, self.to_coordinator.clone())
    }
}
