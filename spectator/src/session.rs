use std::sync::Arc;

use coordinator::spawn_coordinator_process;
use host::{Host, SnapshotStore};
use msgs::TabId;
use tokio::task::JoinHandle;

use crate::{
    config::SpectatorConfig,
    scripts::{ContentScripts, OverlayAccess},
};

/// One running extension: host, store, coordinator and content scripts.
pub struct Session {
    pub host: Host,
    scripts: Arc<ContentScripts>,
    coordinator: JoinHandle<()>,
}

impl Session {
    /// Must be called from within a tokio runtime.
    pub fn start(config: SpectatorConfig) -> Session {
        let store = SnapshotStore::new();
        let scripts = Arc::new(ContentScripts::new(config.source, config.overlay));
        let (host, events) = Host::new(store, scripts.clone());
        let coordinator = spawn_coordinator_process(host.clone(), events, config.coordinator);
        Session { host, scripts, coordinator }
    }

    pub fn store(&self) -> &SnapshotStore {
        self.host.store()
    }

    pub fn overlay(&self, tab: TabId) -> Option<OverlayAccess> {
        self.scripts.overlay(tab)
    }

    pub fn shutdown(self) {
        self.coordinator.abort();
    }
}
