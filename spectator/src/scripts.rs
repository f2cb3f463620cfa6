use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::anyhow;
use host::{ContentPort, InjectionTarget, ScriptInjector, ScriptKind};
use msgs::TabId;
use overlay::{spawn_overlay_process, OverlayConfig, OverlayView, UiEvent};
use source_adapter::{spawn_source_adapter_process, SourceConfig};
use tokio::sync::{mpsc, watch};

/// The viewer's side of an overlay: what it shows and where input goes.
#[derive(Clone)]
pub struct OverlayAccess {
    pub view: watch::Receiver<OverlayView>,
    pub ui: mpsc::Sender<UiEvent>,
}

/// Live overlays by tab. Each injection gets its own number so a torn down
/// overlay never evicts the one that replaced it.
#[derive(Default)]
struct OverlayDb {
    injections: u64,
    by_tab: HashMap<TabId, (u64, OverlayAccess)>,
}

impl OverlayDb {
    fn insert(&mut self, tab: TabId, access: OverlayAccess) -> u64 {
        self.injections += 1;
        self.by_tab.insert(tab, (self.injections, access));
        self.injections
    }

    fn forget(&mut self, tab: TabId, injection: u64) -> bool {
        match self.by_tab.get(&tab) {
            Some((current, _)) if *current == injection => self.by_tab.remove(&tab).is_some(),
            _ => false,
        }
    }
}

fn lock(overlays: &Mutex<OverlayDb>) -> MutexGuard<'_, OverlayDb> {
    overlays.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Starts the real content scripts.
pub struct ContentScripts {
    source: SourceConfig,
    overlay: OverlayConfig,
    overlays: Arc<Mutex<OverlayDb>>,
}

impl ContentScripts {
    pub fn new(source: SourceConfig, overlay: OverlayConfig) -> ContentScripts {
        ContentScripts { source, overlay, overlays: Arc::new(Mutex::new(OverlayDb::default())) }
    }

    /// The live overlay of `tab`, if it has one.
    pub fn overlay(&self, tab: TabId) -> Option<OverlayAccess> {
        lock(&self.overlays).by_tab.get(&tab).map(|(_, access)| access.clone())
    }

    /// Drops the entry once the overlay process has exited.
    fn forget_on_exit(&self, tab: TabId, injection: u64, mut view: watch::Receiver<OverlayView>) {
        let overlays = self.overlays.clone();
        tokio::spawn(async move {
            while view.changed().await.is_ok() {}
            if lock(&overlays).forget(tab, injection) {
                tracing::debug!(tab, "overlay gone");
            }
        });
    }
}

impl ScriptInjector for ContentScripts {
    fn inject(&self, target: InjectionTarget) -> anyhow::Result<ContentPort> {
        match target.script {
            ScriptKind::Source => {
                let page = target.page.ok_or_else(|| anyhow!("tab {} has no game page", target.tab))?;
                Ok(spawn_source_adapter_process(page, target.store, self.source.clone(), target.shutdown))
            }
            ScriptKind::Overlay => {
                let handle = spawn_overlay_process(target.store, target.runtime, self.overlay.clone(), target.shutdown);
                let exit = handle.view.clone();
                let injection = lock(&self.overlays).insert(target.tab, OverlayAccess { view: handle.view, ui: handle.ui });
                self.forget_on_exit(target.tab, injection, exit);
                Ok(handle.port)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access() -> (OverlayAccess, watch::Sender<OverlayView>) {
        let (view_tx, view) = watch::channel(OverlayView::default());
        let (ui, _) = mpsc::channel(1);
        (OverlayAccess { view, ui }, view_tx)
    }

    #[test]
    fn old_injections_do_not_evict_newer_ones() {
        let mut db = OverlayDb::default();
        let first = db.insert(4, access().0);
        let second = db.insert(4, access().0);

        assert!(!db.forget(4, first));
        assert!(db.by_tab.contains_key(&4));
        assert!(db.forget(4, second));
        assert!(db.by_tab.is_empty());
    }

    #[tokio::test]
    async fn exited_overlays_are_forgotten() {
        let scripts = ContentScripts::new(SourceConfig::default(), OverlayConfig::default());
        let (overlay, view_tx) = access();
        let injection = lock(&scripts.overlays).insert(7, overlay.clone());
        scripts.forget_on_exit(7, injection, overlay.view);
        assert!(scripts.overlay(7).is_some());

        drop(view_tx);
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while scripts.overlay(7).is_some() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("overlay entry never dropped");
    }
}
