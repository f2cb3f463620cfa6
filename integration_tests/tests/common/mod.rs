#![allow(dead_code)]

use std::{future::Future, path::PathBuf, sync::Arc, time::Duration};

use host::{storage::StoreState, GamePage};
use msgs::{Indicator, TabId};
use overlay::{Key, OverlayView, UiEvent};
use page_emulator::{SimulatedTimerPage, TimerGame};
use spectator::{OverlayAccess, Session, SpectatorConfig};
use tokio::sync::watch;

pub const GAME_URL: &str = "http://localhost:3000/game/demo-game";
pub const OTHER_GAME_URL: &str = "http://localhost:3000/game/other-game";
pub const WATCH_URL: &str = "https://example.org/stream";

const PATIENCE: Duration = Duration::from_secs(3);

pub fn test_config() -> SpectatorConfig {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("test_spectator_config.json");
    SpectatorConfig::from_file(&config_path).expect("test configuration")
}

/// A running session with a simulated game tab and a plain tab to watch it from.
pub struct Harness {
    pub session: Session,
    pub page: Arc<SimulatedTimerPage>,
    pub game_tab: TabId,
    pub watch_tab: TabId,
}

impl Harness {
    pub async fn start() -> Harness {
        Harness::with_page(SimulatedTimerPage::new(TimerGame::sample())).await
    }

    pub async fn with_page(page: SimulatedTimerPage) -> Harness {
        let session = Session::start(test_config());
        let page = Arc::new(page);
        let game_tab = session.host.open_tab(GAME_URL, Some(page.clone() as Arc<dyn GamePage>)).await;
        let watch_tab = session.host.open_tab(WATCH_URL, None).await;
        Harness { session, page, game_tab, watch_tab }
    }

    /// Clicks the action in the game tab and waits for the binding to show up in the store.
    pub async fn bind_source(&self) {
        self.session.host.click_action(self.game_tab).await.unwrap();
        let game_tab = self.game_tab;
        self.wait_for_store(|state| state.area.timer_tab == Some(game_tab) && state.area.game_state.is_some()).await;
    }

    /// Clicks the action in the watch tab and waits for its overlay to come up.
    pub async fn activate_overlay(&self) -> OverlayAccess {
        self.session.host.click_action(self.watch_tab).await.unwrap();
        let (session, tab) = (&self.session, self.watch_tab);
        let mut overlay = eventually(move || async move { session.overlay(tab) }).await;
        wait_for_view(&mut overlay.view, |view| view.active).await;
        overlay
    }

    pub async fn wait_for_store(&self, check: impl Fn(&StoreState) -> bool) -> StoreState {
        let mut store = self.session.store().subscribe();
        tokio::time::timeout(PATIENCE, async {
            loop {
                {
                    let state = store.borrow_and_update();
                    if check(&state) {
                        return state.clone();
                    }
                }
                store.changed().await.unwrap();
            }
        })
        .await
        .expect("store never matched")
    }

    pub async fn wait_for_indicator(&self, tab: TabId, indicator: Indicator) {
        let host = &self.session.host;
        eventually(move || async move { (host.indicator(tab).await == Some(indicator)).then_some(()) }).await
    }
}

/// Polls `probe` until it yields a value.
pub async fn eventually<T, F, Fut>(probe: F) -> T
where
    F: Fn() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    tokio::time::timeout(PATIENCE, async {
        loop {
            if let Some(value) = probe().await {
                return value;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition never held")
}

pub async fn wait_for_view(view: &mut watch::Receiver<OverlayView>, check: impl Fn(&OverlayView) -> bool) -> OverlayView {
    tokio::time::timeout(PATIENCE, async {
        loop {
            {
                let current = view.borrow_and_update();
                if check(&current) {
                    return current.clone();
                }
            }
            view.changed().await.unwrap();
        }
    })
    .await
    .expect("view never matched")
}

pub async fn send(overlay: &OverlayAccess, event: UiEvent) {
    overlay.ui.send(event).await.unwrap();
}

pub async fn type_text(overlay: &OverlayAccess, text: &str) {
    for c in text.chars() {
        send(overlay, UiEvent::Key(Key::Char(c))).await;
    }
}
