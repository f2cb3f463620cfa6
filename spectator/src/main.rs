use std::sync::Arc;

use console_cmd::{ConsoleCmd, USAGE};
use console_input::console_input_thread;
use host::{GamePage, Navigation, SnapshotStore};
use msgs::TabId;
use overlay::{Key, UiEvent};
use page_emulator::{SimulatedTimerPage, TimerGame};
use spectator::{Session, SpectatorConfig};
use tracing_subscriber::EnvFilter;

mod console_cmd;
mod console_input;

const GAME_URL: &str = "http://localhost:3000/game/demo-game";
const WATCH_URL: &str = "https://example.org/stream";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let session = Session::start(SpectatorConfig::load());
    let page = Arc::new(SimulatedTimerPage::new(TimerGame::sample()));
    let game_tab = session.host.open_tab(GAME_URL, Some(page.clone())).await;
    let watch_tab = session.host.open_tab(WATCH_URL, None).await;
    println!("game page in tab {game_tab}, stream in tab {watch_tab}");
    println!("{USAGE}");

    let mut console_receiver = console_input_thread();
    while let Some(console_str) = console_receiver.recv().await {
        match ConsoleCmd::parse(console_str.trim()) {
            Ok(ConsoleCmd::Quit) => break,
            Ok(cmd) => {
                if let Err(err) = run(&session, &page, cmd).await {
                    println!("err: {err}");
                }
            }
            Err(err) => println!("err: {err}"),
        }
    }

    session.shutdown();
    Ok(())
}

async fn send_ui(session: &Session, tab: TabId, event: UiEvent) -> anyhow::Result<()> {
    let overlay = session.overlay(tab).ok_or_else(|| anyhow::anyhow!("no overlay in tab {tab}"))?;
    overlay.ui.send(event).await?;
    Ok(())
}

fn print_store(store: &SnapshotStore) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&store.get())?);
    Ok(())
}

async fn run(session: &Session, page: &Arc<SimulatedTimerPage>, cmd: ConsoleCmd) -> anyhow::Result<()> {
    match cmd {
        ConsoleCmd::Tabs => {
            for tab in session.host.list().await {
                println!("{} {} {:?} {:?}", tab.info.id, tab.info.url, tab.indicator, tab.script);
            }
        }
        ConsoleCmd::Click(tab) => session.host.click_action(tab).await?,
        ConsoleCmd::Close(tab) => session.host.close_tab(tab).await?,
        ConsoleCmd::Goto(tab, url) => {
            let game_page = url.contains("/game/").then(|| page.clone() as Arc<dyn GamePage>);
            session.host.navigate(tab, &url, game_page, Navigation::NewDocument).await?;
        }
        ConsoleCmd::Action(tab, label) => send_ui(session, tab, UiEvent::ClickAction(label)).await?,
        ConsoleCmd::Type(tab, text) => {
            send_ui(session, tab, UiEvent::FocusFormula).await?;
            for c in text.chars() {
                send_ui(session, tab, UiEvent::Key(Key::Char(c))).await?;
            }
        }
        ConsoleCmd::Key(tab, key) => send_ui(session, tab, UiEvent::Key(key)).await?,
        ConsoleCmd::Submit { tab, close } => send_ui(session, tab, UiEvent::Submit { close }).await?,
        ConsoleCmd::Shortcut(tab, command) => session.host.press_shortcut(tab, &command).await?,
        ConsoleCmd::View(tab) => {
            let overlay = session.overlay(tab).ok_or_else(|| anyhow::anyhow!("no overlay in tab {tab}"))?;
            println!("{:#?}", *overlay.view.borrow());
        }
        ConsoleCmd::Store => print_store(session.store())?,
        ConsoleCmd::Turn => page.advance_turn(),
        ConsoleCmd::Quit => {}
    }
    Ok(())
}
