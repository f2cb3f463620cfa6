//! Content script for spectated tabs: renders the published game state on
//! top of any page and routes the viewer's input back to the source.

pub mod actions_tray;
pub mod bank;
pub mod bank_log;
pub mod config;
pub mod formula;
pub mod player_times;
pub mod renderer;
pub mod view;

pub use config::OverlayConfig;
pub use formula::Key;
pub use renderer::{spawn_overlay_process, OverlayHandle, UiEvent};
pub use view::{Notice, OverlayView};
