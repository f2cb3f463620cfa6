//! Wires the coordinator, the content scripts and the host into one session.

pub mod config;
pub mod scripts;
pub mod session;

pub use config::{ConfigError, SpectatorConfig};
pub use scripts::{ContentScripts, OverlayAccess};
pub use session::Session;
