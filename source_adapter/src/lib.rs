//! Content script for the source tab: watches the game page, publishes
//! snapshots of it and serves actions and formula checks against it.

pub mod actions;
pub mod adapter;
pub mod back_channel;
pub mod config;
pub mod extract;
pub mod observe;

pub use adapter::spawn_source_adapter_process;
pub use config::SourceConfig;
pub use extract::extract_snapshot;
