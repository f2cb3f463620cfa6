//! Arbitrates between the source tab and the overlays: tracks which tab is
//! the source, relays page requests to it and keeps the store in step with
//! the tab lifecycle.

pub mod config;
pub mod coordinator;
pub mod pending;
pub mod registry;
pub mod source_url;

pub use config::CoordinatorConfig;
pub use coordinator::spawn_coordinator_process;
pub use registry::{Registry, SourceBinding};
pub use source_url::{match_source_url, SourceUrl};
