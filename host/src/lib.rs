//! The runtime environment every context lives in: tabs and their documents,
//! content-script injection, message ports and the shared snapshot store.

pub mod events;
pub mod host;
pub mod page;
pub mod port;
pub mod storage;
pub mod tab_db;

pub use events::HostEvent;
pub use host::{Host, InjectionTarget, Navigation, ScriptInjector, ScriptKind, TabInfo, TabSummary};
pub use page::GamePage;
pub use port::{ContentPort, Delivery, Responder, RuntimePort};
pub use storage::{SnapshotStore, StorageArea, StorageUpdate};
