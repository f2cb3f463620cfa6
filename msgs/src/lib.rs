pub mod error;
pub mod message;
pub mod snapshot;
pub mod tab;
pub mod wire;

pub use error::SyncError;
pub use message::{Request, RequestKind, Response};
pub use snapshot::GameSnapshot;
pub use tab::{Indicator, TabId};
