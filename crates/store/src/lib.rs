//! On-disk retention of historical file versions, the durable shape of a
//! pending sync queue entry, and the command set accepted over the
//! daemon's local IPC surface.

mod error;
mod types;
mod version_store;

pub use error::StoreError;
pub use types::{IpcCommand, SyncDirection, SyncQueueEntry, VersionRecord};
pub use version_store::{VersionStore, DEFAULT_RETENTION};
