//! Cross-context synchronization.
//!
//! This module provides:
//! - The closed message types exchanged between contexts (`protocol`)
//! - The process-wide `SyncCoordinator` and its `Listener`s (`coordinator`)
//! - The owned async `Session` that serializes vault mutations (`session`)

pub mod coordinator;
pub mod protocol;
pub mod session;

pub use coordinator::{Listener, SyncCoordinator, DEFAULT_CAPACITY};
pub use protocol::{
    AutofillResult, Command, Event, Inbound, Request, Response, Snapshot, StatusReport,
};
pub use session::Session;
