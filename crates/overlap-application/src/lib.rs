//! Application layer for Overlap.
//!
//! Orchestrates the core domain over the collaborator boundaries:
//!
//! - [`observer::SessionObserverRegistry`]: one recurring watch per
//!   observed remote session, reference-counted, publishing strictly newer
//!   snapshots to subscribers and retrying transient failures with backoff.
//! - [`sync_service::SessionSyncService`]: the single entry point used by
//!   the UI layer for answer submission, snapshot merging, hosting and
//!   joining sessions, and manual refresh.
//!
//! Both are constructed once with their collaborators and passed to
//! whatever needs them; nothing is reached through ambient global state.

pub mod config;
pub mod observer;
pub mod sync_service;

pub use config::SyncConfig;
pub use observer::SessionObserverRegistry;
pub use sync_service::SessionSyncService;
