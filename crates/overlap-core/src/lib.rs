//! Core domain layer for Overlap.
//!
//! This crate contains the session domain model, the session state machine,
//! the snapshot types received from the remote record store, and the pure
//! logic that merges remote state into local state. It also defines the two
//! collaborator boundaries the rest of the system is built against:
//! [`remote::RemoteSessionStore`] and [`repository::SessionRepository`].
//!
//! No I/O happens in this crate outside of those trait boundaries.

pub mod error;
pub mod invite;
pub mod remote;
pub mod repository;
pub mod session;

// Re-export common error type
pub use error::{OverlapError, Result};
