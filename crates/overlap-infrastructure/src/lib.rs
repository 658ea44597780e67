//! Infrastructure layer for Overlap.
//!
//! Concrete implementations of the core collaborator traits:
//!
//! - [`in_memory_session_store::InMemorySessionStore`]: an authoritative
//!   in-memory `RemoteSessionStore`, used as the test backend and as the
//!   record store for single-process deployments.
//! - [`json_session_repository::JsonSessionRepository`]: a
//!   `SessionRepository` storing each session as a JSON document on disk.

pub mod in_memory_session_store;
pub mod json_session_repository;
pub mod paths;

pub use in_memory_session_store::InMemorySessionStore;
pub use json_session_repository::JsonSessionRepository;
