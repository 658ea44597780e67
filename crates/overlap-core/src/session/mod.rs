//! Session domain module.
//!
//! This module contains the session domain model, the state machine that
//! drives a questionnaire run, and the pure synchronization logic that
//! merges remote snapshots into local state.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`, `Answer`)
//! - `state`: Session state machine (`SessionState` and transitions)
//! - `hosted`: Remote-origin session snapshot (`HostedSession`)
//! - `identity`: Display-name to participant-ID resolution
//! - `apply`: Snapshot applier merging remote state into a local session
//! - `event`: Typed session events published over broadcast channels

mod apply;
mod event;
mod hosted;
mod identity;
mod model;
mod state;

// Re-export public API
pub use apply::{SnapshotOutcome, apply_snapshot};
pub use event::{SessionEvent, session_event_channel};
pub use hosted::{HostedParticipant, HostedSession};
pub use identity::resolve_participant_id;
pub use model::{Answer, OnlineDetails, Session};
pub use state::SessionState;
