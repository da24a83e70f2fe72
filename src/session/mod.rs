//! Interaction session model
//!
//! This module provides the data the orchestrator owns for one interaction:
//! - `Session`: id, transcript, answer, last error, state
//! - `AudioHandle`: exclusive, self-releasing ownership of a recording
//! - `InteractionState` / `Controls`: state machine positions and action gating
//! - `Snapshot`: serialisable view for the presentation layer

mod config;
mod session;
mod snapshot;
mod state;

pub use config::SessionConfig;
pub use session::{AudioHandle, ResourceCounter, Session, SessionId};
pub use snapshot::Snapshot;
pub use state::{Controls, InteractionState, ToggleAction};
