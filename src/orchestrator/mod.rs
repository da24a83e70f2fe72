//! Interaction orchestrator
//!
//! A single task owns the current session and sequences the external calls:
//! permission → capture → transcription → generation → synthesis.
//!
//! - User actions (`begin`, `end`, `replay`) arrive as commands and are
//!   accepted only when the matching control is enabled
//! - Every external call runs as its own task tagged with the session id;
//!   results pass through one gate that drops anything not matching the
//!   current session and stage
//! - State changes are published as a `Snapshot` (watch) and as
//!   `InteractionEvent`s (broadcast)

mod controller;
mod events;
mod handle;

pub use controller::Services;
pub use events::{ActionOutcome, InteractionEvent, RejectReason};
pub use handle::OrchestratorHandle;

use controller::Controller;
use tokio::sync::{broadcast, mpsc, watch};

use crate::session::{ResourceCounter, SessionConfig, Snapshot};

pub struct Orchestrator;

impl Orchestrator {
    /// Spawn the orchestrator task on the current tokio runtime
    pub fn spawn(config: SessionConfig, services: Services) -> OrchestratorHandle {
        let resources = ResourceCounter::new();
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::idle());
        let (commands_tx, commands_rx) = mpsc::channel(16);

        let (controller, results_rx) = Controller::new(
            config,
            services,
            resources.clone(),
            events.clone(),
            snapshot_tx,
        );
        tokio::spawn(controller.run(commands_rx, results_rx));

        OrchestratorHandle::new(commands_tx, snapshot_rx, events, resources)
    }
}
