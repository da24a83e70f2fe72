use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::debug;

use super::controller::Command;
use super::events::{ActionOutcome, InteractionEvent, RejectReason};
use crate::session::{ResourceCounter, Snapshot};

/// Cloneable handle for driving the orchestrator
///
/// Dropping the last handle tears the orchestrator down: any recording is
/// discarded and speech is cancelled.
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<Snapshot>,
    events: broadcast::Sender<InteractionEvent>,
    resources: ResourceCounter,
}

impl OrchestratorHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        snapshot: watch::Receiver<Snapshot>,
        events: broadcast::Sender<InteractionEvent>,
        resources: ResourceCounter,
    ) -> Self {
        Self {
            commands,
            snapshot,
            events,
            resources,
        }
    }

    /// Start a new interaction (toggle in `Idle`/`Error`)
    pub async fn begin(&self) -> ActionOutcome {
        self.request(Command::Begin).await
    }

    /// Stop recording, or cancel a pending permission request
    pub async fn end(&self) -> ActionOutcome {
        self.request(Command::End).await
    }

    /// Speak the last answer again without re-running upstream stages
    pub async fn replay(&self) -> ActionOutcome {
        self.request(Command::Replay).await
    }

    /// Tear down: discard any recording, cancel speech, stop the orchestrator
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(ack_tx)).await.is_err() {
            debug!("Orchestrator already stopped");
            return;
        }
        let _ = ack_rx.await;
    }

    /// Latest published state
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Wait until the published snapshot satisfies `predicate`
    ///
    /// Returns the last known snapshot if the orchestrator stops first.
    pub async fn wait_for(&self, predicate: impl FnMut(&Snapshot) -> bool) -> Snapshot {
        let mut rx = self.snapshot.clone();
        let result = rx.wait_for(predicate).await.map(|s| s.clone());
        match result {
            Ok(snapshot) => snapshot,
            Err(_) => rx.borrow().clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InteractionEvent> {
        self.events.subscribe()
    }

    /// Number of capture resources currently held
    pub fn live_audio_handles(&self) -> usize {
        self.resources.live()
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<ActionOutcome>) -> Command,
    ) -> ActionOutcome {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(command(reply_tx)).await.is_err() {
            return ActionOutcome::Rejected(RejectReason::ShuttingDown);
        }
        reply_rx
            .await
            .unwrap_or(ActionOutcome::Rejected(RejectReason::ShuttingDown))
    }
}
