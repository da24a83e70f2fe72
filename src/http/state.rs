use crate::orchestrator::OrchestratorHandle;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single interaction orchestrator this process drives
    pub orchestrator: OrchestratorHandle,
}

impl AppState {
    pub fn new(orchestrator: OrchestratorHandle) -> Self {
        Self { orchestrator }
    }
}
