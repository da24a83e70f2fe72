use serde::{Deserialize, Serialize};

use crate::error::InteractionError;
use crate::session::{InteractionState, SessionId};

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionEvent {
    StateChanged {
        session_id: Option<SessionId>,
        state: InteractionState,
    },
    Transcript {
        session_id: SessionId,
        text: String,
    },
    Answer {
        session_id: SessionId,
        text: String,
    },
    Failed {
        session_id: SessionId,
        error: InteractionError,
    },
}

/// Result of a user action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ActionOutcome {
    Accepted,
    Rejected(RejectReason),
}

impl ActionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ActionOutcome::Accepted)
    }
}

/// Why an action was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// `begin` while a session is already running
    SessionActive,
    /// `end` with no running session
    NotActive,
    /// The action is disabled in the current state
    Disabled,
    /// `replay` before any answer exists
    NothingToReplay,
    /// The orchestrator has been torn down
    ShuttingDown,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RejectReason::SessionActive => "an interaction is already in progress",
            RejectReason::NotActive => "no interaction in progress",
            RejectReason::Disabled => "action is disabled in the current state",
            RejectReason::NothingToReplay => "there is no answer to replay",
            RejectReason::ShuttingDown => "orchestrator is shutting down",
        };
        f.write_str(text)
    }
}
