use super::session::{Session, SessionId};
use super::state::{Controls, InteractionState};
use crate::error::InteractionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only view of the current interaction, published after every transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current session, if any
    pub session_id: Option<SessionId>,

    /// State machine position
    pub state: InteractionState,

    /// Recognised question
    pub transcript: Option<String>,

    /// Generated answer
    pub answer: Option<String>,

    /// Failure shown to the user
    pub last_error: Option<InteractionError>,

    /// Which actions are currently enabled
    pub controls: Controls,

    /// When the session began
    pub started_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Nothing has happened yet
    pub fn idle() -> Self {
        Self {
            session_id: None,
            state: InteractionState::Idle,
            transcript: None,
            answer: None,
            last_error: None,
            controls: Controls::for_state(InteractionState::Idle, false),
            started_at: None,
        }
    }

    pub fn of(session: &Session) -> Self {
        Self {
            session_id: Some(session.id),
            state: session.state,
            transcript: session.transcript.clone(),
            answer: session.answer.clone(),
            last_error: session.last_error.clone(),
            controls: Controls::for_state(session.state, session.answer.is_some()),
            started_at: Some(session.started_at),
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::idle()
    }
}
