use serde::{Deserialize, Serialize};

/// Interaction state machine states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
    #[default]
    Idle,
    RequestingPermission,
    Recording,
    Transcribing,
    Generating,
    Speaking,
    Error,
}

impl InteractionState {
    /// A session is active in every state except `Idle` and `Error`
    pub fn is_active(&self) -> bool {
        !matches!(self, InteractionState::Idle | InteractionState::Error)
    }

    /// States in which the session still owns a capture resource
    pub fn holds_audio(&self) -> bool {
        matches!(
            self,
            InteractionState::Recording | InteractionState::Transcribing
        )
    }
}

impl std::fmt::Display for InteractionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InteractionState::Idle => "Idle",
            InteractionState::RequestingPermission => "RequestingPermission",
            InteractionState::Recording => "Recording",
            InteractionState::Transcribing => "Transcribing",
            InteractionState::Generating => "Generating",
            InteractionState::Speaking => "Speaking",
            InteractionState::Error => "Error",
        };
        f.write_str(name)
    }
}

/// What the begin/end toggle currently does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleAction {
    Begin,
    End,
}

/// Which user actions are currently enabled
///
/// The orchestrator accepts exactly the actions enabled here; the
/// presentation layer renders its controls from the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub toggle: ToggleAction,
    pub toggle_enabled: bool,
    pub replay_enabled: bool,
}

impl Controls {
    pub fn for_state(state: InteractionState, has_answer: bool) -> Self {
        use InteractionState::*;

        let toggle = match state {
            Idle | Error => ToggleAction::Begin,
            _ => ToggleAction::End,
        };
        let toggle_enabled = matches!(state, Idle | Error | RequestingPermission | Recording);

        Self {
            toggle,
            toggle_enabled,
            replay_enabled: state == Idle && has_answer,
        }
    }

    pub fn can_begin(&self) -> bool {
        self.toggle_enabled && self.toggle == ToggleAction::Begin
    }

    pub fn can_end(&self) -> bool {
        self.toggle_enabled && self.toggle == ToggleAction::End
    }
}
