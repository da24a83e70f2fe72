use super::state::InteractionState;
use crate::error::InteractionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Opaque session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Counts live [`AudioHandle`]s
#[derive(Debug, Clone, Default)]
pub struct ResourceCounter(Arc<AtomicUsize>);

impl ResourceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Exclusive ownership of the microphone recording for one session
///
/// Dropping the handle deletes the attached recording file, so every exit
/// path (success, failure, cancellation, teardown) releases it.
#[derive(Debug)]
pub struct AudioHandle {
    counter: ResourceCounter,
    recording: Option<PathBuf>,
}

impl AudioHandle {
    pub fn acquire(counter: &ResourceCounter) -> Self {
        counter.0.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: counter.clone(),
            recording: None,
        }
    }

    /// Take responsibility for deleting a finished recording
    pub fn attach(&mut self, path: PathBuf) {
        self.recording = Some(path);
    }

}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        if let Some(path) = self.recording.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Deleted recording {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to delete recording {}: {}", path.display(), e),
            }
        }
        self.counter.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One capture → transcribe → generate → speak attempt
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub state: InteractionState,
    pub transcript: Option<String>,
    pub answer: Option<String>,
    pub last_error: Option<InteractionError>,
    pub started_at: DateTime<Utc>,
    /// Present only while recording
    pub(crate) audio: Option<AudioHandle>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            state: InteractionState::RequestingPermission,
            transcript: None,
            answer: None,
            last_error: None,
            started_at: Utc::now(),
            audio: None,
        }
    }

    /// Set the transcript once; later writes are ignored
    pub fn set_transcript(&mut self, text: String) {
        if self.transcript.is_none() {
            self.transcript = Some(text);
        } else {
            warn!("Session {}: transcript already set, ignoring", self.id);
        }
    }

    /// Set the answer once; later writes are ignored
    pub fn set_answer(&mut self, text: String) {
        if self.answer.is_none() {
            self.answer = Some(text);
        } else {
            warn!("Session {}: answer already set, ignoring", self.id);
        }
    }

    pub fn fail(&mut self, error: InteractionError) {
        self.audio = None;
        self.last_error = Some(error);
        self.state = InteractionState::Error;
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// The capture resource may only be held in Recording or Transcribing
    pub fn audio_matches_state(&self) -> bool {
        !self.has_audio() || self.state.holds_audio()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_audio_handle_counts() {
        let counter = ResourceCounter::new();
        let a = AudioHandle::acquire(&counter);
        let b = AudioHandle::acquire(&counter);
        assert_eq!(counter.live(), 2);
        drop(a);
        assert_eq!(counter.live(), 1);
        drop(b);
        assert_eq!(counter.live(), 0);
    }

    #[test]
    fn test_audio_handle_deletes_recording() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("take.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let counter = ResourceCounter::new();
        let mut handle = AudioHandle::acquire(&counter);
        handle.attach(path.clone());
        drop(handle);

        assert!(!path.exists());
        assert_eq!(counter.live(), 0);
    }

    #[test]
    fn test_audio_handle_tolerates_missing_file() {
        let counter = ResourceCounter::new();
        let mut handle = AudioHandle::acquire(&counter);
        handle.attach(PathBuf::from("/nonexistent/voice-ask/take.wav"));
        drop(handle);
        assert_eq!(counter.live(), 0);
    }

    #[test]
    fn test_audio_only_held_while_capturing() {
        let counter = ResourceCounter::new();
        let mut session = Session::new();
        assert!(session.audio_matches_state());

        session.audio = Some(AudioHandle::acquire(&counter));
        session.state = InteractionState::Recording;
        assert!(session.audio_matches_state());

        session.state = InteractionState::Speaking;
        assert!(!session.audio_matches_state());

        session.audio = None;
        assert!(session.audio_matches_state());
    }

    #[test]
    fn test_transcript_is_set_once() {
        let mut session = Session::new();
        session.set_transcript("first".to_string());
        session.set_transcript("second".to_string());
        assert_eq!(session.transcript.as_deref(), Some("first"));
    }

    #[test]
    fn test_fail_releases_audio() {
        let counter = ResourceCounter::new();
        let mut session = Session::new();
        session.audio = Some(AudioHandle::acquire(&counter));

        session.fail(InteractionError::new(ErrorKind::CaptureFailed, "device busy"));

        assert_eq!(session.state, InteractionState::Error);
        assert!(!session.has_audio());
        assert_eq!(counter.live(), 0);
    }
}
