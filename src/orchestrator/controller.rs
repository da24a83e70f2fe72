use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::{ActionOutcome, InteractionEvent, RejectReason};
use crate::audio::read_recording;
use crate::error::{ErrorKind, InteractionError};
use crate::ports::{
    CaptureService, Generator, PermissionGate, PermissionStatus, Synthesizer, Transcriber,
    NO_SPEECH_DETECTED,
};
use crate::session::{
    AudioHandle, Controls, InteractionState, ResourceCounter, Session, SessionConfig, SessionId,
    Snapshot,
};

/// The external collaborators one orchestrator drives
pub struct Services {
    pub permission: Arc<dyn PermissionGate>,
    pub capture: Box<dyn CaptureService>,
    pub transcriber: Arc<dyn Transcriber>,
    pub generator: Arc<dyn Generator>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

pub(crate) enum Command {
    Begin(oneshot::Sender<ActionOutcome>),
    End(oneshot::Sender<ActionOutcome>),
    Replay(oneshot::Sender<ActionOutcome>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug)]
pub(crate) enum StageOutput {
    Permission(PermissionStatus),
    Transcription(Result<String, InteractionError>),
    Generation(Result<String, InteractionError>),
    Synthesis(Result<(), InteractionError>),
}

impl StageOutput {
    /// The state the session must still be in for this output to apply
    fn stage(&self) -> InteractionState {
        match self {
            StageOutput::Permission(_) => InteractionState::RequestingPermission,
            StageOutput::Transcription(_) => InteractionState::Transcribing,
            StageOutput::Generation(_) => InteractionState::Generating,
            StageOutput::Synthesis(_) => InteractionState::Speaking,
        }
    }
}

/// A finished external call, tagged with the session that issued it
#[derive(Debug)]
pub(crate) struct StageDone {
    pub session: SessionId,
    pub output: StageOutput,
}

struct InFlight {
    session: SessionId,
    stage: InteractionState,
    task: JoinHandle<()>,
}

/// Owns the session and is its only mutator
///
/// Runs as a single task: commands and stage completions are handled one at
/// a time, so no locking is needed around the session.
pub(crate) struct Controller {
    config: SessionConfig,
    services: Services,
    session: Option<Session>,
    in_flight: Option<InFlight>,
    resources: ResourceCounter,
    results_tx: mpsc::UnboundedSender<StageDone>,
    events: broadcast::Sender<InteractionEvent>,
    snapshot: watch::Sender<Snapshot>,
}

impl Controller {
    pub(crate) fn new(
        config: SessionConfig,
        services: Services,
        resources: ResourceCounter,
        events: broadcast::Sender<InteractionEvent>,
        snapshot: watch::Sender<Snapshot>,
    ) -> (Self, mpsc::UnboundedReceiver<StageDone>) {
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let controller = Self {
            config,
            services,
            session: None,
            in_flight: None,
            resources,
            results_tx,
            events,
            snapshot,
        };

        (controller, results_rx)
    }

    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut results: mpsc::UnboundedReceiver<StageDone>,
    ) {
        info!("Orchestrator started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Begin(reply)) => {
                        let outcome = self.begin().await;
                        let _ = reply.send(outcome);
                    }
                    Some(Command::End(reply)) => {
                        let outcome = self.end().await;
                        let _ = reply.send(outcome);
                    }
                    Some(Command::Replay(reply)) => {
                        let outcome = self.replay();
                        let _ = reply.send(outcome);
                    }
                    Some(Command::Shutdown(ack)) => {
                        self.teardown().await;
                        let _ = ack.send(());
                        break;
                    }
                    // Every handle dropped
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                Some(done) = results.recv() => self.apply(done).await,
            }
        }

        info!("Orchestrator stopped");
    }

    fn state(&self) -> InteractionState {
        self.session
            .as_ref()
            .map_or(InteractionState::Idle, |s| s.state)
    }

    fn controls(&self) -> Controls {
        let has_answer = self.session.as_ref().is_some_and(|s| s.answer.is_some());
        Controls::for_state(self.state(), has_answer)
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    async fn begin(&mut self) -> ActionOutcome {
        if !self.controls().can_begin() {
            info!("Ignoring begin: interaction already {}", self.state());
            return ActionOutcome::Rejected(RejectReason::SessionActive);
        }

        self.services.synthesizer.stop().await;
        self.abort_in_flight();

        let session = Session::new();
        let id = session.id;
        info!("Session {} started", id);
        self.session = Some(session);
        self.publish_state();

        let permission = Arc::clone(&self.services.permission);
        self.spawn_stage(id, InteractionState::RequestingPermission, async move {
            StageOutput::Permission(permission.request().await)
        });

        ActionOutcome::Accepted
    }

    async fn end(&mut self) -> ActionOutcome {
        match self.state() {
            InteractionState::Idle | InteractionState::Error => {
                ActionOutcome::Rejected(RejectReason::NotActive)
            }
            InteractionState::RequestingPermission => {
                if let Some(session) = self.release().await {
                    info!("Session {} cancelled before recording", session.id);
                }
                self.publish_state();
                ActionOutcome::Accepted
            }
            InteractionState::Recording => {
                self.finish_recording().await;
                ActionOutcome::Accepted
            }
            state @ (InteractionState::Transcribing
            | InteractionState::Generating
            | InteractionState::Speaking) => {
                info!("Ignoring end while {}", state);
                ActionOutcome::Rejected(RejectReason::Disabled)
            }
        }
    }

    fn replay(&mut self) -> ActionOutcome {
        if !self.controls().replay_enabled {
            let reason = if self.state() == InteractionState::Idle {
                RejectReason::NothingToReplay
            } else {
                RejectReason::Disabled
            };
            return ActionOutcome::Rejected(reason);
        }

        let Some((id, answer)) = self
            .session
            .as_ref()
            .and_then(|s| s.answer.clone().map(|a| (s.id, a)))
        else {
            return ActionOutcome::Rejected(RejectReason::NothingToReplay);
        };

        info!("Session {}: replaying answer", id);
        self.set_state(InteractionState::Speaking);
        self.spawn_speech(id, answer);

        ActionOutcome::Accepted
    }

    // ------------------------------------------------------------------
    // Stage transitions
    // ------------------------------------------------------------------

    /// Apply a stage result if it still belongs to the current session and stage
    async fn apply(&mut self, done: StageDone) {
        let expected = done.output.stage();

        match &self.session {
            Some(s) if s.id == done.session && s.state == expected => {}
            Some(s) => {
                debug!(
                    "Discarding stale {} result from session {} (current: {} in {})",
                    expected, done.session, s.id, s.state
                );
                return;
            }
            None => {
                debug!(
                    "Discarding {} result from retired session {}",
                    expected, done.session
                );
                return;
            }
        }

        if self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.session == done.session)
        {
            self.in_flight = None;
        }

        match done.output {
            StageOutput::Permission(PermissionStatus::Granted) => self.start_recording().await,
            StageOutput::Permission(PermissionStatus::Denied) => self.fail(InteractionError::new(
                ErrorKind::PermissionDenied,
                "Microphone access was denied",
            )),
            StageOutput::Transcription(Ok(text)) => self.transcribed(text),
            StageOutput::Generation(Ok(answer)) => self.generated(answer),
            StageOutput::Synthesis(Ok(())) => {
                debug!("Session {}: finished speaking", done.session);
                self.set_state(InteractionState::Idle);
            }
            StageOutput::Transcription(Err(e))
            | StageOutput::Generation(Err(e))
            | StageOutput::Synthesis(Err(e)) => self.fail(e),
        }
    }

    async fn start_recording(&mut self) {
        let audio = AudioHandle::acquire(&self.resources);

        match self.services.capture.start(&self.config.capture).await {
            Ok(()) => {
                if let Some(session) = self.session.as_mut() {
                    info!("Session {}: recording", session.id);
                    session.audio = Some(audio);
                    session.state = InteractionState::Recording;
                }
                self.publish_state();
            }
            Err(e) => {
                drop(audio);
                self.fail(InteractionError::from_source(ErrorKind::CaptureFailed, &e));
            }
        }
    }

    async fn finish_recording(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let id = session.id;
        let audio = session.audio.take();
        session.state = InteractionState::Transcribing;
        self.publish_state();

        let Some(mut audio) = audio else {
            self.fail(InteractionError::new(
                ErrorKind::CaptureFailed,
                "No recording in progress",
            ));
            return;
        };

        let recorded = match self.services.capture.stop().await {
            Ok(path) => {
                audio.attach(path.clone());
                read_recording(&path).await
            }
            Err(e) => Err(e),
        };
        drop(audio);

        let bytes = match recorded {
            Ok(bytes) => bytes,
            Err(e) => {
                self.fail(InteractionError::from_source(ErrorKind::CaptureFailed, &e));
                return;
            }
        };

        info!("Session {}: transcribing {} bytes", id, bytes.len());

        let transcriber = Arc::clone(&self.services.transcriber);
        let limit = self.config.transcription_timeout;
        self.spawn_stage(id, InteractionState::Transcribing, async move {
            StageOutput::Transcription(
                bounded(
                    ErrorKind::TranscriptionFailed,
                    limit,
                    transcriber.transcribe(&bytes),
                )
                .await,
            )
        });
    }

    fn transcribed(&mut self, text: String) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let id = session.id;
        let text = if text.trim().is_empty() {
            NO_SPEECH_DETECTED.to_string()
        } else {
            text
        };
        session.set_transcript(text.clone());
        self.emit(InteractionEvent::Transcript {
            session_id: id,
            text: text.clone(),
        });

        if text == NO_SPEECH_DETECTED {
            info!("Session {}: no speech detected", id);
            self.set_state(InteractionState::Idle);
            return;
        }

        info!("Session {}: heard \"{}\"", id, text);
        self.set_state(InteractionState::Generating);

        let generator = Arc::clone(&self.services.generator);
        let limit = self.config.generation_timeout;
        self.spawn_stage(id, InteractionState::Generating, async move {
            StageOutput::Generation(
                bounded(ErrorKind::GenerationFailed, limit, generator.generate(&text)).await,
            )
        });
    }

    fn generated(&mut self, answer: String) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let id = session.id;
        session.set_answer(answer.clone());
        self.emit(InteractionEvent::Answer {
            session_id: id,
            text: answer.clone(),
        });

        info!("Session {}: speaking answer", id);
        self.set_state(InteractionState::Speaking);
        self.spawn_speech(id, answer);
    }

    fn spawn_speech(&mut self, id: SessionId, text: String) {
        let synthesizer = Arc::clone(&self.services.synthesizer);
        let params = self.config.speech.clone();
        self.spawn_stage(id, InteractionState::Speaking, async move {
            let result = synthesizer
                .speak(&text, &params)
                .await
                .map_err(|e| InteractionError::from_source(ErrorKind::SynthesisFailed, &e));
            StageOutput::Synthesis(result)
        });
    }

    fn fail(&mut self, error: InteractionError) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        warn!("Session {} failed: {}", session.id, error);
        let id = session.id;
        session.fail(error.clone());
        self.emit(InteractionEvent::Failed {
            session_id: id,
            error,
        });
        self.publish_state();
    }

    // ------------------------------------------------------------------
    // In-flight calls and teardown
    // ------------------------------------------------------------------

    fn spawn_stage<F>(&mut self, session: SessionId, stage: InteractionState, work: F)
    where
        F: Future<Output = StageOutput> + Send + 'static,
    {
        if let Some(previous) = self.in_flight.take() {
            if !previous.task.is_finished() {
                warn!(
                    "Aborting {} call still in flight for session {}",
                    previous.stage, previous.session
                );
                previous.task.abort();
            }
        }

        let results = self.results_tx.clone();
        let task = tokio::spawn(async move {
            let output = work.await;
            let _ = results.send(StageDone { session, output });
        });

        self.in_flight = Some(InFlight {
            session,
            stage,
            task,
        });
    }

    fn abort_in_flight(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            debug!(
                "Cancelling {} call for session {}",
                flight.stage, flight.session
            );
            flight.task.abort();
        }
    }

    /// Cancel everything the session holds and hand it back, detached
    async fn release(&mut self) -> Option<Session> {
        self.abort_in_flight();

        let mut session = self.session.take()?;
        if session.audio.is_some() {
            self.services.capture.cancel().await;
        }
        if session.state == InteractionState::Speaking {
            self.services.synthesizer.stop().await;
        }
        session.audio = None;

        Some(session)
    }

    /// Stop recording, cancel speech and drop the session without emitting events
    async fn teardown(&mut self) {
        if let Some(session) = self.release().await {
            info!("Session {} discarded on teardown", session.id);
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    fn set_state(&mut self, state: InteractionState) {
        if let Some(session) = self.session.as_mut() {
            session.state = state;
        }
        self.publish_state();
    }

    fn publish_state(&self) {
        if let Some(session) = &self.session {
            debug_assert!(
                session.audio_matches_state(),
                "Session {} holds audio in {}",
                session.id,
                session.state
            );
        }

        let snapshot = self
            .session
            .as_ref()
            .map(Snapshot::of)
            .unwrap_or_default();

        debug!("State -> {}", snapshot.state);
        self.emit(InteractionEvent::StateChanged {
            session_id: snapshot.session_id,
            state: snapshot.state,
        });
        self.snapshot.send_replace(snapshot);
    }

    fn emit(&self, event: InteractionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Run a network call under a deadline, classifying failure and expiry as `kind`
async fn bounded<T, F>(kind: ErrorKind, limit: Duration, call: F) -> Result<T, InteractionError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(InteractionError::from_source(kind, &e)),
        Err(_) => Err(InteractionError::new(
            kind,
            format!("timed out after {:.1}s", limit.as_secs_f64()),
        )),
    }
}
