use std::time::Duration;

use super::effect::{CompileJob, RecordDraft, SideEffect};
use super::event::Event;
use super::state::{ArmingPhase, FinalizingPhase, FrameSlot, IdleNotice, Score, Session, SessionState};
use crate::error::{ErrorKind, Failure};
use crate::vision::camera::Facing;

#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub stabilization: Duration,
    pub tension: Duration,
    pub recommendation: Score,
    pub facing: Facing,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            stabilization: Duration::from_millis(1200),
            tension: Duration::from_millis(750),
            recommendation: Score::THREE,
            facing: Facing::Environment,
        }
    }
}

/// Result of feeding one event to the machine.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: SessionState,
    pub effects: Vec<SideEffect>,
    /// False when the event made no sense in the current state and was dropped.
    pub accepted: bool,
}

impl Transition {
    fn to(state: SessionState) -> Self {
        Self {
            state,
            effects: Vec::new(),
            accepted: true,
        }
    }

    fn ignore(state: &SessionState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
            accepted: false,
        }
    }

    fn with(mut self, effect: SideEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// The session workflow as a pure function: `(state, event) -> (state, effects)`.
///
/// Forward-only. The only ways back to Idle are a reset, a camera refusal
/// or a completed session being dismissed.
#[derive(Debug, Clone, Default)]
pub struct Machine {
    config: MachineConfig,
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn step(&self, state: &SessionState, event: Event) -> Transition {
        use SessionState::*;

        // Global escapes first: reset from anywhere, failures from anywhere busy.
        match event {
            Event::Reset => return Self::reset(state),
            Event::Failed(failure) => return Self::fail(state, failure),
            _ => {}
        }

        match (state, event) {
            (Idle { .. }, Event::ArmRequested) => {
                Transition::to(CameraArming { phase: ArmingPhase::Requesting })
                    .with(SideEffect::RequestCamera { facing: self.config.facing })
            }

            (CameraArming { phase: ArmingPhase::Requesting }, Event::CameraGranted { .. }) => {
                Transition::to(CameraArming { phase: ArmingPhase::Stabilizing })
                    .with(SideEffect::Stabilize(self.config.stabilization))
            }
            (CameraArming { .. }, Event::CameraDenied { reason }) => {
                Transition::to(Idle { notice: Some(IdleNotice::CameraBlocked { reason }) })
                    .with(SideEffect::StopCamera)
            }
            (CameraArming { phase: ArmingPhase::Stabilizing }, Event::CameraStabilized) => {
                Transition::to(CapturePrompt)
            }

            (CapturePrompt, Event::FrameCaptured { slot: FrameSlot::Prompt, at, image }) => {
                Transition::to(Running { session: Session::begin(at, image) })
            }
            (Running { session }, Event::FrameCaptured { slot: FrameSlot::Response, at, image }) => {
                Transition::to(AwaitingStop { session: session.with_response(at, image) })
            }
            (AwaitingStop { session }, Event::FrameCaptured { slot: FrameSlot::Result, at, image }) => {
                let session = session.with_result(at, image, self.config.recommendation);
                Transition::to(AwaitingScore { session }).with(SideEffect::StopCamera)
            }

            (AwaitingScore { session }, Event::ScoreSelected(score)) => {
                match CompileJob::from_session(session, score) {
                    Some(job) => Transition::to(Finalizing {
                        session: session.clone(),
                        score,
                        phase: FinalizingPhase::Compiling,
                    })
                    .with(SideEffect::CompileArtifact(job)),
                    None => Self::fail(state, incomplete_session()),
                }
            }

            (
                Finalizing { session, score, phase: FinalizingPhase::Compiling },
                Event::ArtifactCompiled(artifact),
            ) => Transition::to(Finalizing {
                session: session.clone(),
                score: *score,
                phase: FinalizingPhase::Settling { artifact },
            })
            .with(SideEffect::TensionDelay(self.config.tension)),

            (
                Finalizing { session, score, phase: FinalizingPhase::Settling { artifact } },
                Event::TensionElapsed,
            ) => match RecordDraft::from_session(session, *score) {
                Some(draft) => Transition::to(Finalizing {
                    session: session.clone(),
                    score: *score,
                    phase: FinalizingPhase::Archiving { artifact: artifact.clone() },
                })
                .with(SideEffect::PersistRecord(draft)),
                None => Self::fail(state, incomplete_session()),
            },

            (
                Finalizing { phase: FinalizingPhase::Archiving { artifact }, .. },
                Event::RecordPersisted(record),
            ) => Transition::to(Completed {
                artifact: artifact.clone(),
                record,
            }),

            (state, _) => Transition::ignore(state),
        }
    }

    fn reset(state: &SessionState) -> Transition {
        let transition = Transition::to(SessionState::Idle { notice: None });
        if state.camera_live() {
            transition.with(SideEffect::StopCamera)
        } else {
            transition
        }
    }

    fn fail(state: &SessionState, failure: Failure) -> Transition {
        match state {
            // Nothing in flight to abandon.
            SessionState::Idle { .. } | SessionState::Failed { .. } | SessionState::Completed { .. } => {
                Transition::ignore(state)
            }
            _ => {
                let transition = Transition::to(SessionState::Failed { failure });
                if state.camera_live() {
                    transition.with(SideEffect::StopCamera)
                } else {
                    transition
                }
            }
        }
    }
}

fn incomplete_session() -> Failure {
    Failure {
        kind: ErrorKind::Capture,
        message: "session is missing frames or timestamps".to_string(),
    }
}
