use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::effect::SideEffect;
use super::event::Event;
use super::machine::{Machine, MachineConfig};
use super::state::{FrameSlot, Score, SessionState};
use super::time::Clock;
use crate::artifact::{AnimationEncoder, ArtifactCompiler};
use crate::config::{ConfigError, TripkikConfig};
use crate::error::SessionError;
use crate::memory::history::{HistoryRecord, HistoryStore};
use crate::memory::store::{KeyValueStore, StoreResult};
use crate::outputs::presenter::{render, PrimaryAction, UiDescription};
use crate::outputs::router::Route;
use crate::vision::camera::{Camera, CameraError};
use crate::vision::capture::{capture_frame, CaptureError};

/// Outcome of running one side effect.
enum Outcome {
    Next(Option<Event>),
    Cancelled,
}

/// Cancels whatever the reactor is currently waiting on (camera, stabilization,
/// compilation, tension delay). The session then resets to Idle.
///
/// A reset sent between dispatches is held: the next dispatch resets the
/// session instead of handling its own event.
#[derive(Clone)]
pub struct ResetHandle {
    slot: Arc<Mutex<CancellationToken>>,
}

impl ResetHandle {
    pub fn reset(&self) {
        let token = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        token.cancel();
    }
}

/// Drives the session machine: turns user input into events, executes the
/// resulting effects in order and feeds their outcomes back until the queue
/// drains.
pub struct SessionReactor<C, S> {
    state: SessionState,
    machine: Machine,
    camera: C,
    compiler: ArtifactCompiler,
    history: HistoryStore<S>,
    clock: Arc<dyn Clock>,
    acquire_timeout: Duration,
    reset_slot: Arc<Mutex<CancellationToken>>,
}

impl<C: Camera, S: KeyValueStore> SessionReactor<C, S> {
    pub fn new(
        machine: Machine,
        camera: C,
        compiler: ArtifactCompiler,
        history: HistoryStore<S>,
        clock: Arc<dyn Clock>,
        acquire_timeout: Duration,
    ) -> Self {
        Self {
            state: SessionState::new(),
            machine,
            camera,
            compiler,
            history,
            clock,
            acquire_timeout,
            reset_slot: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    /// Wires every collaborator from a loaded configuration.
    pub fn from_config(
        config: &TripkikConfig,
        camera: C,
        encoder: Arc<dyn AnimationEncoder>,
        store: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let machine = Machine::new(MachineConfig {
            stabilization: config.stabilization(),
            tension: config.tension_delay(),
            recommendation: config.recommendation()?,
            facing: config.camera.facing,
        });
        let compiler = ArtifactCompiler::new(encoder, config.artifact.clone());
        let history = HistoryStore::with_key(store, config.storage.history_key.clone());
        Ok(Self::new(
            machine,
            camera,
            compiler,
            history,
            clock,
            config.acquire_timeout(),
        ))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn ui(&self, route: &Route) -> UiDescription {
        render(&self.state, route)
    }

    /// Archived sessions, most recent first.
    pub fn history(&self) -> StoreResult<Vec<HistoryRecord>> {
        self.history.list()
    }

    pub fn reset_handle(&self) -> ResetHandle {
        ResetHandle {
            slot: self.reset_slot.clone(),
        }
    }

    /// Activates the primary control. Returns false when it is hidden or
    /// disabled, in which case nothing changes.
    pub async fn press(&mut self) -> bool {
        let action = render(&self.state, &Route::Home).enabled_action();
        let event = match action {
            Some(PrimaryAction::ArmCamera) => Event::ArmRequested,
            Some(PrimaryAction::Capture(slot)) => self.capture(slot),
            Some(PrimaryAction::ReturnHome) => Event::Reset,
            Some(PrimaryAction::Nothing) | None => {
                debug!("Press ignored in {}", self.state.name());
                return false;
            }
        };
        self.dispatch(event).await
    }

    /// Grades the session. Out-of-range values are rejected before they reach
    /// the machine. `Ok(false)` means no session was waiting for a score.
    pub async fn select_score(&mut self, value: u8) -> Result<bool, SessionError> {
        let score = Score::try_from(value).map_err(SessionError::InvalidScore)?;
        Ok(self.dispatch(Event::ScoreSelected(score)).await)
    }

    /// The "retry" affordance shown after the camera was refused.
    pub async fn retry_camera(&mut self) -> bool {
        self.dispatch(Event::ArmRequested).await
    }

    pub async fn reset(&mut self) -> bool {
        self.dispatch(Event::Reset).await
    }

    /// Feeds one event and runs the resulting chain to completion. Returns
    /// whether the initial event was accepted.
    pub async fn dispatch(&mut self, event: Event) -> bool {
        let (token, pending_reset) = self.fresh_token();
        let event = if pending_reset {
            info!("Reset requested while {}; dropping {}", self.state.name(), event.name());
            Event::Reset
        } else {
            event
        };
        let mut queue = VecDeque::from([event]);
        let mut accepted = None;

        while let Some(event) = queue.pop_front() {
            let name = event.name();
            let transition = self.machine.step(&self.state, event);
            accepted.get_or_insert(transition.accepted);
            if !transition.accepted {
                debug!("Event {} ignored in {}", name, self.state.name());
                continue;
            }
            debug!("{} --{}--> {}", self.state.name(), name, transition.state.name());
            self.state = transition.state;

            for effect in transition.effects {
                match self.run(effect, &token).await {
                    Outcome::Next(Some(next)) => queue.push_back(next),
                    Outcome::Next(None) => {}
                    Outcome::Cancelled => {
                        info!("Reset requested while {}", self.state.name());
                        self.fresh_token();
                        queue.clear();
                        queue.push_back(Event::Reset);
                        break;
                    }
                }
            }
        }

        !pending_reset && accepted.unwrap_or(false)
    }

    /// Installs a new token for the handle. The flag reports whether the
    /// previous one was cancelled without anyone consuming it.
    fn fresh_token(&self) -> (CancellationToken, bool) {
        let token = CancellationToken::new();
        let mut slot = self.reset_slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let pending = slot.is_cancelled();
        *slot = token.clone();
        (token, pending)
    }

    fn capture(&self, slot: FrameSlot) -> Event {
        let at = self.clock.now_millis();
        let frame = match self.camera.feed() {
            Some(feed) => capture_frame(feed),
            None => Err(CaptureError::NoFeed),
        };
        match frame {
            Ok(image) => Event::FrameCaptured {
                slot,
                at,
                image: Arc::new(image),
            },
            Err(err) => {
                warn!("Capture of {:?} failed: {}", slot, err);
                Event::Failed(SessionError::from(err).to_failure())
            }
        }
    }

    async fn run(&mut self, effect: SideEffect, token: &CancellationToken) -> Outcome {
        match effect {
            // Teardown must happen even when the run was cancelled.
            SideEffect::StopCamera => {
                self.camera.stop();
                Outcome::Next(None)
            }
            SideEffect::PersistRecord(draft) => {
                let record = HistoryRecord::from_draft(&draft, self.clock.now());
                let event = match self.history.append(record.clone()) {
                    Ok(()) => {
                        info!("Archived session {} with score {}", record.id, record.score);
                        Event::RecordPersisted(record)
                    }
                    Err(err) => {
                        warn!("History write failed: {}", err);
                        Event::Failed(SessionError::from(err).to_failure())
                    }
                };
                Outcome::Next(Some(event))
            }
            SideEffect::RequestCamera { facing } => {
                let limit = self.acquire_timeout;
                let open = tokio::time::timeout(limit, self.camera.open(facing));
                let event = tokio::select! {
                    _ = token.cancelled() => return Outcome::Cancelled,
                    opened = open => match opened {
                        Ok(Ok(info)) => Event::CameraGranted {
                            width: info.width,
                            height: info.height,
                        },
                        Ok(Err(err)) => {
                            warn!("Camera refused: {}", err);
                            Event::CameraDenied { reason: err.to_string() }
                        }
                        Err(_) => {
                            let err = CameraError::Timeout(limit.as_millis() as u64);
                            warn!("{}", err);
                            Event::CameraDenied { reason: err.to_string() }
                        }
                    },
                };
                Outcome::Next(Some(event))
            }
            SideEffect::Stabilize(delay) => {
                tokio::select! {
                    _ = token.cancelled() => Outcome::Cancelled,
                    _ = tokio::time::sleep(delay) => Outcome::Next(Some(Event::CameraStabilized)),
                }
            }
            SideEffect::CompileArtifact(job) => {
                let event = tokio::select! {
                    _ = token.cancelled() => return Outcome::Cancelled,
                    compiled = self.compiler.compile(&job) => match compiled {
                        Ok(artifact) => Event::ArtifactCompiled(Arc::new(artifact)),
                        Err(err) => {
                            warn!("Artifact compilation failed: {}", err);
                            Event::Failed(SessionError::from(err).to_failure())
                        }
                    },
                };
                Outcome::Next(Some(event))
            }
            SideEffect::TensionDelay(delay) => {
                tokio::select! {
                    _ = token.cancelled() => Outcome::Cancelled,
                    _ = tokio::time::sleep(delay) => Outcome::Next(Some(Event::TensionElapsed)),
                }
            }
        }
    }
}
