use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::time::Millis;
use crate::artifact::Artifact;
use crate::error::Failure;
use crate::memory::history::HistoryRecord;

/// A grade from 1 to 4, given by the evaluator or recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub const ONE: Score = Score(1);
    pub const TWO: Score = Score(2);
    pub const THREE: Score = Score(3);
    pub const FOUR: Score = Score(4);

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Score {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Score(value))
        } else {
            Err(value)
        }
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed position of a frame inside the session (and the artifact).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameSlot {
    Prompt,
    Response,
    Result,
}

impl FrameSlot {
    pub fn index(self) -> usize {
        match self {
            FrameSlot::Prompt => 0,
            FrameSlot::Response => 1,
            FrameSlot::Result => 2,
        }
    }
}

/// One timed capture-to-score run.
///
/// Only the state machine builds sessions, and only by moving forward:
/// `start <= response <= end` and the frame list grows 1 -> 2 -> 3.
#[derive(Debug, Clone)]
pub struct Session {
    start: Millis,
    response: Option<Millis>,
    end: Option<Millis>,
    frames: Vec<Arc<RgbaImage>>,
    recommendation: Option<Score>,
}

impl Session {
    pub(crate) fn begin(at: Millis, prompt: Arc<RgbaImage>) -> Self {
        Self {
            start: at,
            response: None,
            end: None,
            frames: vec![prompt],
            recommendation: None,
        }
    }

    pub(crate) fn with_response(&self, at: Millis, image: Arc<RgbaImage>) -> Self {
        let mut next = self.clone();
        next.response = Some(at.max(self.start));
        next.frames.push(image);
        next
    }

    pub(crate) fn with_result(&self, at: Millis, image: Arc<RgbaImage>, recommendation: Score) -> Self {
        let mut next = self.clone();
        let floor = self.response.unwrap_or(self.start);
        next.end = Some(at.max(floor));
        next.frames.push(image);
        next.recommendation = Some(recommendation);
        next
    }

    pub fn start(&self) -> Millis {
        self.start
    }

    pub fn response(&self) -> Option<Millis> {
        self.response
    }

    pub fn end(&self) -> Option<Millis> {
        self.end
    }

    /// Raw captures in slot order.
    pub fn frames(&self) -> &[Arc<RgbaImage>] {
        &self.frames
    }

    pub fn recommendation(&self) -> Option<Score> {
        self.recommendation
    }

    /// Derived from the result timestamp; absent before step 3.
    pub fn session_id(&self) -> Option<i64> {
        self.end.map(|end| end.0)
    }

    /// Thinking time between prompt and answer.
    pub fn response_time_ms(&self) -> Option<u64> {
        self.response.map(|response| response.since(self.start))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmingPhase {
    /// Waiting on permission and stream metadata.
    Requesting,
    /// Stream is live; settling before the first capture is allowed.
    Stabilizing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleNotice {
    /// Last camera request was refused; a retry affordance is shown.
    CameraBlocked { reason: String },
}

#[derive(Debug, Clone)]
pub enum FinalizingPhase {
    Compiling,
    /// Artifact is ready; holding the short pause before archiving.
    Settling { artifact: Arc<Artifact> },
    Archiving { artifact: Arc<Artifact> },
}

#[derive(Debug, Clone)]
pub enum SessionState {
    Idle { notice: Option<IdleNotice> },
    CameraArming { phase: ArmingPhase },
    /// Step 1: camera ready, waiting for the prompt capture.
    CapturePrompt,
    /// Step 2: the clock is running.
    Running { session: Session },
    /// Step 3: answer given, waiting for the result capture.
    AwaitingStop { session: Session },
    AwaitingScore { session: Session },
    Finalizing {
        session: Session,
        score: Score,
        phase: FinalizingPhase,
    },
    Completed {
        artifact: Arc<Artifact>,
        record: HistoryRecord,
    },
    Failed { failure: Failure },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle { notice: None }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera_ready(&self) -> bool {
        matches!(
            self,
            SessionState::CapturePrompt
                | SessionState::Running { .. }
                | SessionState::AwaitingStop { .. }
        )
    }

    /// Whether a stream may be open and needs tearing down on exit.
    pub fn camera_live(&self) -> bool {
        self.camera_ready() || matches!(self, SessionState::CameraArming { .. })
    }

    /// Step counter as shown to the user: 1..=3 while capturing, 0 otherwise.
    pub fn step(&self) -> u8 {
        match self {
            SessionState::CapturePrompt => 1,
            SessionState::Running { .. } => 2,
            SessionState::AwaitingStop { .. } => 3,
            _ => 0,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Running { session }
            | SessionState::AwaitingStop { session }
            | SessionState::AwaitingScore { session }
            | SessionState::Finalizing { session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle { .. } => "idle",
            SessionState::CameraArming { phase: ArmingPhase::Requesting } => "camera_requesting",
            SessionState::CameraArming { phase: ArmingPhase::Stabilizing } => "camera_stabilizing",
            SessionState::CapturePrompt => "capture_prompt",
            SessionState::Running { .. } => "running",
            SessionState::AwaitingStop { .. } => "awaiting_stop",
            SessionState::AwaitingScore { .. } => "awaiting_score",
            SessionState::Finalizing { .. } => "finalizing",
            SessionState::Completed { .. } => "completed",
            SessionState::Failed { .. } => "failed",
        }
    }
}
