use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;

use super::state::{Score, Session};
use super::time::Millis;
use crate::vision::camera::Facing;

/// Work the driver must perform after a transition. The machine never does
/// I/O itself; outcomes come back as events.
#[derive(Debug, Clone)]
pub enum SideEffect {
    RequestCamera { facing: Facing },
    Stabilize(Duration),
    StopCamera,
    CompileArtifact(CompileJob),
    TensionDelay(Duration),
    PersistRecord(RecordDraft),
}

/// Everything the compiler needs, detached from the session.
#[derive(Debug, Clone)]
pub struct CompileJob {
    pub frames: [Arc<RgbaImage>; 3],
    pub start: Millis,
    pub response: Millis,
    pub score: Score,
    pub session_id: i64,
}

impl CompileJob {
    /// `None` unless the session holds all three frames and timestamps.
    pub fn from_session(session: &Session, score: Score) -> Option<Self> {
        let frames = session.frames();
        if frames.len() != 3 {
            return None;
        }
        Some(Self {
            frames: [frames[0].clone(), frames[1].clone(), frames[2].clone()],
            start: session.start(),
            response: session.response()?,
            score,
            session_id: session.session_id()?,
        })
    }
}

/// History record minus the wall-clock strings, stamped at persistence time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    pub id: i64,
    pub score: Score,
    pub response_time_ms: u64,
    pub recommendation: Score,
}

impl RecordDraft {
    pub fn from_session(session: &Session, score: Score) -> Option<Self> {
        Some(Self {
            id: session.session_id()?,
            score,
            response_time_ms: session.response_time_ms()?,
            recommendation: session.recommendation()?,
        })
    }
}
