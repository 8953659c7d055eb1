use serde::Serialize;
use thiserror::Error;

use crate::artifact::encoder::EncodeError;
use crate::artifact::compiler::CompileError;
use crate::memory::store::StoreError;
use crate::vision::camera::CameraError;
use crate::vision::capture::CaptureError;

/// Coarse classification of everything that can go wrong inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CameraAccessDenied,
    Capture,
    Encoding,
    Storage,
    InvalidScore,
}

impl ErrorKind {
    /// Only a refused camera is worth retrying in place; an out-of-range
    /// score leaves the state untouched and needs no affordance at all.
    pub fn recovery(self) -> Recovery {
        match self {
            ErrorKind::CameraAccessDenied => Recovery::Retry,
            _ => Recovery::Restart,
        }
    }
}

/// The single affordance offered to the user after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Try the camera again without a full reset.
    Retry,
    /// Full reset back to Idle.
    Restart,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("camera unavailable: {0}")]
    Camera(#[from] CameraError),
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("artifact compilation failed: {0}")]
    Encoding(#[from] CompileError),
    #[error("history store failed: {0}")]
    Storage(#[from] StoreError),
    #[error("score {0} is outside 1..=4")]
    InvalidScore(u8),
}

impl From<EncodeError> for SessionError {
    fn from(error: EncodeError) -> Self {
        Self::Encoding(CompileError::Encoding(error))
    }
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Camera(_) => ErrorKind::CameraAccessDenied,
            SessionError::Capture(_) => ErrorKind::Capture,
            SessionError::Encoding(_) => ErrorKind::Encoding,
            SessionError::Storage(_) => ErrorKind::Storage,
            SessionError::InvalidScore(_) => ErrorKind::InvalidScore,
        }
    }

    /// Cloneable summary carried by the state machine.
    pub fn to_failure(&self) -> Failure {
        Failure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// What the state machine keeps of an error once it has been routed to the
/// failed state. Errors themselves hold I/O handles and are not `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    pub fn recovery(&self) -> Recovery {
        self.kind.recovery()
    }
}
