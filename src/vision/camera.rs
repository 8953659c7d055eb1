use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use tracing::{debug, info};

use super::capture::{CaptureError, VideoFeed};

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera access denied: {0}")]
    AccessDenied(String),
    #[error("camera did not become ready within {0} ms")]
    Timeout(u64),
    #[error("camera stream failed: {0}")]
    Stream(String),
}

/// Requested lens. Rear-facing is preferred so the sheet of paper is framed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    #[default]
    Environment,
    User,
}

/// What the stream reported once its metadata arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait Camera: Send {
    /// Asks for access and waits for the stream's metadata.
    async fn open(&mut self, facing: Facing) -> Result<StreamInfo, CameraError>;

    /// The live feed, if a stream is open.
    fn feed(&self) -> Option<&dyn VideoFeed>;

    /// Stops every track. Safe to call when nothing is open.
    fn stop(&mut self);

    fn is_streaming(&self) -> bool {
        self.feed().is_some()
    }
}

/// Renders a moving gradient test pattern instead of reading hardware.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    deny: Option<String>,
    stream: Option<SyntheticFeed>,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            deny: None,
            stream: None,
        }
    }

    /// Every `open` fails as if the user refused permission.
    pub fn denying(mut self, reason: impl Into<String>) -> Self {
        self.deny = Some(reason.into());
        self
    }
}

#[async_trait]
impl Camera for SyntheticCamera {
    async fn open(&mut self, facing: Facing) -> Result<StreamInfo, CameraError> {
        if let Some(reason) = &self.deny {
            return Err(CameraError::AccessDenied(reason.clone()));
        }
        info!("Synthetic camera opened ({:?}, {}x{})", facing, self.width, self.height);
        self.stream = Some(SyntheticFeed::new(self.width, self.height));
        Ok(StreamInfo {
            width: self.width,
            height: self.height,
        })
    }

    fn feed(&self) -> Option<&dyn VideoFeed> {
        self.stream.as_ref().map(|feed| feed as &dyn VideoFeed)
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            debug!("Synthetic camera stopped");
        }
    }
}

pub struct SyntheticFeed {
    width: u32,
    height: u32,
    frame: AtomicU32,
}

impl SyntheticFeed {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: AtomicU32::new(0),
        }
    }
}

impl VideoFeed for SyntheticFeed {
    fn native_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn copy_into(&self, surface: &mut RgbaImage) -> Result<(), CaptureError> {
        // Each snapshot shifts the pattern so consecutive frames differ.
        let shift = self.frame.fetch_add(1, Ordering::Relaxed).wrapping_mul(37);
        let (w, h) = (self.width.max(1), self.height.max(1));
        for (x, y, pixel) in surface.enumerate_pixels_mut() {
            let r = (x.wrapping_add(shift) % w * 255 / w) as u8;
            let g = (y * 255 / h) as u8;
            let b = (x.wrapping_add(y).wrapping_add(shift) % 256) as u8;
            *pixel = image::Rgba([r, g, b, 255]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::capture::capture_frame;

    #[tokio::test]
    async fn synthetic_camera_streams_until_stopped() {
        let mut camera = SyntheticCamera::new(16, 12);
        assert!(!camera.is_streaming());

        let info = camera.open(Facing::Environment).await.unwrap();
        assert_eq!(info, StreamInfo { width: 16, height: 12 });

        let first = capture_frame(camera.feed().unwrap()).unwrap();
        let second = capture_frame(camera.feed().unwrap()).unwrap();
        assert_eq!(first.dimensions(), (16, 12));
        assert_ne!(first.as_raw(), second.as_raw());

        camera.stop();
        assert!(camera.feed().is_none());
    }

    #[tokio::test]
    async fn denying_camera_reports_access_denied() {
        let mut camera = SyntheticCamera::new(16, 12).denying("NotAllowedError");
        let err = camera.open(Facing::Environment).await.unwrap_err();
        assert!(matches!(err, CameraError::AccessDenied(reason) if reason == "NotAllowedError"));
        assert!(!camera.is_streaming());
    }
}
