use image::RgbaImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("video feed reports {width}x{height}; not ready for capture")]
    ZeroDimensions { width: u32, height: u32 },
    #[error("no live video feed")]
    NoFeed,
}

/// A live video source that can be snapshotted.
pub trait VideoFeed: Send + Sync {
    /// Native resolution of the stream. Zero until the first metadata arrives.
    fn native_size(&self) -> (u32, u32);

    /// Copies the current frame into `surface`, which is already sized to
    /// `native_size()`.
    fn copy_into(&self, surface: &mut RgbaImage) -> Result<(), CaptureError>;
}

/// Snapshot the feed into a freshly allocated raster at native resolution.
pub fn capture_frame<F: VideoFeed + ?Sized>(feed: &F) -> Result<RgbaImage, CaptureError> {
    let (width, height) = feed.native_size();
    if width == 0 || height == 0 {
        return Err(CaptureError::ZeroDimensions { width, height });
    }

    let mut surface = RgbaImage::new(width, height);
    feed.copy_into(&mut surface)?;
    Ok(surface)
}
