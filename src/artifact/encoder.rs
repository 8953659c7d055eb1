use async_trait::async_trait;
use image::RgbaImage;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("nothing to encode")]
    NoFrames,
    #[error("{width}x{height} does not fit the format")]
    TooLarge { width: u32, height: u32 },
    #[error("frame {index} is {actual:?}, expected {expected:?}")]
    FrameSize {
        index: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("quality {0} is outside 1..=30")]
    Quality(u8),
    #[error("encoder worker failed: {0}")]
    Worker(String),
    #[error(transparent)]
    Gif(#[from] gif::EncodingError),
}

#[derive(Debug, Clone)]
pub struct EncodeFrame {
    pub image: Arc<RgbaImage>,
    pub hold_ms: u32,
}

/// Ordered frames plus the encoder settings.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub frames: Vec<EncodeFrame>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct EncodedAnimation {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub extension: &'static str,
}

/// External animation encoding service.
#[async_trait]
pub trait AnimationEncoder: Send + Sync {
    async fn encode(&self, request: EncodeRequest) -> Result<EncodedAnimation, EncodeError>;
}

/// Looping GIF encoder. Palette quantization (the expensive part) runs on
/// up to `workers` blocking threads; frames are then written in order.
#[derive(Debug, Default, Clone, Copy)]
pub struct GifAnimationEncoder;

impl GifAnimationEncoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnimationEncoder for GifAnimationEncoder {
    async fn encode(&self, request: EncodeRequest) -> Result<EncodedAnimation, EncodeError> {
        let (width, height) = check_request(&request)?;
        let quality = request.quality;
        let total = request.frames.len();

        let pool = Arc::new(Semaphore::new(request.workers.max(1)));
        let mut jobs = Vec::with_capacity(total);
        for frame in request.frames {
            let permit = pool
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| EncodeError::Worker(e.to_string()))?;
            jobs.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                quantize(&frame, width, height, quality)
            }));
        }

        let mut quantized = Vec::with_capacity(total);
        for job in jobs {
            let frame = job.await.map_err(|e| EncodeError::Worker(e.to_string()))?;
            quantized.push(frame);
        }
        debug!("Quantized {} frames at quality {}", total, quality);

        let bytes = tokio::task::spawn_blocking(move || write_gif(width, height, &quantized))
            .await
            .map_err(|e| EncodeError::Worker(e.to_string()))??;

        Ok(EncodedAnimation {
            bytes,
            mime: "image/gif",
            extension: "gif",
        })
    }
}

fn check_request(request: &EncodeRequest) -> Result<(u16, u16), EncodeError> {
    if request.frames.is_empty() {
        return Err(EncodeError::NoFrames);
    }
    if !(1..=30).contains(&request.quality) {
        return Err(EncodeError::Quality(request.quality));
    }
    let too_large = || EncodeError::TooLarge {
        width: request.width,
        height: request.height,
    };
    let width = u16::try_from(request.width).map_err(|_| too_large())?;
    let height = u16::try_from(request.height).map_err(|_| too_large())?;
    if width == 0 || height == 0 {
        return Err(too_large());
    }

    let expected = (request.width, request.height);
    for (index, frame) in request.frames.iter().enumerate() {
        let actual = frame.image.dimensions();
        if actual != expected {
            return Err(EncodeError::FrameSize { index, expected, actual });
        }
    }
    Ok((width, height))
}

fn quantize(frame: &EncodeFrame, width: u16, height: u16, quality: u8) -> gif::Frame<'static> {
    let mut pixels = frame.image.as_raw().clone();
    let mut quantized = gif::Frame::from_rgba_speed(width, height, &mut pixels, i32::from(quality));
    quantized.delay = centiseconds(frame.hold_ms);
    quantized
}

fn write_gif(width: u16, height: u16, frames: &[gif::Frame<'static>]) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut bytes, width, height, &[])?;
        encoder.set_repeat(gif::Repeat::Infinite)?;
        for frame in frames {
            encoder.write_frame(frame)?;
        }
    }
    Ok(bytes)
}

/// GIF delays are in hundredths of a second.
pub fn centiseconds(hold_ms: u32) -> u16 {
    (hold_ms.saturating_add(5) / 10).min(u32::from(u16::MAX)) as u16
}
