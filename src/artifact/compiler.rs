use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::encoder::{AnimationEncoder, EncodeError, EncodeFrame, EncodeRequest};
use super::Artifact;
use crate::config::ArtifactConfig;
use crate::kernel::effect::CompileJob;
use crate::kernel::time::Millis;
use crate::vision::overlay::draw_score_overlay;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Encoding(#[from] EncodeError),
    #[error("encoder did not finish within {0} ms")]
    Timeout(u64),
    #[error("prompt frame is empty")]
    EmptyFrame,
}

/// How long each of the three frames stays on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldPlan {
    pub prompt_ms: u32,
    pub response_ms: u32,
    pub result_ms: u32,
}

impl HoldPlan {
    /// The prompt holds for the measured thinking time, capped so a long
    /// think does not produce a long artifact.
    pub fn for_timings(start: Millis, response: Millis, settings: &ArtifactConfig) -> Self {
        let thinking = response.since(start);
        let prompt_ms = thinking.min(u64::from(settings.max_prompt_hold_ms)) as u32;
        Self {
            prompt_ms,
            response_ms: settings.response_hold_ms,
            result_ms: settings.result_hold_ms,
        }
    }

    pub fn as_array(&self) -> [u32; 3] {
        [self.prompt_ms, self.response_ms, self.result_ms]
    }
}

pub struct ArtifactCompiler {
    encoder: Arc<dyn AnimationEncoder>,
    settings: ArtifactConfig,
}

impl ArtifactCompiler {
    pub fn new(encoder: Arc<dyn AnimationEncoder>, settings: ArtifactConfig) -> Self {
        Self { encoder, settings }
    }

    pub async fn compile(&self, job: &CompileJob) -> Result<Artifact, CompileError> {
        let holds = HoldPlan::for_timings(job.start, job.response, &self.settings);
        let (width, height) = job.frames[0].dimensions();
        if width == 0 || height == 0 {
            return Err(CompileError::EmptyFrame);
        }

        let scored = Arc::new(draw_score_overlay(&job.frames[2], job.score.value()));
        let ordered = [job.frames[0].clone(), job.frames[1].clone(), scored.clone()];

        let frames = ordered
            .iter()
            .zip(holds.as_array())
            .map(|(image, hold_ms)| EncodeFrame {
                image: fit(image, width, height),
                hold_ms,
            })
            .collect();

        let request = EncodeRequest {
            frames,
            width,
            height,
            quality: self.settings.quality,
            workers: self.settings.workers,
        };

        let limit = self.settings.encode_timeout();
        let encoded = match tokio::time::timeout(limit, self.encoder.encode(request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Encoder stalled for {:?}; giving up", limit);
                return Err(CompileError::Timeout(limit.as_millis() as u64));
            }
        };

        let filename = artifact_filename(job.session_id, job.score.value(), encoded.extension);
        info!("Compiled {} ({} bytes, holds {:?})", filename, encoded.bytes.len(), holds.as_array());

        Ok(Artifact {
            bytes: encoded.bytes,
            filename,
            mime: encoded.mime,
            width,
            height,
            holds_ms: holds.as_array(),
            scored_frame: scored,
        })
    }
}

pub fn artifact_filename(session_id: i64, score: u8, extension: &str) -> String {
    format!("tripkik_preuve_{}_{}.{}", session_id, score, extension)
}

/// Frames from a stream that changed resolution mid-session are scaled to
/// the prompt frame's size.
fn fit(image: &Arc<RgbaImage>, width: u32, height: u32) -> Arc<RgbaImage> {
    if image.dimensions() == (width, height) {
        image.clone()
    } else {
        Arc::new(imageops::resize(&**image, width, height, FilterType::Triangle))
    }
}
