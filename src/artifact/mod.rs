pub mod compiler;
pub mod encoder;

use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use compiler::{artifact_filename, ArtifactCompiler, CompileError, HoldPlan};
pub use encoder::{AnimationEncoder, EncodeError, EncodeRequest, EncodedAnimation, GifAnimationEncoder};

/// The compiled proof: encoded bytes plus what was fed into them.
#[derive(Clone)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
    /// Hold of frames 0, 1, 2 in milliseconds.
    pub holds_ms: [u32; 3],
    /// Result frame with the score burned in, for the preview.
    pub scored_frame: Arc<RgbaImage>,
}

impl Artifact {
    /// Writes the artifact under its own filename inside `dir`.
    pub fn save_in(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("filename", &self.filename)
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .field("size", &(self.width, self.height))
            .field("holds_ms", &self.holds_ms)
            .finish()
    }
}
