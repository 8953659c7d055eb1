use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::kernel::state::Score;
use crate::vision::camera::Facing;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level configuration. Every field has a default so an empty (or missing)
/// file yields the stock behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TripkikConfig {
    pub camera: CameraConfig,
    pub artifact: ArtifactConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Pause between "stream ready" and the first allowed capture.
    pub stabilization_ms: u64,
    /// Upper bound on waiting for permission + first metadata.
    pub acquire_timeout_ms: u64,
    /// Resolution of the synthetic camera used by the demo binary.
    pub width: u32,
    pub height: u32,
    /// `environment` (rear) or `user` (front).
    pub facing: Facing,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            stabilization_ms: 1200,
            acquire_timeout_ms: 10_000,
            width: 640,
            height: 480,
            facing: Facing::Environment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Cap on the prompt frame's hold, whatever the thinking time was.
    pub max_prompt_hold_ms: u32,
    pub response_hold_ms: u32,
    pub result_hold_ms: u32,
    /// NeuQuant sample factor, 1 (best) ..= 30 (fastest).
    pub quality: u8,
    pub workers: usize,
    pub encode_timeout_ms: u64,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            max_prompt_hold_ms: 3000,
            response_hold_ms: 750,
            result_hold_ms: 1000,
            quality: 10,
            workers: 2,
            encode_timeout_ms: 30_000,
        }
    }
}

impl ArtifactConfig {
    pub fn encode_timeout(&self) -> Duration {
        Duration::from_millis(self.encode_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Pause after the artifact is ready and before the record is archived.
    pub tension_delay_ms: u64,
    /// Stubbed recommendation attached to every session.
    pub recommendation: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tension_delay_ms: 750,
            recommendation: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub history_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".tripkik"),
            history_key: "tripkik_history".to_string(),
        }
    }
}

impl TripkikConfig {
    /// Loads `path` if given, falls back to defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=30).contains(&self.artifact.quality) {
            return Err(ConfigError::Invalid {
                field: "artifact.quality",
                reason: format!("{} is outside 1..=30", self.artifact.quality),
            });
        }
        if self.artifact.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "artifact.workers",
                reason: "at least one worker is required".to_string(),
            });
        }
        self.recommendation()?;
        Ok(())
    }

    pub fn recommendation(&self) -> Result<Score, ConfigError> {
        Score::try_from(self.session.recommendation).map_err(|_| ConfigError::Invalid {
            field: "session.recommendation",
            reason: format!("{} is outside 1..=4", self.session.recommendation),
        })
    }

    pub fn stabilization(&self) -> Duration {
        Duration::from_millis(self.camera.stabilization_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.camera.acquire_timeout_ms)
    }

    pub fn tension_delay(&self) -> Duration {
        Duration::from_millis(self.session.tension_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: TripkikConfig = toml::from_str("").unwrap();
        assert_eq!(config.camera.stabilization_ms, 1200);
        assert_eq!(config.artifact.max_prompt_hold_ms, 3000);
        assert_eq!(config.artifact.workers, 2);
        assert_eq!(config.artifact.quality, 10);
        assert_eq!(config.session.tension_delay_ms, 750);
        assert_eq!(config.storage.history_key, "tripkik_history");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: TripkikConfig = toml::from_str(
            r#"
            [artifact]
            quality = 20

            [storage]
            dir = "/tmp/tripkik"
            "#,
        )
        .unwrap();
        assert_eq!(config.artifact.quality, 20);
        assert_eq!(config.artifact.result_hold_ms, 1000);
        assert_eq!(config.storage.dir, PathBuf::from("/tmp/tripkik"));
        assert_eq!(config.storage.history_key, "tripkik_history");
    }

    #[test]
    fn camera_facing_and_encode_timeout_are_configurable() {
        let config: TripkikConfig = toml::from_str(
            r#"
            [camera]
            facing = "user"

            [artifact]
            encode_timeout_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.camera.facing, Facing::User);
        assert_eq!(config.artifact.encode_timeout(), Duration::from_millis(500));
        assert_eq!(TripkikConfig::default().camera.facing, Facing::Environment);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = TripkikConfig::default();
        config.artifact.quality = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "artifact.quality", .. })
        ));

        let mut config = TripkikConfig::default();
        config.session.recommendation = 7;
        assert!(config.validate().is_err());
    }
}
