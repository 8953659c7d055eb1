pub mod camera;
pub mod capture;
pub mod overlay;

pub use camera::{Camera, CameraError, Facing, StreamInfo, SyntheticCamera};
pub use capture::{capture_frame, CaptureError, VideoFeed};
pub use overlay::{draw_score_overlay, score_caption, score_emoji};
