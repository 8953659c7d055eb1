use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tripkik::artifact::{ArtifactCompiler, CompileError, GifAnimationEncoder};
use tripkik::config::ArtifactConfig;
use tripkik::kernel::effect::CompileJob;
use tripkik::kernel::state::Score;
use tripkik::kernel::time::Millis;
use tripkik::outputs::{render_history, HistoryView};
use tripkik::memory::history::HistoryRecord;

fn solid(width: u32, height: u32, shade: u8) -> Arc<RgbaImage> {
    Arc::new(RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255])))
}

fn job(frames: [Arc<RgbaImage>; 3], response: i64, score: Score) -> CompileJob {
    CompileJob {
        frames,
        start: Millis(0),
        response: Millis(response),
        score,
        session_id: 4000,
    }
}

fn decoded_delays(bytes: &[u8]) -> (u16, u16, Vec<u16>) {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(bytes).unwrap();
    let size = (decoder.width(), decoder.height());
    let mut delays = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        delays.push(frame.delay);
    }
    (size.0, size.1, delays)
}

#[tokio::test]
async fn test_compiled_gif_holds_each_frame_as_planned() {
    let compiler = ArtifactCompiler::new(Arc::new(GifAnimationEncoder::new()), ArtifactConfig::default());
    let frames = [solid(40, 30, 20), solid(40, 30, 120), solid(40, 30, 220)];

    let artifact = compiler.compile(&job(frames, 1500, Score::THREE)).await.unwrap();

    assert_eq!(artifact.filename, "tripkik_preuve_4000_3.gif");
    assert_eq!(artifact.mime, "image/gif");
    assert_eq!(artifact.holds_ms, [1500, 750, 1000]);

    let (width, height, delays) = decoded_delays(&artifact.bytes);
    assert_eq!((width, height), (40, 30));
    assert_eq!(delays, vec![150, 75, 100]);
}

#[tokio::test]
async fn test_result_frame_carries_score_band() {
    let compiler = ArtifactCompiler::new(Arc::new(GifAnimationEncoder::new()), ArtifactConfig::default());
    let result = solid(200, 100, 200);
    let frames = [solid(200, 100, 0), solid(200, 100, 0), result.clone()];

    let artifact = compiler.compile(&job(frames, 800, Score::FOUR)).await.unwrap();

    // Bottom rows are darkened, the top row is untouched
    let scored = &artifact.scored_frame;
    let bottom = scored.get_pixel(0, 99);
    assert!(bottom[0] < 200, "band should darken the bottom edge");
    assert_eq!(scored.get_pixel(0, 0), result.get_pixel(0, 0));
    // The raw capture is left alone
    assert_eq!(result.get_pixel(0, 99)[0], 200);
}

#[tokio::test]
async fn test_frames_of_another_size_are_scaled_to_the_prompt() {
    let compiler = ArtifactCompiler::new(Arc::new(GifAnimationEncoder::new()), ArtifactConfig::default());
    let frames = [solid(40, 30, 0), solid(80, 60, 90), solid(20, 15, 180)];

    let artifact = compiler.compile(&job(frames, 5000, Score::ONE)).await.unwrap();

    assert_eq!((artifact.width, artifact.height), (40, 30));
    assert_eq!(artifact.holds_ms[0], 3000);
    let (width, height, delays) = decoded_delays(&artifact.bytes);
    assert_eq!((width, height), (40, 30));
    assert_eq!(delays.len(), 3);
}

#[tokio::test]
async fn test_empty_prompt_frame_is_rejected() {
    let compiler = ArtifactCompiler::new(Arc::new(GifAnimationEncoder::new()), ArtifactConfig::default());
    let frames = [Arc::new(RgbaImage::new(0, 0)), solid(4, 4, 0), solid(4, 4, 0)];

    let err = compiler.compile(&job(frames, 100, Score::TWO)).await.unwrap_err();
    assert!(matches!(err, CompileError::EmptyFrame));
}

#[test]
fn test_history_view_formats_archived_records() {
    let record = HistoryRecord {
        id: 4000,
        timestamp: "14:03:27".into(),
        date: "16/10/2026".into(),
        score: 3,
        duration_s: "1.5".into(),
        ia_reco: 3,
    };
    match render_history(&[record]) {
        HistoryView::Entries(lines) => {
            assert_eq!(lines.len(), 1);
            assert_eq!(lines[0].heading, "Évaluation du 16/10/2026 à 14:03:27");
            assert_eq!(lines[0].summary, "Score final: 3 👍 / Durée: 1.5s");
        }
        other => panic!("unexpected view {other:?}"),
    }
}
