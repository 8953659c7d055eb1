use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgba, RgbaImage};

/// Bar height and glyph size as a fraction of the image height.
pub const FONT_RATIO: f32 = 0.08;
/// Opacity of the black band behind the caption.
pub const BAR_ALPHA: f32 = 0.6;
/// Gap between the caption's right edge and the image's right edge.
pub const RIGHT_MARGIN: u32 = 20;
/// Gap between the baseline and the bottom edge.
pub const BOTTOM_MARGIN: u32 = 10;

const GLYPH_CELLS: u32 = 8;
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

// 8x8 stand-ins for the score emoji, same bit order as font8x8
// (bit 0 is the leftmost column).
const STAR: [u8; 8] = [0x08, 0x08, 0x7F, 0x3E, 0x1C, 0x36, 0x22, 0x00];
const THUMBS_UP: [u8; 8] = [0x08, 0x0C, 0x0C, 0x3F, 0x7F, 0x7F, 0x3F, 0x00];
const THINKING: [u8; 8] = [0x3C, 0x42, 0xA5, 0x81, 0x99, 0x81, 0x42, 0x3C];
const SIREN: [u8; 8] = [0x18, 0x3C, 0x66, 0x66, 0x7E, 0x7E, 0xFF, 0xFF];

pub fn score_emoji(score: u8) -> &'static str {
    match score {
        4 => "⭐",
        3 => "👍",
        2 => "🤔",
        1 => "🚨",
        _ => "",
    }
}

/// Caption burned into the result frame.
pub fn score_caption(score: u8) -> String {
    format!("NOTE: {} {}", score, score_emoji(score))
}

/// Where the bar and caption land on an image of a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayLayout {
    /// First row covered by the translucent bar.
    pub bar_top: u32,
    /// Side of one square glyph cell, in pixels.
    pub glyph_size: u32,
    pub text_left: u32,
    pub text_top: u32,
    /// Exclusive right edge of the caption.
    pub text_right: u32,
}

pub fn overlay_layout(width: u32, height: u32, text: &str) -> OverlayLayout {
    let font = (height as f32 * FONT_RATIO).round().max(1.0) as u32;
    let bar_top = height.saturating_sub(font + BOTTOM_MARGIN);

    let glyphs = text.chars().count().max(1) as u32;
    let text_right = width.saturating_sub(RIGHT_MARGIN);
    // Shrink instead of spilling past the left edge on narrow frames.
    let glyph_size = font.min(text_right / glyphs);

    let baseline = height.saturating_sub(BOTTOM_MARGIN);
    OverlayLayout {
        bar_top,
        glyph_size,
        text_left: text_right - glyph_size * glyphs,
        text_top: baseline.saturating_sub(glyph_size),
        text_right,
    }
}

/// Returns a copy of `image` with the score band and caption drawn on it.
pub fn draw_score_overlay(image: &RgbaImage, score: u8) -> RgbaImage {
    let mut annotated = image.clone();
    let (width, height) = annotated.dimensions();
    let caption = score_caption(score);
    // Out-of-range scores have no pictogram; keep the text flush right.
    let text = caption.trim_end();
    let layout = overlay_layout(width, height, text);

    for y in layout.bar_top..height {
        for x in 0..width {
            let pixel = annotated.get_pixel_mut(x, y);
            for channel in pixel.0.iter_mut().take(3) {
                *channel = (*channel as f32 * (1.0 - BAR_ALPHA)).round() as u8;
            }
        }
    }

    if layout.glyph_size > 0 {
        let mut x = layout.text_left;
        for ch in text.chars() {
            if let Some(bitmap) = glyph(ch) {
                draw_glyph(&mut annotated, &bitmap, x, layout.text_top, layout.glyph_size);
            }
            x += layout.glyph_size;
        }
    }

    annotated
}

fn glyph(ch: char) -> Option<[u8; 8]> {
    match ch {
        '⭐' => Some(STAR),
        '👍' => Some(THUMBS_UP),
        '🤔' => Some(THINKING),
        '🚨' => Some(SIREN),
        _ => BASIC_FONTS.get(ch).or_else(|| LATIN_FONTS.get(ch)),
    }
}

fn draw_glyph(image: &mut RgbaImage, bitmap: &[u8; 8], left: u32, top: u32, size: u32) {
    let (width, height) = image.dimensions();
    for dy in 0..size {
        let row = bitmap[(dy * GLYPH_CELLS / size) as usize];
        for dx in 0..size {
            let column = dx * GLYPH_CELLS / size;
            if row & (1 << column) == 0 {
                continue;
            }
            let (x, y) = (left + dx, top + dy);
            if x < width && y < height {
                image.put_pixel(x, y, TEXT_COLOR);
            }
        }
    }
}
