//! Outlined caption text drawn over the image.
//!
//! Captions auto-size to the image: the stage searches for the largest font
//! size whose rendered line stays strictly narrower than the configured
//! fraction of the image width, then centers the line near the top or bottom
//! edge. Legibility over arbitrary photos comes from a black outline drawn
//! under the white text. The stage never fails the pipeline; when text cannot
//! be rendered the image passes through unchanged.

use image::{RgbImage, Rgba};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::text::{FontSource, blend_sprite};

/// Upper bound for the caption size search.
const MAX_FONT_PX: u32 = 4096;

// ============================================================================
// CaptionPosition
// ============================================================================

/// Which edge the caption hugs.
///
/// The wire names are `"top"` and `"bottom"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub enum CaptionPosition {
    /// Centered below the top margin.
    Top,

    /// Centered above the bottom margin.
    #[default]
    Bottom,
}

// ============================================================================
// CaptionConfig
// ============================================================================

/// Caption layout parameters.
#[derive(Debug, Clone)]
pub struct CaptionConfig {
    /// Glyph source for the caption text.
    pub font: FontSource,

    /// Fraction of the image width the text must stay strictly under.
    pub max_width_fraction: f32,

    /// Vertical margin as a fraction of the image height.
    pub margin_fraction: f32,
}

impl CaptionConfig {
    /// Creates a config around the given font with default layout fractions.
    pub fn new(font: FontSource) -> Self {
        Self {
            font,
            ..Self::default()
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            font: FontSource::default(),
            max_width_fraction: 0.9,
            margin_fraction: 0.1,
        }
    }
}

// ============================================================================
// Caption stage
// ============================================================================

/// Draws outlined caption text onto a copy of the image.
///
/// Empty text is a no-op. The output always has the source dimensions; text
/// that cannot fit even at size 1 is drawn clipped. A font that fails to
/// render is retried with the builtin font before giving up and passing the
/// image through.
pub fn apply_caption(
    source: &RgbImage,
    text: &str,
    position: CaptionPosition,
    config: &CaptionConfig,
) -> RgbImage {
    if text.is_empty() {
        return source.clone();
    }

    if let Some(captioned) = draw_caption(source, text, position, &config.font, config) {
        return captioned;
    }

    if !config.font.is_builtin() {
        warn!("configured font failed to render the caption, retrying with builtin font");
        if let Some(captioned) = draw_caption(source, text, position, &FontSource::builtin(), config)
        {
            return captioned;
        }
    }

    warn!("caption rendering failed, passing image through");
    source.clone()
}

fn draw_caption(
    source: &RgbImage,
    text: &str,
    position: CaptionPosition,
    font: &FontSource,
    config: &CaptionConfig,
) -> Option<RgbImage> {
    let (width, height) = source.dimensions();
    let width_fraction = config.max_width_fraction.clamp(0.01, 1.0);
    let margin_fraction = config.margin_fraction.clamp(0.0, 0.5);

    let size = fit_size(font, text, width_fraction * width as f32)?;
    let (text_width, text_height) = font.measure_line(text, size)?;

    let x = (width as i32 - text_width as i32) / 2;
    let margin = (margin_fraction * height as f32).round() as i32;
    let y = match position {
        CaptionPosition::Top => margin,
        CaptionPosition::Bottom => height as i32 - margin - text_height as i32,
    };

    let outline = (size / 15).max(1) as i32;
    let dark = font.render_line(text, size, Rgba([0, 0, 0, 255]))?;
    let light = font.render_line(text, size, Rgba([255, 255, 255, 255]))?;

    let mut captioned = source.clone();
    // Solid plus-shaped outline: black at every offset up to the width on
    // each axis, then the fill on top
    for offset in -outline..=outline {
        blend_sprite(&mut captioned, &dark, x + offset, y);
        blend_sprite(&mut captioned, &dark, x, y + offset);
    }
    blend_sprite(&mut captioned, &light, x, y);
    Some(captioned)
}

/// Finds the largest font size whose rendered width stays strictly under
/// `max_width`.
///
/// Galloping doubles the candidate size until it overflows, then bisects the
/// bracket. If the text overflows even at size 1, size 1 is returned and the
/// caller draws it clipped.
fn fit_size(font: &FontSource, text: &str, max_width: f32) -> Option<u32> {
    let fits = |size: u32| -> Option<bool> {
        let (width, _) = font.measure_line(text, size)?;
        Some((width as f32) < max_width)
    };

    if !fits(1)? {
        return Some(1);
    }

    let mut lo = 1;
    let mut hi = 2;
    while hi < MAX_FONT_PX && fits(hi)? {
        lo = hi;
        hi *= 2;
    }
    hi = hi.min(MAX_FONT_PX);
    if fits(hi)? {
        return Some(hi);
    }

    // fits(lo) holds, fits(hi) does not
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if fits(mid)? {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(lo)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gray(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([120, 120, 120]))
    }

    fn changed_rows(before: &RgbImage, after: &RgbImage) -> Vec<u32> {
        let mut rows: Vec<u32> = before
            .enumerate_pixels()
            .zip(after.enumerate_pixels())
            .filter(|((_, _, a), (_, _, b))| a != b)
            .map(|((_, y, _), _)| y)
            .collect();
        rows.dedup();
        rows
    }

    #[test]
    fn empty_text_is_a_no_op() {
        let source = gray(50, 50);
        let captioned = apply_caption(
            &source,
            "",
            CaptionPosition::Bottom,
            &CaptionConfig::default(),
        );
        assert_eq!(captioned, source);
    }

    #[test]
    fn caption_preserves_dimensions_and_marks_the_image() {
        let source = gray(400, 200);
        let captioned = apply_caption(
            &source,
            "hello world",
            CaptionPosition::Bottom,
            &CaptionConfig::default(),
        );
        assert_eq!(captioned.dimensions(), source.dimensions());
        assert_ne!(captioned, source);
    }

    #[test]
    fn top_caption_stays_in_the_upper_band() {
        let source = gray(400, 200);
        let captioned = apply_caption(
            &source,
            "hello world",
            CaptionPosition::Top,
            &CaptionConfig::default(),
        );
        let rows = changed_rows(&source, &captioned);
        assert!(!rows.is_empty());
        assert!(
            rows.iter().all(|&y| y < 60),
            "top caption ink leaked below the upper band: {rows:?}"
        );
    }

    #[test]
    fn bottom_caption_stays_in_the_lower_band() {
        let source = gray(400, 200);
        let captioned = apply_caption(
            &source,
            "hello world",
            CaptionPosition::Bottom,
            &CaptionConfig::default(),
        );
        let rows = changed_rows(&source, &captioned);
        assert!(!rows.is_empty());
        assert!(
            rows.iter().all(|&y| y >= 140),
            "bottom caption ink leaked above the lower band: {rows:?}"
        );
    }

    #[test]
    fn outline_and_fill_are_both_visible() {
        let captioned = apply_caption(
            &gray(400, 200),
            "hello world",
            CaptionPosition::Bottom,
            &CaptionConfig::default(),
        );
        let has_white = captioned.pixels().any(|p| p.0 == [255, 255, 255]);
        let has_black = captioned.pixels().any(|p| p.0 == [0, 0, 0]);
        assert!(has_white, "fill ink missing");
        assert!(has_black, "outline ink missing");
    }

    #[test]
    fn fitted_size_is_maximal() {
        let font = FontSource::builtin();
        let max_width = 0.9 * 400.0;
        let size = fit_size(&font, "hello world", max_width).unwrap();

        let (width, _) = font.measure_line("hello world", size).unwrap();
        assert!((width as f32) < max_width, "chosen size must fit");

        let (next_width, _) = font.measure_line("hello world", size + 1).unwrap();
        assert!(
            next_width as f32 >= max_width,
            "size {size} is not maximal: {next_width} also fits"
        );
    }

    #[test]
    fn narrow_image_clips_at_size_one() {
        let font = FontSource::builtin();
        assert_eq!(fit_size(&font, "mmmm", 3.6), Some(1));

        let source = gray(4, 40);
        let captioned = apply_caption(
            &source,
            "mmmm",
            CaptionPosition::Bottom,
            &CaptionConfig::default(),
        );
        assert_eq!(captioned.dimensions(), (4, 40));
    }

    #[test]
    fn caption_is_deterministic() {
        let source = gray(300, 150);
        let config = CaptionConfig::default();
        let first = apply_caption(&source, "plum", CaptionPosition::Top, &config);
        let second = apply_caption(&source, "plum", CaptionPosition::Top, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn position_uses_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&CaptionPosition::Top).unwrap(), "\"top\"");
        let parsed: CaptionPosition = serde_json::from_str("\"bottom\"").unwrap();
        assert_eq!(parsed, CaptionPosition::Bottom);
        assert_eq!(CaptionPosition::default(), CaptionPosition::Bottom);
    }
}
