//! Branding bar appended below the image.
//!
//! The watermark never draws over the picture itself. A black bar is added
//! under the full width of the image and the configured text is centered in
//! it, so the output grows taller by the bar height. Rendering problems
//! degrade softly: the stage logs a warning and passes the image through
//! without a bar.

use image::{GenericImage, Rgb, RgbImage, Rgba};
use tracing::warn;

use super::text::{FontSource, blend_sprite};

// ============================================================================
// WatermarkConfig
// ============================================================================

/// Appearance of the watermark bar.
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    /// Text centered inside the bar. Empty text draws the bar alone.
    pub text: String,

    /// Height of the appended bar in pixels.
    pub bar_height: u32,

    /// Font size for the bar text in pixels.
    pub font_size: u32,

    /// Glyph source for the bar text.
    pub font: FontSource,
}

impl WatermarkConfig {
    /// Creates a config with the given text and default geometry.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: "made with plum".to_string(),
            bar_height: 40,
            font_size: 16,
            font: FontSource::default(),
        }
    }
}

// ============================================================================
// Watermark stage
// ============================================================================

/// Appends the watermark bar below the image.
///
/// The output is `bar_height` taller than the source. Text wider than the
/// image clips at the edges rather than resizing the bar. If the text cannot
/// be rendered the source is returned unchanged, without a bar.
pub fn apply_watermark(source: &RgbImage, config: &WatermarkConfig) -> RgbImage {
    match render_bar(source, config) {
        Some(framed) => framed,
        None => {
            warn!("watermark rendering failed, passing image through");
            source.clone()
        }
    }
}

fn render_bar(source: &RgbImage, config: &WatermarkConfig) -> Option<RgbImage> {
    // Render the text before allocating, so a failure leaves no half-framed
    // output behind.
    let sprite = if config.text.is_empty() {
        None
    } else {
        Some(
            config
                .font
                .render_line(&config.text, config.font_size, Rgba([255, 255, 255, 255]))?,
        )
    };

    let (width, height) = source.dimensions();
    let mut framed = RgbImage::from_pixel(width, height + config.bar_height, Rgb([0, 0, 0]));
    framed.copy_from(source, 0, 0).ok()?;

    if let Some(sprite) = sprite {
        let x = (width as i32 - sprite.width() as i32) / 2;
        let y = height as i32 + (config.bar_height as i32 - sprite.height() as i32) / 2;
        blend_sprite(&mut framed, &sprite, x, y);
    }

    Some(framed)
}

// ============================================================================
// Tests
// ============================================================================
