//! Text rasterization for the overlay stages.
//!
//! Overlay text is measured and rendered through a [`FontSource`]. The
//! builtin source rasterizes an embedded 8x8 bitmap font scaled to the
//! requested size and needs no font files, so overlays always have something
//! to draw with. A TrueType source renders through resvg's text machinery for
//! proper glyph shapes; constructing one from unusable font bytes falls back
//! to the builtin source instead of failing.

use std::fmt;
use std::sync::Arc;

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{RgbImage, Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Rect, Transform};
use resvg::usvg::{Options, Tree, fontdb};
use tracing::warn;

/// Pixel height of one glyph cell in the embedded bitmap font.
const BUILTIN_CELL: u32 = 8;

// ============================================================================
// FontSource
// ============================================================================

/// Where overlay text gets its glyphs from.
///
/// # Example
///
/// ```
/// use plum_engine::FontSource;
///
/// // Always available, no font files required
/// let font = FontSource::builtin();
/// assert!(font.is_builtin());
///
/// // Unusable font bytes degrade to the builtin source
/// let font = FontSource::from_font_data(vec![0u8; 16]);
/// assert!(font.is_builtin());
/// ```
#[derive(Debug, Clone, Default)]
pub enum FontSource {
    /// The embedded 8x8 bitmap font, scaled in whole-cell multiples.
    #[default]
    Builtin,

    /// A TrueType face rendered through resvg.
    Truetype(TruetypeFont),
}

impl FontSource {
    /// The embedded bitmap font.
    pub fn builtin() -> Self {
        Self::Builtin
    }

    /// Builds a source from TrueType/OpenType font bytes.
    ///
    /// If no usable face is found in the data, the builtin source is
    /// returned instead so overlays keep working.
    pub fn from_font_data(data: Vec<u8>) -> Self {
        match TruetypeFont::from_bytes(data) {
            Some(font) => Self::Truetype(font),
            None => {
                warn!("font data contains no usable face, using builtin font");
                Self::Builtin
            }
        }
    }

    /// Returns `true` for the embedded bitmap font.
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin)
    }

    /// Returns `true` for a loaded TrueType face.
    pub fn is_truetype(&self) -> bool {
        matches!(self, Self::Truetype(_))
    }

    /// Measures one line of text at the given font size.
    ///
    /// Returns the `(width, height)` in pixels of the sprite
    /// [`render_line`](Self::render_line) would produce, or `None` when the
    /// text has no measurable ink (empty string, or a face that cannot shape
    /// it).
    pub fn measure_line(&self, text: &str, size: u32) -> Option<(u32, u32)> {
        let size = size.max(1);
        match self {
            Self::Builtin => builtin_metrics(text, size),
            Self::Truetype(font) => {
                let (_, bbox) = font.parse_line(text, size, Rgba([0, 0, 0, 255]))?;
                Some(bbox_dimensions(&bbox))
            }
        }
    }

    /// Renders one line of text into a tightly sized RGBA sprite.
    ///
    /// The sprite is transparent where there is no ink and its dimensions
    /// match [`measure_line`](Self::measure_line). Returns `None` when
    /// nothing would be drawn.
    pub fn render_line(&self, text: &str, size: u32, color: Rgba<u8>) -> Option<RgbaImage> {
        let size = size.max(1);
        match self {
            Self::Builtin => render_builtin(text, size, color),
            Self::Truetype(font) => font.render(text, size, color),
        }
    }
}

// ============================================================================
// TruetypeFont
// ============================================================================

/// A font face loaded into an in-memory database for resvg text layout.
#[derive(Clone)]
pub struct TruetypeFont {
    db: Arc<fontdb::Database>,
    family: String,
}

impl TruetypeFont {
    /// Loads the first usable face from raw font bytes.
    pub fn from_bytes(data: Vec<u8>) -> Option<Self> {
        let mut db = fontdb::Database::new();
        db.load_font_data(data);
        let family = db.faces().next()?.families.first()?.0.clone();
        Some(Self {
            db: Arc::new(db),
            family,
        })
    }

    /// The family name reported by the loaded face.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Lays one line out as an SVG `<text>` element and returns the parsed
    /// tree together with the ink bounding box.
    fn parse_line(&self, text: &str, size: u32, color: Rgba<u8>) -> Option<(Tree, Rect)> {
        // Oversized canvas so no glyph is clipped at the viewport; the
        // sprite is cropped to the ink bounding box afterwards.
        let margin = size;
        let canvas_width = size * 2 * (text.chars().count() as u32 + 2);
        let canvas_height = size * 4;
        let svg = format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">"#,
                r##"<text x="{x}" y="{y}" font-family="{family}" font-size="{size}" "##,
                r##"fill="#{red:02x}{green:02x}{blue:02x}" fill-opacity="{opacity:.3}">{text}</text>"##,
                "</svg>"
            ),
            w = canvas_width,
            h = canvas_height,
            x = margin,
            y = margin * 2,
            family = escape_xml(&self.family),
            size = size,
            red = color[0],
            green = color[1],
            blue = color[2],
            opacity = f32::from(color[3]) / 255.0,
            text = escape_xml(text),
        );

        let mut options = Options::default();
        options.font_family = self.family.clone();
        options.fontdb = Arc::clone(&self.db);

        let tree = Tree::from_str(&svg, &options).ok()?;
        let bbox = tree.root().abs_bounding_box();
        if bbox.width() < 1.0 || bbox.height() < 1.0 {
            return None;
        }
        Some((tree, bbox))
    }

    fn render(&self, text: &str, size: u32, color: Rgba<u8>) -> Option<RgbaImage> {
        let (tree, bbox) = self.parse_line(text, size, color)?;
        let (width, height) = bbox_dimensions(&bbox);

        let mut pixmap = Pixmap::new(width, height)?;
        let transform = Transform::from_translate(-bbox.x(), -bbox.y());
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        Some(pixmap_to_rgba_image(&pixmap))
    }
}

impl fmt::Debug for TruetypeFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TruetypeFont")
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

fn bbox_dimensions(bbox: &Rect) -> (u32, u32) {
    let width = (bbox.width().ceil() as u32).max(1);
    let height = (bbox.height().ceil() as u32).max(1);
    (width, height)
}

/// Escapes text for inclusion in SVG markup.
fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

// ============================================================================
// Builtin bitmap font
// ============================================================================

/// Whole-cell scale factor for the builtin font at a requested size.
fn builtin_scale(size: u32) -> u32 {
    (size / BUILTIN_CELL).max(1)
}

fn builtin_metrics(text: &str, size: u32) -> Option<(u32, u32)> {
    let glyphs = text.chars().count() as u32;
    if glyphs == 0 {
        return None;
    }
    let cell = BUILTIN_CELL * builtin_scale(size);
    Some((glyphs * cell, cell))
}

fn render_builtin(text: &str, size: u32, color: Rgba<u8>) -> Option<RgbaImage> {
    let (width, height) = builtin_metrics(text, size)?;
    let scale = builtin_scale(size);
    let cell = BUILTIN_CELL * scale;

    let mut sprite = RgbaImage::new(width, height);
    for (index, ch) in text.chars().enumerate() {
        // Characters outside the covered range draw as '?'
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        let origin_x = index as u32 * cell;
        for (row_index, row) in glyph.iter().enumerate() {
            for bit in 0..BUILTIN_CELL {
                if row & (1 << bit) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = origin_x + bit * scale + dx;
                        let y = row_index as u32 * scale + dy;
                        sprite.put_pixel(x, y, color);
                    }
                }
            }
        }
    }
    Some(sprite)
}

// ============================================================================
// Pixmap conversion
// ============================================================================

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let height = pixmap.height();
    let mut img = RgbaImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let Some(pixel) = pixmap.pixel(x, y) else {
                continue;
            };
            // tiny_skia stores premultiplied alpha
            let (r, g, b, a) =
                unpremultiply(pixel.red(), pixel.green(), pixel.blue(), pixel.alpha());
            img.put_pixel(x, y, Rgba([r, g, b, a]));
        }
    }

    img
}

/// Unpremultiplies a premultiplied alpha pixel.
fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

// ============================================================================
// Compositing
// ============================================================================

/// Blends an RGBA sprite onto an opaque RGB image at the given position.
///
/// Source-over compositing against an opaque background; sprite pixels that
/// fall outside the destination are clipped.
pub(crate) fn blend_sprite(dest: &mut RgbImage, sprite: &RgbaImage, x: i32, y: i32) {
    let dest_width = dest.width() as i32;
    let dest_height = dest.height() as i32;

    for sy in 0..sprite.height() {
        for sx in 0..sprite.width() {
            let dx = x + sx as i32;
            let dy = y + sy as i32;
            if dx < 0 || dy < 0 || dx >= dest_width || dy >= dest_height {
                continue;
            }

            let src = sprite.get_pixel(sx, sy);
            if src[3] == 0 {
                continue;
            }
            let alpha = f32::from(src[3]) / 255.0;
            let dst = dest.get_pixel_mut(dx as u32, dy as u32);
            for channel in 0..3 {
                let blended =
                    f32::from(src[channel]) * alpha + f32::from(dst[channel]) * (1.0 - alpha);
                dst[channel] = blended.round() as u8;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
