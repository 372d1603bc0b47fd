//! Rendering stages of the filter pipeline.
//!
//! Each stage is a pure function from an image plus parameters to a new
//! image, which keeps re-rendering a stored session trivial. The engine
//! composes them in a fixed order:
//!
//! - [`tone`] applies the purple-black tone curve
//! - [`watermark`] appends the branding bar below the result
//! - [`caption`] draws outlined text over an image, independent of the filter
//!
//! Overlay stages share their glyph handling through [`text`], which also
//! hosts the sprite compositor both overlays draw with.

pub mod caption;
pub mod text;
pub mod tone;
pub mod watermark;

pub use caption::{CaptionConfig, CaptionPosition, apply_caption};
pub use text::{FontSource, TruetypeFont};
pub use tone::apply_tone;
pub use watermark::{WatermarkConfig, apply_watermark};
