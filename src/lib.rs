//! plum-engine: purple-black photo filter core for chat bots
//!
//! This crate turns photos into a purple-and-black toned rendition and lets
//! each chat fine-tune the look through a small set of discrete adjustment
//! commands. It holds the transport-independent core of a filter bot: a chat
//! frontend feeds photo bytes and button presses in, and sends the returned
//! JPEG/PNG bytes back out.
//!
//! Rendering always starts from the stored original, so repeated adjustments
//! never stack filter passes on top of each other.
//!
//! # Example
//!
//! ```
//! use image::{Rgb, RgbImage};
//! use plum_engine::{AdjustmentCommand, ChatKey, FilterEngine};
//!
//! // A transport would receive these bytes as a photo upload
//! let picture = RgbImage::from_pixel(64, 64, Rgb([180, 40, 200]));
//! let mut source = Vec::new();
//! picture
//!     .write_to(&mut std::io::Cursor::new(&mut source), image::ImageFormat::Png)
//!     .unwrap();
//!
//! let engine = FilterEngine::default();
//! let photo = engine.ingest(ChatKey(1), &source, None).unwrap();
//! assert_eq!(photo.settings.purple, 1.0);
//!
//! // Wire photo.controls() to inline buttons, then apply a press
//! let outcome = engine.adjust(ChatKey(1), AdjustmentCommand::PurpleUp).unwrap();
//! let photo = outcome.into_rendered().unwrap();
//! assert_eq!(photo.settings.purple, 1.5);
//! ```
//!
//! # Captions
//!
//! Captioning is a separate flow that draws auto-sized outlined text over a
//! photo without touching sessions or the tone filter:
//!
//! ```
//! use plum_engine::{CaptionPosition, FilterEngine};
//! # use image::{Rgb, RgbImage};
//! # let mut source = Vec::new();
//! # RgbImage::from_pixel(120, 80, Rgb([90, 90, 90]))
//! #     .write_to(&mut std::io::Cursor::new(&mut source), image::ImageFormat::Png)
//! #     .unwrap();
//!
//! let engine = FilterEngine::default();
//! let png = engine
//!     .caption(&source, "good morning", CaptionPosition::Bottom)
//!     .unwrap();
//! assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
//! ```

mod codec;
mod engine;
mod error;
mod session;
mod settings;
mod stage;

pub use engine::{AdjustOutcome, EngineConfig, FilterEngine, RenderedPhoto};
pub use error::EngineError;
pub use session::{ChatKey, Session, SessionStore};
pub use settings::{AdjustmentCommand, FilterSettings};
pub use stage::{
    CaptionConfig, CaptionPosition, FontSource, TruetypeFont, WatermarkConfig, apply_caption,
    apply_tone, apply_watermark,
};
