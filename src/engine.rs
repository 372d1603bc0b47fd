//! The engine driving ingest, adjustment, and captioning.
//!
//! [`FilterEngine`] is the one type a chat transport talks to. It owns the
//! session store and the pipeline configuration; handlers translate incoming
//! photos and button presses into [`ingest`](FilterEngine::ingest) and
//! [`adjust`](FilterEngine::adjust) calls and send the returned bytes back.
//! All methods take `&self` and are safe to call from concurrent handler
//! tasks.

use image::RgbImage;
use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::error::EngineError;
use crate::session::{ChatKey, Session, SessionStore};
use crate::settings::{AdjustmentCommand, FilterSettings};
use crate::stage::{
    CaptionConfig, CaptionPosition, WatermarkConfig, apply_caption, apply_tone, apply_watermark,
};

// ============================================================================
// EngineConfig
// ============================================================================

/// Everything the engine needs at construction time.
///
/// There is no ambient configuration; a transport builds one of these at
/// startup and hands it to [`FilterEngine::new`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Longest image side kept after ingest; larger photos are downscaled.
    /// 0 disables the downscale.
    pub max_dimension: u32,

    /// JPEG quality for rendered photos (1-100).
    pub jpeg_quality: u8,

    /// Sessions kept before the least recently used chat is evicted.
    /// 0 keeps every session.
    pub session_capacity: usize,

    /// Watermark bar appearance.
    pub watermark: WatermarkConfig,

    /// Caption layout and font.
    pub caption: CaptionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1280,
            jpeg_quality: 75,
            session_capacity: SessionStore::DEFAULT_CAPACITY,
            watermark: WatermarkConfig::default(),
            caption: CaptionConfig::default(),
        }
    }
}

// ============================================================================
// RenderedPhoto
// ============================================================================

/// A filtered photo ready to send back to the chat.
#[derive(Debug, Clone)]
pub struct RenderedPhoto {
    /// JPEG-encoded output, watermark bar included.
    pub jpeg: Vec<u8>,

    /// The settings this render used.
    pub settings: FilterSettings,
}

impl RenderedPhoto {
    /// The adjustment controls a transport should attach to this photo,
    /// in button layout order.
    pub fn controls(&self) -> [AdjustmentCommand; 6] {
        AdjustmentCommand::ALL
    }
}

/// Outcome of an adjustment request.
#[derive(Debug, Clone)]
pub enum AdjustOutcome {
    /// The settings moved and a fresh render is attached.
    Rendered(RenderedPhoto),

    /// The command pushed against a boundary already at its limit; nothing
    /// was re-rendered and the stored settings are untouched.
    NoChange,
}

impl AdjustOutcome {
    /// Returns `true` for the boundary no-op outcome.
    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange)
    }

    /// Unwraps the rendered photo, if the settings moved.
    pub fn into_rendered(self) -> Option<RenderedPhoto> {
        match self {
            Self::Rendered(photo) => Some(photo),
            Self::NoChange => None,
        }
    }
}

// ============================================================================
// FilterEngine
// ============================================================================

/// Applies the purple-black filter to ingested photos and re-renders them on
/// demand as users adjust the parameters.
pub struct FilterEngine {
    config: EngineConfig,
    sessions: SessionStore,
}

impl FilterEngine {
    /// Creates an engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let sessions = SessionStore::new(config.session_capacity);
        Self { config, sessions }
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ingests a photo for a chat and renders it at default settings.
    ///
    /// A declared MIME type, when the transport knows one, is checked first
    /// so obvious non-photos are refused before any decoding; the sniffed
    /// byte format stays authoritative either way. On success the downscaled
    /// original becomes the chat's session, replacing any previous one. On
    /// failure no session is created or replaced.
    #[instrument(skip_all, fields(chat = key.0))]
    pub fn ingest(
        &self,
        key: ChatKey,
        bytes: &[u8],
        declared_mime: Option<&str>,
    ) -> Result<RenderedPhoto, EngineError> {
        if let Some(mime) = declared_mime {
            if !matches!(mime, "image/jpeg" | "image/png") {
                warn!(mime, "declared type refused before decoding");
                return Err(EngineError::UnsupportedFormat {
                    detected: mime.to_string(),
                });
            }
        }

        let decoded = codec::decode_source(bytes)?;
        let original = codec::downscale_to_fit(decoded, self.config.max_dimension);
        let settings = FilterSettings::default();
        let jpeg = self.render(&original, settings)?;

        info!(
            width = original.width(),
            height = original.height(),
            "photo ingested"
        );
        // The session appears only once a render has actually been produced
        self.sessions.insert(key, Session::new(original));
        Ok(RenderedPhoto { jpeg, settings })
    }

    /// Applies one adjustment command to the chat's session.
    ///
    /// Renders from the session's untouched original, so adjustments never
    /// stack filter passes. A command that cannot move its parameter returns
    /// [`AdjustOutcome::NoChange`] without rendering. The stored settings are
    /// replaced only after a successful render; any failure leaves the
    /// session exactly as it was.
    #[instrument(skip_all, fields(chat = key.0, command = command.callback_data()))]
    pub fn adjust(
        &self,
        key: ChatKey,
        command: AdjustmentCommand,
    ) -> Result<AdjustOutcome, EngineError> {
        self.sessions
            .with_session(key, |session| {
                let next = command.apply_to(session.settings);
                if next == session.settings {
                    debug!("settings unchanged, skipping render");
                    return Ok(AdjustOutcome::NoChange);
                }

                let jpeg = self.render(&session.original, next)?;
                session.settings = next;
                info!(
                    purple = next.purple,
                    black = next.black,
                    contrast = next.contrast,
                    "adjustment rendered"
                );
                Ok(AdjustOutcome::Rendered(RenderedPhoto {
                    jpeg,
                    settings: next,
                }))
            })
            .ok_or(EngineError::SessionMissing)?
    }

    /// Draws an outlined caption on a photo and returns it as PNG.
    ///
    /// Captioning is independent of sessions and the tone pipeline: the
    /// image keeps its dimensions, gains no watermark bar, and nothing is
    /// stored. Empty text returns the re-encoded image unchanged.
    #[instrument(skip_all, fields(position = ?position))]
    pub fn caption(
        &self,
        bytes: &[u8],
        text: &str,
        position: CaptionPosition,
    ) -> Result<Vec<u8>, EngineError> {
        let decoded = codec::decode_source(bytes)?;
        let captioned = apply_caption(&decoded, text, position, &self.config.caption);
        codec::encode_png(&captioned)
    }

    /// Returns `true` if the chat currently has an adjustable session.
    pub fn has_session(&self, key: ChatKey) -> bool {
        self.sessions.contains(key)
    }

    /// Settings of the chat's last delivered render, if a session exists.
    pub fn session_settings(&self, key: ChatKey) -> Option<FilterSettings> {
        self.sessions.with_session(key, |session| session.settings)
    }

    /// Number of chats with a live session.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drops the chat's session. Returns `true` if one existed.
    pub fn remove_session(&self, key: ChatKey) -> bool {
        let removed = self.sessions.remove(key);
        if removed {
            debug!(chat = key.0, "session removed");
        }
        removed
    }

    /// Runs the full render pipeline: tone curve, watermark bar, JPEG.
    fn render(&self, original: &RgbImage, settings: FilterSettings) -> Result<Vec<u8>, EngineError> {
        let toned = apply_tone(original, settings);
        let framed = apply_watermark(&toned, &self.config.watermark);
        codec::encode_jpeg(&framed, self.config.jpeg_quality.clamp(1, 100))
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

// ============================================================================
// Tests
// ============================================================================
