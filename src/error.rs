//! Error types surfaced by engine operations.

use thiserror::Error;

/// Errors a transport must handle when driving the engine.
///
/// Only failures that change the outcome of an operation are reported here.
/// Overlay problems (a missing glyph, an unusable font) degrade the rendered
/// output instead of failing it and are logged rather than returned.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The submitted bytes are not a source format the pipeline accepts.
    ///
    /// Only JPEG and PNG sources are processed. `detected` carries the MIME
    /// type of the sniffed format, or `"unknown"` when the bytes match no
    /// known signature.
    #[error("unsupported image format: {detected}")]
    UnsupportedFormat { detected: String },

    /// An adjustment arrived for a chat with no stored session.
    #[error("no active session for this chat")]
    SessionMissing,

    /// The source bytes sniffed as a supported format but failed to decode.
    #[error("failed to decode source image")]
    Decode(#[source] image::ImageError),

    /// Encoding the rendered image failed.
    #[error("failed to encode rendered image")]
    Encode(#[source] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_names_the_detected_type() {
        let err = EngineError::UnsupportedFormat {
            detected: "image/bmp".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported image format: image/bmp");
    }

    #[test]
    fn session_missing_is_self_describing() {
        assert_eq!(
            EngineError::SessionMissing.to_string(),
            "no active session for this chat"
        );
    }
}
