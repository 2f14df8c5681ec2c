//! Typed error kinds for the conversion engine and the AI service boundary.
//!
//! Non-fatal degradations (parse repairs, low-confidence detections, AI
//! fallbacks) travel as [`crate::warnings::Warning`]s; only rendering
//! failures, invalid caller input, and cancellation surface as errors here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// The caller requested an output format outside `{"", "spec", "table"}`.
    #[error("unsupported output format '{0}'")]
    InvalidFormat(String),

    /// The caller named a template that is not in the catalogue.
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    /// The cancellation token fired; no further events or warnings follow.
    #[error("conversion cancelled")]
    Cancelled,

    /// A renderer failed to produce output.
    #[error("rendering failed: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AiError {
    /// Sentinel for "circuit open / transport down".
    #[error("AI mapping service unavailable")]
    Unavailable,

    /// Any other transport-level failure.
    #[error("AI transport error: {0}")]
    Transport(String),

    /// The service answered, but the payload could not be interpreted.
    #[error("invalid AI response: {0}")]
    InvalidResponse(String),

    /// The request was cancelled mid-flight.
    #[error("AI request cancelled")]
    Cancelled,
}

impl From<AiError> for ConvertError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Cancelled => ConvertError::Cancelled,
            other => ConvertError::Render(other.to_string()),
        }
    }
}
