use macrokit_input::{InjectorError, PlatformError};
use thiserror::Error;

/// Error types for macro recording and playback.
#[derive(Debug, Error)]
pub enum MacroError {
    /// A recording or playback session is already running.
    #[error("another session is already active")]
    AlreadyActive,

    /// Playback was requested for a sequence with no events.
    #[error("cannot play an empty sequence")]
    EmptySequence,

    /// Counted playback was requested with a repeat count below 1.
    #[error("repeat count must be at least 1, got {0}")]
    InvalidRepeatCount(u32),

    /// Stealth injection was requested but the backend cannot initialize.
    #[error("stealth injection backend is unavailable")]
    StealthUnavailable,

    /// Error from the platform window layer.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Error from the input injection backend.
    #[error("injector error: {0}")]
    Injector(#[from] InjectorError),

    /// Error when serializing or deserializing a sequence.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for macro operations.
pub type Result<T> = std::result::Result<T, MacroError>;
