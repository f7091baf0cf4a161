use thiserror::Error;

/// Errors surfaced by input injection backends.
#[derive(Debug, Error)]
pub enum InjectorError {
    /// The low-level injection backend cannot be initialized on this system.
    #[error("stealth injection backend is unavailable")]
    StealthUnavailable,

    /// No injectable mapping exists for the given virtual-key code.
    #[error("no injectable mapping for key code {0:#04x}")]
    UnsupportedKey(u32),

    /// The OS rejected or failed the injection call.
    #[error("input injection failed: {0}")]
    Injection(String),
}

/// Errors raised when constructing platform-backed collaborators.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("unsupported platform: {0}")]
    Unsupported(String),
}
