use crate::error::PlatformError;
use crate::window::WindowResolver;
use std::sync::Arc;

#[cfg(target_os = "windows")]
pub mod windows;

/// Create the window resolver for the current platform.
pub fn create_resolver() -> Result<Arc<dyn WindowResolver>, PlatformError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::WindowsResolver::new()))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Err(PlatformError::Unsupported(
            "window resolution is only implemented on Windows".to_string(),
        ))
    }
}
