//! Input injection capability.
//!
//! Two backends share one contract: the standard OS input API path and a
//! low-level scan-code path ("stealth"). Callers select a backend once via
//! [`create_injector`] and stay agnostic to which one is active.

use crate::error::InjectorError;
use crate::keys::{KeyCode, PointerButton};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

mod standard;
mod stealth;

pub use standard::StandardInjector;
pub use stealth::StealthInjector;

/// Which injection backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InjectionMode {
    #[default]
    Standard,
    Stealth,
}

/// Performs OS-level injection of logical input actions.
pub trait InputInjector: Send + Sync {
    fn inject_key(&self, code: KeyCode, pressed: bool) -> Result<(), InjectorError>;
    fn inject_pointer_move(&self, x: i32, y: i32) -> Result<(), InjectorError>;
    fn inject_pointer_button(&self, button: PointerButton, pressed: bool) -> Result<(), InjectorError>;
    fn inject_wheel(&self, delta_x: i32, delta_y: i32) -> Result<(), InjectorError>;
}

/// Build the injector for the requested mode.
///
/// Fails with [`InjectorError::StealthUnavailable`] when the stealth backend
/// cannot initialize, leaving no partial state behind.
pub fn create_injector(mode: InjectionMode) -> Result<Arc<dyn InputInjector>, InjectorError> {
    match mode {
        InjectionMode::Standard => Ok(Arc::new(StandardInjector::new())),
        InjectionMode::Stealth => Ok(Arc::new(StealthInjector::new()?)),
    }
}
