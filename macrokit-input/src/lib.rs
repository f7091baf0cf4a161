//! OS-facing seams for the macrokit recording/playback core.
//!
//! This crate owns the three capabilities the core needs from the operating
//! system: receiving raw input transitions ([`RawInputSource`]), injecting
//! logical input actions ([`InputInjector`]), and resolving window identity
//! and geometry ([`WindowResolver`]). The core itself stays OS-agnostic and
//! is driven entirely through these traits.

#![cfg_attr(not(target_os = "windows"), allow(unused))]

pub mod error;
pub mod geometry;
pub mod injector;
pub mod keys;
pub mod platforms;
pub mod source;
pub mod window;

pub use error::{InjectorError, PlatformError};
pub use geometry::{Position, Rect};
pub use injector::{create_injector, InjectionMode, InputInjector, StandardInjector, StealthInjector};
pub use keys::{KeyCode, PointerButton};
pub use platforms::create_resolver;
pub use source::{RawInput, RawInputSource, RdevSource, Subscription};
pub use window::{NullResolver, WindowId, WindowResolver, WindowSnapshot};
