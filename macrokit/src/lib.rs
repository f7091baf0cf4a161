//! Desktop macro recording and playback.
//!
//! This crate captures user input (keyboard, pointer, wheel) into a
//! serializable timeline and replays it later with faithful timing. The
//! pieces that touch the OS live in `macrokit-input` behind small traits;
//! everything here is platform-neutral and testable against mocks.
//!
//! # Overview
//!
//! - [`MacroRecorder`] subscribes to raw input and normalizes it into a
//!   [`MacroSequence`]: press/release transitions, explicit delay events
//!   for the gaps, and optional window-relative pointer coordinates.
//! - [`MacroSequence`] round-trips through JSON, so recordings survive
//!   restarts and travel between machines.
//! - [`MacroPlayer`] replays a sequence on a worker thread with speed
//!   scaling, optional timing jitter, repeat policies and cancellation on
//!   foreign input.
//!
//! # Example
//!
//! ```no_run
//! use macrokit::{MacroPlayer, MacroRecorder, PlaybackOptions, RecorderConfig};
//! use macrokit_input::{create_resolver, RdevSource};
//! use std::sync::Arc;
//!
//! # fn main() -> macrokit::Result<()> {
//! let source = Arc::new(RdevSource::new());
//! let resolver = create_resolver()?;
//!
//! let mut recorder = MacroRecorder::new(source.clone(), resolver.clone());
//! recorder.start("demo", RecorderConfig::default())?;
//! std::thread::sleep(std::time::Duration::from_secs(5));
//! let sequence = recorder.stop();
//!
//! let mut player = MacroPlayer::new(source, resolver);
//! player.play(&sequence, PlaybackOptions::default())?;
//! player.wait()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
pub mod player;
pub mod recorder;


pub use error::{MacroError, Result};
pub use events::{EventKind, InputEvent, MacroSequence, RecordingMode, WindowContext};
pub use player::{
    MacroPlayer, PlaybackMode, PlaybackOptions, PlayerState, MAX_SPEED, MIN_SPEED,
};
pub use recorder::{MacroRecorder, RecorderConfig, RecorderState};
