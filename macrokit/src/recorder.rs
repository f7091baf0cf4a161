//! Macro recording.
//!
//! The recorder subscribes to the raw input notification source, normalizes
//! each transition (dedup, delay synthesis, window context) and appends it
//! to the session buffer. Raw callbacks arrive on the source's own thread
//! and only cross a channel; all session mutation happens on the recorder's
//! consumer thread under the session mutex.

use crate::error::{MacroError, Result};
use crate::events::{EventKind, InputEvent, MacroSequence, RecordingMode, WindowContext};
use macrokit_input::{
    KeyCode, PointerButton, RawInput, RawInputSource, WindowId, WindowResolver,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// How often the consumer thread re-checks its stop/pause flags while the
/// source is idle.
const SOURCE_POLL: Duration = Duration::from_millis(50);

/// Configuration for a recording session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Whether to record pointer events.
    pub record_mouse: bool,

    /// Whether to record keyboard events.
    pub record_keyboard: bool,

    /// Whether to synthesize explicit delay events for gaps between inputs.
    pub record_delays: bool,

    /// Gaps shorter than this are not materialized as delay events.
    pub min_delay: Duration,

    /// Coordinate mode.
    pub mode: RecordingMode,

    /// Explicit target window for window-relative recording; when absent the
    /// currently focused window is used per event.
    pub target_window: Option<WindowId>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            record_mouse: true,
            record_keyboard: true,
            record_delays: true,
            min_delay: Duration::from_millis(10),
            mode: RecordingMode::WindowRelative,
            target_window: None,
        }
    }
}

/// Recorder lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Stopped,
    Recording,
    Paused,
}

/// Live state of one recording: the growing event buffer plus the transient
/// bookkeeping (clock segments, pressed keys/buttons) that never outlives
/// the session.
pub(crate) struct RecordingSession {
    config: RecorderConfig,
    sequence: MacroSequence,
    /// Recorded time accumulated before the current clock segment (grows on
    /// pause so timestamps stay continuous across pauses).
    elapsed_base: Duration,
    segment_start: Instant,
    last_event_at: Instant,
    pressed_keys: HashSet<KeyCode>,
    pressed_buttons: HashSet<PointerButton>,
}

impl RecordingSession {
    pub(crate) fn new(name: &str, config: RecorderConfig, now: Instant) -> Self {
        Self {
            config,
            sequence: MacroSequence::new(name, config.mode),
            elapsed_base: Duration::ZERO,
            segment_start: now,
            last_event_at: now,
            pressed_keys: HashSet::new(),
            pressed_buttons: HashSet::new(),
        }
    }

    fn elapsed(&self, now: Instant) -> Duration {
        self.elapsed_base + now.duration_since(self.segment_start)
    }

    /// Freeze the session clock. Intake is gated by the recorder while
    /// paused, so no events land in between.
    pub(crate) fn pause(&mut self, now: Instant) {
        self.elapsed_base += now.duration_since(self.segment_start);
        self.segment_start = now;
    }

    /// Rebase the clock after a pause so the next delta excludes the paused
    /// duration.
    pub(crate) fn resume(&mut self, now: Instant) {
        self.segment_start = now;
        self.last_event_at = now;
    }

    /// Normalize one raw transition and append it (and any synthesized delay)
    /// to the buffer. Returns the appended substantive event, or `None` when
    /// the transition was filtered out.
    pub(crate) fn ingest(
        &mut self,
        raw: RawInput,
        now: Instant,
        resolver: &dyn WindowResolver,
    ) -> Option<InputEvent> {
        let kind = match raw {
            RawInput::Key { .. } if !self.config.record_keyboard => return None,
            RawInput::Button { .. } | RawInput::Move { .. } | RawInput::Wheel { .. }
                if !self.config.record_mouse =>
            {
                return None
            }
            RawInput::Key { code, pressed } => {
                // Idempotent input state: OS key repeat floods press
                // notifications for a held key; only the first one counts.
                if pressed && !self.pressed_keys.insert(code) {
                    return None;
                }
                if !pressed && !self.pressed_keys.remove(&code) {
                    return None;
                }
                EventKind::Key { code, pressed }
            }
            RawInput::Button { button, pressed, x, y } => {
                if pressed && !self.pressed_buttons.insert(button) {
                    return None;
                }
                if !pressed && !self.pressed_buttons.remove(&button) {
                    return None;
                }
                EventKind::PointerButton { button, pressed, x, y }
            }
            RawInput::Move { x, y } => EventKind::PointerMove { x, y, rel: None },
            RawInput::Wheel { delta_x, delta_y } => EventKind::Wheel { delta_x, delta_y },
        };

        let timestamp = self.elapsed(now);
        let delta = now.duration_since(self.last_event_at);
        if self.config.record_delays && delta >= self.config.min_delay {
            self.sequence.push(InputEvent {
                timestamp,
                kind: EventKind::Delay { duration: delta },
                window: None,
            });
        }

        let mut kind = kind;
        let mut window = None;
        if self.config.mode == RecordingMode::WindowRelative && kind.is_pointer() {
            // Resolver misses degrade this one event to screen-absolute
            // coordinates; they never abort the recording.
            let snapshot = self
                .config
                .target_window
                .and_then(|handle| resolver.resolve_by_handle(handle))
                .or_else(|| resolver.focused_window());
            if let Some(snapshot) = snapshot {
                if let EventKind::PointerMove { x, y, ref mut rel } = kind {
                    *rel = snapshot.rect.relative_of(x, y);
                }
                window = Some(WindowContext {
                    title: snapshot.title,
                    rect: snapshot.rect,
                });
            }
        }

        let event = InputEvent { timestamp, kind, window };
        self.sequence.push(event.clone());
        self.last_event_at = now;
        Some(event)
    }

    /// Consume the session, clearing transient press tracking and handing
    /// the finished buffer to the caller.
    pub(crate) fn finish(&mut self) -> MacroSequence {
        self.pressed_keys.clear();
        self.pressed_buttons.clear();
        std::mem::replace(
            &mut self.sequence,
            MacroSequence::new("", self.config.mode),
        )
    }

    #[cfg(test)]
    pub(crate) fn events(&self) -> &[InputEvent] {
        &self.sequence.events
    }
}

struct ActiveRecording {
    session: Arc<Mutex<RecordingSession>>,
    stop: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

/// Records user input into a [`MacroSequence`].
///
/// Explicitly constructed and owned by the caller; at most one recording is
/// active per instance, enforced by a state check rather than any global.
pub struct MacroRecorder {
    source: Arc<dyn RawInputSource>,
    resolver: Arc<dyn WindowResolver>,
    state: RecorderState,
    active: Option<ActiveRecording>,
    event_tx: broadcast::Sender<InputEvent>,
}

impl MacroRecorder {
    pub fn new(source: Arc<dyn RawInputSource>, resolver: Arc<dyn WindowResolver>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            source,
            resolver,
            state: RecorderState::Stopped,
            active: None,
            event_tx,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Live tap of recorded events, for progress display or scripting.
    pub fn event_stream(&self) -> impl Stream<Item = InputEvent> {
        let mut rx = self.event_tx.subscribe();
        Box::pin(async_stream::stream! {
            while let Ok(event) = rx.recv().await {
                yield event;
            }
        })
    }

    /// Begin recording. Fails with [`MacroError::AlreadyActive`] unless the
    /// recorder is stopped; the previous buffer is gone once this returns.
    pub fn start(&mut self, name: &str, config: RecorderConfig) -> Result<()> {
        if self.state != RecorderState::Stopped {
            return Err(MacroError::AlreadyActive);
        }

        info!(name, ?config.mode, "starting macro recording");
        let session = Arc::new(Mutex::new(RecordingSession::new(name, config, Instant::now())));
        let stop = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));

        let subscription = self.source.subscribe();
        let worker = {
            let session = Arc::clone(&session);
            let stop = Arc::clone(&stop);
            let paused = Arc::clone(&paused);
            let resolver = Arc::clone(&self.resolver);
            let event_tx = self.event_tx.clone();
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    let Some(raw) = subscription.recv_timeout(SOURCE_POLL) else {
                        continue;
                    };
                    if paused.load(Ordering::SeqCst) {
                        continue;
                    }
                    let now = Instant::now();
                    let recorded = match session.lock() {
                        Ok(mut session) => session.ingest(raw, now, resolver.as_ref()),
                        Err(_) => {
                            warn!("recording session lock poisoned, dropping event");
                            None
                        }
                    };
                    if let Some(event) = recorded {
                        // No receivers is fine; the tap is optional.
                        let _ = event_tx.send(event);
                    }
                }
                debug!("recording consumer thread finished");
            })
        };

        self.active = Some(ActiveRecording {
            session,
            stop,
            paused,
            worker: Some(worker),
        });
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Pause intake without discarding buffered events. Returns `false` from
    /// any state other than `Recording`.
    pub fn pause(&mut self) -> bool {
        if self.state != RecorderState::Recording {
            return false;
        }
        let Some(active) = &self.active else { return false };
        if let Ok(mut session) = active.session.lock() {
            session.pause(Instant::now());
        }
        active.paused.store(true, Ordering::SeqCst);
        self.state = RecorderState::Paused;
        info!("recording paused");
        true
    }

    /// Resume intake, rebasing the session clock so recorded timestamps stay
    /// continuous. Returns `false` from any state other than `Paused`.
    pub fn resume(&mut self) -> bool {
        if self.state != RecorderState::Paused {
            return false;
        }
        let Some(active) = &self.active else { return false };
        if let Ok(mut session) = active.session.lock() {
            session.resume(Instant::now());
        }
        active.paused.store(false, Ordering::SeqCst);
        self.state = RecorderState::Recording;
        info!("recording resumed");
        true
    }

    /// Stop recording and take ownership of the finished sequence.
    ///
    /// Calling this while stopped is a no-op returning an empty sequence.
    pub fn stop(&mut self) -> MacroSequence {
        let Some(mut active) = self.active.take() else {
            return MacroSequence::new("", RecordingMode::Screen);
        };

        active.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = active.worker.take() {
            let _ = worker.join();
        }
        self.state = RecorderState::Stopped;

        let sequence = match active.session.lock() {
            Ok(mut session) => session.finish(),
            Err(poisoned) => poisoned.into_inner().finish(),
        };
        info!(events = sequence.len(), "recording stopped");
        sequence
    }
}

impl Drop for MacroRecorder {
    fn drop(&mut self) {
        if self.state != RecorderState::Stopped {
            let _ = self.stop();
        }
    }
}
