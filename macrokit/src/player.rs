//! Macro playback.
//!
//! Playback runs on a dedicated worker thread so callers stay responsive;
//! cancellation is cooperative through sliced waits. A sequence is replayed
//! from its own timeline: every event carries its offset from recording
//! start, and the worker schedules against that offset scaled by the speed
//! factor, so drift never accumulates across a pass.

use crate::error::{MacroError, Result};
use crate::events::{EventKind, InputEvent, MacroSequence};
use macrokit_input::{
    create_injector, InjectionMode, InjectorError, InputInjector, KeyCode, PointerButton,
    Position, RawInput, RawInputSource, WindowId, WindowResolver,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Slowest permitted speed factor.
pub const MIN_SPEED: f64 = 0.1;
/// Fastest permitted speed factor.
pub const MAX_SPEED: f64 = 10.0;

/// Longest uninterruptible wait slice. Cancellation and pause are observed
/// at least this often, even mid-delay.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Injection failures tolerated in a row before the pass is aborted.
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// How long a noted self-injected transition stays eligible to absorb the
/// matching hook callback.
const ECHO_HORIZON: Duration = Duration::from_millis(500);

/// Repeat policy for one playback run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackMode {
    /// One pass, then stop.
    #[default]
    Once,
    /// Repeat until stopped or cancelled.
    Loop,
    /// Repeat a fixed number of passes.
    Count,
}

/// Options for one playback run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlaybackOptions {
    pub mode: PlaybackMode,

    /// Number of passes when `mode` is [`PlaybackMode::Count`]. Must be at
    /// least 1; ignored otherwise.
    pub repeat_count: u32,

    /// Speed factor; clamped to `[MIN_SPEED, MAX_SPEED]` before use.
    pub speed: f64,

    /// Apply a random jitter to every computed wait.
    pub randomize_delays: bool,

    /// Jitter amplitude as a fraction of the wait; clamped to `[0, 1]`.
    pub random_factor: f64,

    /// Cancel playback when input not injected by the player is observed.
    pub stop_on_input: bool,

    /// Put the cursor back where it was before playback started.
    pub restore_cursor: bool,

    /// Inject through the stealth backend instead of the standard one.
    pub use_stealth: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            mode: PlaybackMode::Once,
            repeat_count: 1,
            speed: 1.0,
            randomize_delays: false,
            random_factor: 0.2,
            stop_on_input: true,
            restore_cursor: true,
            use_stealth: false,
        }
    }
}

impl PlaybackOptions {
    /// Copy with out-of-range knobs pulled back into their documented
    /// ranges. Out-of-range values are usable, never an error.
    pub fn clamped(self) -> Self {
        Self {
            speed: self.speed.clamp(MIN_SPEED, MAX_SPEED),
            random_factor: self.random_factor.clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Player lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
}

/// Wait before `timestamp` on a timeline replayed at `speed`.
pub(crate) fn scaled_wait(timestamp: Duration, speed: f64) -> Duration {
    timestamp.div_f64(speed.clamp(MIN_SPEED, MAX_SPEED))
}

/// Apply jitter of up to `factor` of the wait in either direction, floored
/// at zero.
pub(crate) fn jittered(wait: Duration, factor: f64, rng: &mut impl Rng) -> Duration {
    if factor <= 0.0 {
        return wait;
    }
    let scale = 1.0 + rng.gen_range(-factor..=factor);
    if scale <= 0.0 {
        return Duration::ZERO;
    }
    wait.mul_f64(scale)
}

/// Identity of a transition for echo matching. Pointer moves and wheel
/// ticks are matched by kind only; their coordinates may be quantized by
/// the OS between injection and the hook callback.
#[derive(Debug, Clone, Copy, PartialEq)]
enum EchoKey {
    Key(KeyCode, bool),
    Button(PointerButton, bool),
    Move,
    Wheel,
}

impl From<RawInput> for EchoKey {
    fn from(raw: RawInput) -> Self {
        match raw {
            RawInput::Key { code, pressed } => EchoKey::Key(code, pressed),
            RawInput::Button { button, pressed, .. } => EchoKey::Button(button, pressed),
            RawInput::Move { .. } => EchoKey::Move,
            RawInput::Wheel { .. } => EchoKey::Wheel,
        }
    }
}

/// Distinguishes the player's own injected input from the user's.
///
/// The worker notes each transition just before injecting it; the input
/// watcher absorbs the matching hook callback instead of treating it as
/// foreign. Entries expire after [`ECHO_HORIZON`] so a dropped callback
/// cannot absorb a later genuine keystroke.
struct EchoFilter {
    recent: Mutex<VecDeque<(EchoKey, Instant)>>,
}

impl EchoFilter {
    fn new() -> Self {
        Self {
            recent: Mutex::new(VecDeque::new()),
        }
    }

    fn note(&self, key: EchoKey) {
        if let Ok(mut recent) = self.recent.lock() {
            let now = Instant::now();
            recent.retain(|(_, at)| now.duration_since(*at) < ECHO_HORIZON);
            recent.push_back((key, now));
        }
    }

    /// Consume one pending self-injection matching `raw`. Returns `false`
    /// when the transition is foreign.
    fn absorb(&self, raw: RawInput) -> bool {
        let key = EchoKey::from(raw);
        let Ok(mut recent) = self.recent.lock() else {
            return false;
        };
        let now = Instant::now();
        recent.retain(|(_, at)| now.duration_since(*at) < ECHO_HORIZON);
        if let Some(index) = recent.iter().position(|(noted, _)| *noted == key) {
            recent.remove(index);
            true
        } else {
            false
        }
    }
}

struct PlayerShared {
    cancel: AtomicBool,
    paused: AtomicBool,
    state: Mutex<PlayerState>,
}

impl PlayerShared {
    fn state(&self) -> PlayerState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: PlayerState) {
        match self.state.lock() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

/// One playback run, confined to the worker thread.
struct Playback {
    events: Vec<InputEvent>,
    options: PlaybackOptions,
    injector: Arc<dyn InputInjector>,
    resolver: Arc<dyn WindowResolver>,
    echo: Arc<EchoFilter>,
    shared: Arc<PlayerShared>,
    started: Instant,
    pressed_keys: HashSet<KeyCode>,
    pressed_buttons: HashSet<PointerButton>,
    /// Window last brought to front, to avoid re-activating per event.
    activated: Option<WindowId>,
    restore_to: Option<Position>,
}

impl Playback {
    fn cancelled(&self) -> bool {
        self.shared.cancel.load(Ordering::SeqCst)
    }

    /// Sleep until the given wait has elapsed, in slices, honoring pause
    /// and cancellation. Returns `false` when cancelled mid-wait.
    fn wait(&mut self, wait: Duration) -> bool {
        let mut deadline = Instant::now() + wait;
        loop {
            if self.cancelled() {
                return false;
            }
            if self.shared.paused.load(Ordering::SeqCst) {
                let pause_begin = Instant::now();
                while self.shared.paused.load(Ordering::SeqCst) {
                    if self.cancelled() {
                        return false;
                    }
                    std::thread::sleep(WAIT_SLICE);
                }
                // Shift the pass origin and the pending deadline forward so
                // paused time does not count against the timeline.
                let paused_for = pause_begin.elapsed();
                self.started += paused_for;
                deadline += paused_for;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(WAIT_SLICE));
        }
    }

    fn run(&mut self) -> Result<()> {
        let mut rng = rand::thread_rng();
        let mut passes: u32 = 0;
        let mut consecutive_failures: u32 = 0;
        self.started = Instant::now();

        'passes: loop {
            for index in 0..self.events.len() {
                if self.cancelled() {
                    info!("playback cancelled");
                    return Ok(());
                }

                let event = self.events[index].clone();
                let target = scaled_wait(event.timestamp, self.options.speed);
                let elapsed = self.started.elapsed();
                let mut wait = target.saturating_sub(elapsed);
                if self.options.randomize_delays {
                    wait = jittered(wait, self.options.random_factor, &mut rng);
                }
                if !self.wait(wait) {
                    info!("playback cancelled");
                    return Ok(());
                }

                match self.dispatch(&event) {
                    Ok(()) => consecutive_failures = 0,
                    Err(e) => {
                        consecutive_failures += 1;
                        warn!(
                            failures = consecutive_failures,
                            "input injection failed: {e}"
                        );
                        if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                            return Err(MacroError::Injector(e));
                        }
                    }
                }
            }

            passes += 1;
            match self.options.mode {
                PlaybackMode::Once => break 'passes,
                PlaybackMode::Count if passes >= self.options.repeat_count => break 'passes,
                PlaybackMode::Count | PlaybackMode::Loop => {
                    debug!(passes, "pass finished, repeating");
                    self.started = Instant::now();
                }
            }
        }

        info!(passes, "playback finished");
        Ok(())
    }

    /// Re-locate the event's context window by title and realize the
    /// pointer position against its current rectangle. A miss degrades to
    /// the recorded absolute coordinates.
    fn realize_position(&mut self, event: &InputEvent, x: i32, y: i32) -> Position {
        let Some(context) = &event.window else {
            return Position { x, y };
        };
        let Some(snapshot) = self.resolver.resolve_by_title(&context.title) else {
            debug!(title = %context.title, "context window not found, using absolute coordinates");
            return Position { x, y };
        };
        if self.activated != Some(snapshot.id) {
            if self.resolver.bring_to_front(snapshot.id) {
                self.activated = Some(snapshot.id);
            }
        }
        match event.kind {
            EventKind::PointerMove { rel: Some((rel_x, rel_y)), .. } => {
                snapshot.rect.absolute_of(rel_x, rel_y)
            }
            _ => Position { x, y },
        }
    }

    fn dispatch(&mut self, event: &InputEvent) -> std::result::Result<(), InjectorError> {
        match event.kind {
            EventKind::Delay { .. } => Ok(()),
            EventKind::Key { code, pressed } => {
                self.echo.note(EchoKey::Key(code, pressed));
                self.injector.inject_key(code, pressed)?;
                if pressed {
                    self.pressed_keys.insert(code);
                } else {
                    self.pressed_keys.remove(&code);
                }
                Ok(())
            }
            EventKind::PointerMove { x, y, .. } => {
                let position = self.realize_position(event, x, y);
                self.echo.note(EchoKey::Move);
                self.injector.inject_pointer_move(position.x, position.y)
            }
            EventKind::PointerButton { button, pressed, x, y } => {
                // Clicks land at the cursor; position it first.
                let position = self.realize_position(event, x, y);
                self.echo.note(EchoKey::Move);
                self.injector.inject_pointer_move(position.x, position.y)?;
                self.echo.note(EchoKey::Button(button, pressed));
                self.injector.inject_pointer_button(button, pressed)?;
                if pressed {
                    self.pressed_buttons.insert(button);
                } else {
                    self.pressed_buttons.remove(&button);
                }
                Ok(())
            }
            EventKind::Wheel { delta_x, delta_y } => {
                self.echo.note(EchoKey::Wheel);
                self.injector.inject_wheel(delta_x, delta_y)
            }
        }
    }

    /// Release anything still held down and put the cursor back. Runs on
    /// every exit path, normal or aborted, exactly once per run.
    fn teardown(&mut self) {
        for code in std::mem::take(&mut self.pressed_keys) {
            self.echo.note(EchoKey::Key(code, false));
            if let Err(e) = self.injector.inject_key(code, false) {
                warn!(code, "failed to release key at teardown: {e}");
            }
        }
        for button in std::mem::take(&mut self.pressed_buttons) {
            self.echo.note(EchoKey::Button(button, false));
            if let Err(e) = self.injector.inject_pointer_button(button, false) {
                warn!(?button, "failed to release button at teardown: {e}");
            }
        }
        if let Some(position) = self.restore_to.take() {
            self.echo.note(EchoKey::Move);
            if let Err(e) = self.injector.inject_pointer_move(position.x, position.y) {
                warn!("failed to restore cursor at teardown: {e}");
            }
        }
    }
}

/// Replays a [`MacroSequence`] through an input injector.
///
/// At most one run is active per instance; a second `play` while one is in
/// flight fails with [`MacroError::AlreadyActive`].
pub struct MacroPlayer {
    source: Arc<dyn RawInputSource>,
    resolver: Arc<dyn WindowResolver>,
    injector_override: Option<Arc<dyn InputInjector>>,
    shared: Arc<PlayerShared>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl MacroPlayer {
    pub fn new(source: Arc<dyn RawInputSource>, resolver: Arc<dyn WindowResolver>) -> Self {
        Self {
            source,
            resolver,
            injector_override: None,
            shared: Arc::new(PlayerShared {
                cancel: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                state: Mutex::new(PlayerState::Stopped),
            }),
            worker: None,
        }
    }

    /// Use the given injector instead of constructing one per run.
    pub fn with_injector(mut self, injector: Arc<dyn InputInjector>) -> Self {
        self.injector_override = Some(injector);
        self
    }

    pub fn state(&self) -> PlayerState {
        self.shared.state()
    }

    /// Start replaying `sequence` on a worker thread.
    ///
    /// Validation happens before any side effect: the state check, the
    /// empty-sequence check and the repeat-count check all fail without
    /// injecting anything.
    pub fn play(&mut self, sequence: &MacroSequence, options: PlaybackOptions) -> Result<()> {
        if self.shared.state() != PlayerState::Stopped {
            return Err(MacroError::AlreadyActive);
        }
        // A finished run leaves its handle behind; reap it before reuse.
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        if sequence.is_empty() {
            return Err(MacroError::EmptySequence);
        }
        if options.mode == PlaybackMode::Count && options.repeat_count == 0 {
            return Err(MacroError::InvalidRepeatCount(options.repeat_count));
        }
        let options = options.clamped();

        let injector = match &self.injector_override {
            Some(injector) => Arc::clone(injector),
            None => {
                let mode = if options.use_stealth {
                    InjectionMode::Stealth
                } else {
                    InjectionMode::Standard
                };
                create_injector(mode).map_err(|e| match e {
                    InjectorError::StealthUnavailable => MacroError::StealthUnavailable,
                    other => MacroError::Injector(other),
                })?
            }
        };

        let restore_to = if options.restore_cursor {
            self.resolver.cursor_position()
        } else {
            None
        };

        self.shared.cancel.store(false, Ordering::SeqCst);
        self.shared.paused.store(false, Ordering::SeqCst);
        self.shared.set_state(PlayerState::Playing);

        let echo = Arc::new(EchoFilter::new());
        let watcher = if options.stop_on_input {
            let subscription = self.source.subscribe();
            let echo = Arc::clone(&echo);
            let shared = Arc::clone(&self.shared);
            Some(std::thread::spawn(move || {
                while shared.state() != PlayerState::Stopped {
                    let Some(raw) = subscription.recv_timeout(WAIT_SLICE) else {
                        continue;
                    };
                    if !echo.absorb(raw) {
                        info!("foreign input observed, cancelling playback");
                        shared.cancel.store(true, Ordering::SeqCst);
                    }
                }
            }))
        } else {
            None
        };

        info!(
            name = %sequence.name,
            events = sequence.len(),
            ?options.mode,
            speed = options.speed,
            "starting playback"
        );

        let mut playback = Playback {
            events: sequence.events.clone(),
            options,
            injector,
            resolver: Arc::clone(&self.resolver),
            echo,
            shared: Arc::clone(&self.shared),
            started: Instant::now(),
            pressed_keys: HashSet::new(),
            pressed_buttons: HashSet::new(),
            activated: None,
            restore_to,
        };
        let shared = Arc::clone(&self.shared);
        self.worker = Some(std::thread::spawn(move || {
            let result = playback.run();
            playback.teardown();
            shared.set_state(PlayerState::Stopped);
            if let Some(watcher) = watcher {
                let _ = watcher.join();
            }
            result
        }));
        Ok(())
    }

    /// Suspend the timeline. Returns `false` unless currently playing.
    pub fn pause(&mut self) -> bool {
        if self.shared.state() != PlayerState::Playing {
            return false;
        }
        self.shared.paused.store(true, Ordering::SeqCst);
        self.shared.set_state(PlayerState::Paused);
        info!("playback paused");
        true
    }

    /// Resume a paused timeline. Returns `false` unless currently paused.
    pub fn resume(&mut self) -> bool {
        if self.shared.state() != PlayerState::Paused {
            return false;
        }
        self.shared.paused.store(false, Ordering::SeqCst);
        self.shared.set_state(PlayerState::Playing);
        info!("playback resumed");
        true
    }

    /// Request cancellation and wait for the worker to finish its teardown.
    /// Returns `false` when nothing was running.
    pub fn stop(&mut self) -> bool {
        let was_active = self.shared.state() != PlayerState::Stopped;
        self.shared.cancel.store(true, Ordering::SeqCst);
        self.shared.paused.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        was_active
    }

    /// Block until the current run finishes and surface its outcome.
    pub fn wait(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(worker) => worker.join().unwrap_or(Ok(())),
            None => Ok(()),
        }
    }
}

impl Drop for MacroPlayer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
