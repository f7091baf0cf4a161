//! End-to-end tests over the public API: record from a scripted source,
//! persist to disk, reload and replay through a capturing injector.

use anyhow::Result;
use macrokit::{
    EventKind, MacroPlayer, MacroRecorder, MacroSequence, PlaybackMode, PlaybackOptions,
    RecorderConfig, RecordingMode,
};
use macrokit_input::{
    InjectorError, InputInjector, KeyCode, NullResolver, PointerButton, RawInput, RawInputSource,
    Subscription,
};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct ScriptedSource {
    senders: Mutex<Vec<Sender<RawInput>>>,
}

impl ScriptedSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            senders: Mutex::new(Vec::new()),
        })
    }

    fn emit(&self, raw: RawInput) {
        for tx in self.senders.lock().unwrap().iter() {
            let _ = tx.send(raw);
        }
    }
}

impl RawInputSource for ScriptedSource {
    fn subscribe(&self) -> Subscription {
        let (tx, subscription) = Subscription::channel();
        self.senders.lock().unwrap().push(tx);
        subscription
    }
}

#[derive(Default)]
struct CapturingInjector {
    keys: Mutex<Vec<(KeyCode, bool)>>,
    key_times: Mutex<Vec<Instant>>,
}

impl InputInjector for CapturingInjector {
    fn inject_key(&self, code: KeyCode, pressed: bool) -> Result<(), InjectorError> {
        self.keys.lock().unwrap().push((code, pressed));
        self.key_times.lock().unwrap().push(Instant::now());
        Ok(())
    }

    fn inject_pointer_move(&self, _x: i32, _y: i32) -> Result<(), InjectorError> {
        Ok(())
    }

    fn inject_pointer_button(&self, _button: PointerButton, _pressed: bool) -> Result<(), InjectorError> {
        Ok(())
    }

    fn inject_wheel(&self, _delta_x: i32, _delta_y: i32) -> Result<(), InjectorError> {
        Ok(())
    }
}

fn screen_config() -> RecorderConfig {
    RecorderConfig {
        mode: RecordingMode::Screen,
        ..RecorderConfig::default()
    }
}

fn quiet_options() -> PlaybackOptions {
    PlaybackOptions {
        stop_on_input: false,
        restore_cursor: false,
        ..PlaybackOptions::default()
    }
}

#[test]
fn record_save_load_replay() -> Result<()> {
    let source = ScriptedSource::new();
    let mut recorder = MacroRecorder::new(
        Arc::clone(&source) as Arc<dyn RawInputSource>,
        Arc::new(NullResolver),
    );

    recorder.start("smoke", screen_config())?;
    source.emit(RawInput::Key { code: 72, pressed: true });
    std::thread::sleep(Duration::from_millis(40));
    source.emit(RawInput::Key { code: 72, pressed: false });
    std::thread::sleep(Duration::from_millis(60));
    let sequence = recorder.stop();

    assert!(!sequence.is_empty());
    assert!(sequence
        .events
        .iter()
        .any(|e| matches!(e.kind, EventKind::Delay { .. })));

    // Round-trip through a file, replay the reloaded copy.
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("smoke.json");
    sequence.save_to_file(&path)?;
    let reloaded = MacroSequence::load_from_file(&path)?;
    assert_eq!(reloaded, sequence);

    let injector = Arc::new(CapturingInjector::default());
    let mut player = MacroPlayer::new(
        Arc::clone(&source) as Arc<dyn RawInputSource>,
        Arc::new(NullResolver),
    )
    .with_injector(Arc::clone(&injector) as Arc<dyn InputInjector>);

    player.play(&reloaded, quiet_options())?;
    player.wait()?;

    let keys = injector.keys.lock().unwrap().clone();
    assert_eq!(keys, vec![(72, true), (72, false)]);
    Ok(())
}

#[test]
fn replay_preserves_recorded_gaps() -> Result<()> {
    let mut sequence = MacroSequence::new("timing", RecordingMode::Screen);
    sequence.push(macrokit::InputEvent {
        timestamp: Duration::ZERO,
        kind: EventKind::Key { code: 65, pressed: true },
        window: None,
    });
    sequence.push(macrokit::InputEvent {
        timestamp: Duration::from_millis(120),
        kind: EventKind::Key { code: 65, pressed: false },
        window: None,
    });

    let injector = Arc::new(CapturingInjector::default());
    let mut player = MacroPlayer::new(
        ScriptedSource::new() as Arc<dyn RawInputSource>,
        Arc::new(NullResolver),
    )
    .with_injector(Arc::clone(&injector) as Arc<dyn InputInjector>);

    player.play(&sequence, quiet_options())?;
    player.wait()?;

    let times = injector.key_times.lock().unwrap().clone();
    assert_eq!(times.len(), 2);
    let gap = times[1].duration_since(times[0]);
    // Sliced waits can overshoot by a slice; never undershoot meaningfully.
    assert!(gap >= Duration::from_millis(110), "gap {gap:?}");
    assert!(gap <= Duration::from_millis(300), "gap {gap:?}");
    Ok(())
}

#[test]
fn counted_replay_repeats_the_whole_timeline() -> Result<()> {
    let mut sequence = MacroSequence::new("count", RecordingMode::Screen);
    sequence.push(macrokit::InputEvent {
        timestamp: Duration::ZERO,
        kind: EventKind::Key { code: 65, pressed: true },
        window: None,
    });
    sequence.push(macrokit::InputEvent {
        timestamp: Duration::from_millis(5),
        kind: EventKind::Key { code: 65, pressed: false },
        window: None,
    });

    let injector = Arc::new(CapturingInjector::default());
    let mut player = MacroPlayer::new(
        ScriptedSource::new() as Arc<dyn RawInputSource>,
        Arc::new(NullResolver),
    )
    .with_injector(Arc::clone(&injector) as Arc<dyn InputInjector>);

    let options = PlaybackOptions {
        mode: PlaybackMode::Count,
        repeat_count: 2,
        ..quiet_options()
    };
    player.play(&sequence, options)?;
    player.wait()?;

    let keys = injector.keys.lock().unwrap().clone();
    assert_eq!(keys, vec![(65, true), (65, false), (65, true), (65, false)]);
    Ok(())
}
