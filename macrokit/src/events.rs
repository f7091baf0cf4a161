use crate::error::Result;
use chrono::{DateTime, Utc};
use macrokit_input::{KeyCode, PointerButton, Rect};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coordinate mode a sequence was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordingMode {
    /// Absolute screen coordinates, no window context.
    Screen,
    /// Pointer coordinates also carried as fractions of a target window's
    /// rectangle, with the window identity attached to pointer events.
    #[default]
    WindowRelative,
}

/// Kind-specific payload of one recorded transition or synthesized wait.
///
/// The set is closed: deserializing an unknown `kind` tag is an error, never
/// a silently dropped event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    Key {
        code: KeyCode,
        pressed: bool,
    },
    PointerMove {
        x: i32,
        y: i32,
        /// Fractional position within the context window, when one was
        /// resolved at record time.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rel: Option<(f64, f64)>,
    },
    PointerButton {
        button: PointerButton,
        pressed: bool,
        x: i32,
        y: i32,
    },
    Wheel {
        delta_x: i32,
        delta_y: i32,
    },
    /// Explicit wait. Timing is data: gaps between substantive events are
    /// materialized as delay events at record time, so replay never has to
    /// infer timing from anything outside the sequence itself.
    Delay {
        duration: Duration,
    },
}

impl EventKind {
    /// Whether this event is a pointer transition (move, button, wheel).
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            EventKind::PointerMove { .. } | EventKind::PointerButton { .. } | EventKind::Wheel { .. }
        )
    }
}

/// Window identity captured alongside a pointer event in window-relative
/// mode: enough to re-locate the window by title at playback time and to
/// fall back to its last-known rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowContext {
    pub title: String,
    pub rect: Rect,
}

/// One recorded occurrence on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Offset from recording start (monotonic clock). Non-decreasing across
    /// a sequence.
    pub timestamp: Duration,

    #[serde(flatten)]
    pub kind: EventKind,

    /// Present only on pointer events recorded in window-relative mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowContext>,
}

/// An ordered, immutable-once-finished sequence of recorded input events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroSequence {
    pub name: String,
    pub mode: RecordingMode,
    pub recorded_at: DateTime<Utc>,
    pub events: Vec<InputEvent>,
}

impl MacroSequence {
    pub fn new(name: impl Into<String>, mode: RecordingMode) -> Self {
        Self {
            name: name.into(),
            mode,
            recorded_at: Utc::now(),
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Nominal duration of one pass: the offset of the last event.
    pub fn duration(&self) -> Duration {
        self.events.last().map(|e| e.timestamp).unwrap_or_default()
    }

    /// Serialize the sequence to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize a sequence from JSON. Events with an unknown kind are
    /// rejected, not dropped.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save the sequence as a JSON file.
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a sequence from a JSON file.
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
