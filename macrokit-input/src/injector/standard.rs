use crate::error::InjectorError;
use crate::keys::{button_of, key_of, KeyCode, PointerButton};
use crate::injector::InputInjector;
use rdev::EventType;
use tracing::trace;

/// Injection through the standard OS input APIs (via `rdev::simulate`).
pub struct StandardInjector;

impl StandardInjector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StandardInjector {
    fn default() -> Self {
        Self::new()
    }
}

fn simulate(event: &EventType) -> Result<(), InjectorError> {
    trace!(?event, "simulating input event");
    rdev::simulate(event).map_err(|e| InjectorError::Injection(format!("{e:?}")))
}

impl InputInjector for StandardInjector {
    fn inject_key(&self, code: KeyCode, pressed: bool) -> Result<(), InjectorError> {
        let key = key_of(code).ok_or(InjectorError::UnsupportedKey(code))?;
        let event = if pressed {
            EventType::KeyPress(key)
        } else {
            EventType::KeyRelease(key)
        };
        simulate(&event)
    }

    fn inject_pointer_move(&self, x: i32, y: i32) -> Result<(), InjectorError> {
        simulate(&EventType::MouseMove { x: f64::from(x), y: f64::from(y) })
    }

    fn inject_pointer_button(&self, button: PointerButton, pressed: bool) -> Result<(), InjectorError> {
        let button = button_of(button);
        let event = if pressed {
            EventType::ButtonPress(button)
        } else {
            EventType::ButtonRelease(button)
        };
        simulate(&event)
    }

    fn inject_wheel(&self, delta_x: i32, delta_y: i32) -> Result<(), InjectorError> {
        simulate(&EventType::Wheel {
            delta_x: i64::from(delta_x),
            delta_y: i64::from(delta_y),
        })
    }
}
