//! Low-level injection backend.
//!
//! Delivers keys as hardware scan codes and pointer actions as absolute
//! `SendInput` strokes instead of the higher-level input APIs the standard
//! backend uses. Only available on Windows; elsewhere construction fails
//! with `StealthUnavailable` and playback is expected to reject the request
//! up front.

use crate::error::InjectorError;
use crate::injector::InputInjector;
use crate::keys::{KeyCode, PointerButton};

/// Injection through hardware-level scan-code strokes.
pub struct StealthInjector {
    _private: (),
}

impl StealthInjector {
    pub fn new() -> Result<Self, InjectorError> {
        #[cfg(target_os = "windows")]
        {
            tracing::debug!("stealth injection backend initialized");
            Ok(Self { _private: () })
        }
        #[cfg(not(target_os = "windows"))]
        {
            Err(InjectorError::StealthUnavailable)
        }
    }
}

#[cfg(target_os = "windows")]
mod imp {
    use super::*;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        MapVirtualKeyW, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT,
        KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE, MAPVK_VK_TO_VSC, MOUSEEVENTF_ABSOLUTE,
        MOUSEEVENTF_HWHEEL, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN,
        MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP,
        MOUSEEVENTF_WHEEL, MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

    const WHEEL_DELTA: i32 = 120;

    fn send(inputs: &[INPUT]) -> Result<(), InjectorError> {
        let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize == inputs.len() {
            Ok(())
        } else {
            Err(InjectorError::Injection("SendInput rejected the stroke".to_string()))
        }
    }

    fn keyboard_stroke(scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(0),
                    wScan: scan,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    fn mouse_stroke(dx: i32, dy: i32, data: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: data,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    impl InputInjector for StealthInjector {
        fn inject_key(&self, code: KeyCode, pressed: bool) -> Result<(), InjectorError> {
            let scan = unsafe { MapVirtualKeyW(code, MAPVK_VK_TO_VSC) } as u16;
            if scan == 0 {
                return Err(InjectorError::UnsupportedKey(code));
            }
            let mut flags = KEYEVENTF_SCANCODE;
            if !pressed {
                flags |= KEYEVENTF_KEYUP;
            }
            send(&[keyboard_stroke(scan, flags)])
        }

        fn inject_pointer_move(&self, x: i32, y: i32) -> Result<(), InjectorError> {
            let (screen_w, screen_h) = unsafe {
                (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN))
            };
            if screen_w <= 1 || screen_h <= 1 {
                return Err(InjectorError::Injection("screen metrics unavailable".to_string()));
            }
            // SendInput absolute coordinates are normalized to [0, 65535].
            let dx = (i64::from(x) * 65535 / i64::from(screen_w - 1)) as i32;
            let dy = (i64::from(y) * 65535 / i64::from(screen_h - 1)) as i32;
            send(&[mouse_stroke(dx, dy, 0, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE)])
        }

        fn inject_pointer_button(&self, button: PointerButton, pressed: bool) -> Result<(), InjectorError> {
            let flags = match (button, pressed) {
                (PointerButton::Left, true) => MOUSEEVENTF_LEFTDOWN,
                (PointerButton::Left, false) => MOUSEEVENTF_LEFTUP,
                (PointerButton::Right, true) => MOUSEEVENTF_RIGHTDOWN,
                (PointerButton::Right, false) => MOUSEEVENTF_RIGHTUP,
                (PointerButton::Middle, true) => MOUSEEVENTF_MIDDLEDOWN,
                (PointerButton::Middle, false) => MOUSEEVENTF_MIDDLEUP,
            };
            send(&[mouse_stroke(0, 0, 0, flags)])
        }

        fn inject_wheel(&self, delta_x: i32, delta_y: i32) -> Result<(), InjectorError> {
            let mut strokes = Vec::with_capacity(2);
            if delta_y != 0 {
                strokes.push(mouse_stroke(0, 0, delta_y * WHEEL_DELTA, MOUSEEVENTF_WHEEL));
            }
            if delta_x != 0 {
                strokes.push(mouse_stroke(0, 0, delta_x * WHEEL_DELTA, MOUSEEVENTF_HWHEEL));
            }
            if strokes.is_empty() {
                return Ok(());
            }
            send(&strokes)
        }
    }
}

#[cfg(not(target_os = "windows"))]
impl InputInjector for StealthInjector {
    fn inject_key(&self, _code: KeyCode, _pressed: bool) -> Result<(), InjectorError> {
        Err(InjectorError::StealthUnavailable)
    }

    fn inject_pointer_move(&self, _x: i32, _y: i32) -> Result<(), InjectorError> {
        Err(InjectorError::StealthUnavailable)
    }

    fn inject_pointer_button(&self, _button: PointerButton, _pressed: bool) -> Result<(), InjectorError> {
        Err(InjectorError::StealthUnavailable)
    }

    fn inject_wheel(&self, _delta_x: i32, _delta_y: i32) -> Result<(), InjectorError> {
        Err(InjectorError::StealthUnavailable)
    }
}
