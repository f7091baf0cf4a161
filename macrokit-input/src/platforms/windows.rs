use crate::geometry::{Position, Rect};
use crate::window::{WindowId, WindowResolver, WindowSnapshot};
use tracing::debug;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, POINT, RECT};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetCursorPos, GetForegroundWindow, GetWindowRect, GetWindowTextW, IsIconic,
    IsWindowVisible, SetForegroundWindow, ShowWindow, SW_RESTORE,
};

/// Window resolver backed by the Win32 windowing APIs.
pub struct WindowsResolver;

impl WindowsResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn hwnd_of(handle: WindowId) -> HWND {
    HWND(handle.0 as isize as *mut core::ffi::c_void)
}

fn id_of(hwnd: HWND) -> WindowId {
    WindowId(hwnd.0 as isize as u64)
}

fn window_title(hwnd: HWND) -> String {
    let mut buf = [0u16; 512];
    let len = unsafe { GetWindowTextW(hwnd, &mut buf) };
    if len <= 0 {
        return String::new();
    }
    String::from_utf16_lossy(&buf[..len as usize])
}

fn window_rect(hwnd: HWND) -> Option<Rect> {
    let mut rect = RECT::default();
    unsafe { GetWindowRect(hwnd, &mut rect) }.ok()?;
    Some(Rect {
        x: rect.left,
        y: rect.top,
        width: rect.right - rect.left,
        height: rect.bottom - rect.top,
    })
}

fn snapshot_of(hwnd: HWND) -> Option<WindowSnapshot> {
    if hwnd.0.is_null() {
        return None;
    }
    let title = window_title(hwnd);
    let rect = window_rect(hwnd)?;
    Some(WindowSnapshot { id: id_of(hwnd), title, rect })
}

struct TitleSearch {
    needle: String,
    found: Option<WindowSnapshot>,
}

unsafe extern "system" fn find_by_title(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let search = &mut *(lparam.0 as *mut TitleSearch);
    if IsWindowVisible(hwnd).as_bool() {
        let title = window_title(hwnd);
        if !title.is_empty() && title.to_lowercase().contains(&search.needle) {
            if let Some(rect) = window_rect(hwnd) {
                search.found = Some(WindowSnapshot { id: id_of(hwnd), title, rect });
                return BOOL(0);
            }
        }
    }
    BOOL(1)
}

impl WindowResolver for WindowsResolver {
    fn resolve_by_handle(&self, handle: WindowId) -> Option<WindowSnapshot> {
        snapshot_of(hwnd_of(handle))
    }

    fn resolve_by_title(&self, fragment: &str) -> Option<WindowSnapshot> {
        let mut search = TitleSearch {
            needle: fragment.to_lowercase(),
            found: None,
        };
        // EnumWindows reports an error when the callback halts enumeration
        // early; that is the found case, not a failure.
        let _ = unsafe {
            EnumWindows(Some(find_by_title), LPARAM(&mut search as *mut TitleSearch as isize))
        };
        search.found
    }

    fn focused_window(&self) -> Option<WindowSnapshot> {
        snapshot_of(unsafe { GetForegroundWindow() })
    }

    fn bring_to_front(&self, handle: WindowId) -> bool {
        let hwnd = hwnd_of(handle);
        unsafe {
            if IsIconic(hwnd).as_bool() {
                let _ = ShowWindow(hwnd, SW_RESTORE);
            }
            let raised = SetForegroundWindow(hwnd).as_bool();
            if !raised {
                debug!(handle = handle.0, "could not raise window");
            }
            raised
        }
    }

    fn cursor_position(&self) -> Option<Position> {
        let mut point = POINT::default();
        unsafe { GetCursorPos(&mut point) }.ok()?;
        Some(Position { x: point.x, y: point.y })
    }
}
