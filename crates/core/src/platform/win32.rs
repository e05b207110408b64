use std::mem::size_of;

use image::RgbaImage;
use windows::Win32::Foundation::{BOOL, CloseHandle, HWND, LPARAM, POINT, RECT};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject,
    EnumDisplayMonitors, GetDC, GetDIBits, GetMonitorInfoW, ReleaseDC, SelectObject,
    BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HDC, HMONITOR, MONITORINFO,
    MONITORINFOEXW, SRCCOPY,
};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, SendInput, VkKeyScanW, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT,
    KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEINPUT,
    MOUSE_EVENT_FLAGS, VIRTUAL_KEY, VK_BACK, VK_CONTROL, VK_DELETE, VK_DOWN, VK_ESCAPE,
    VK_F1, VK_LEFT, VK_MENU, VK_RETURN, VK_RIGHT, VK_SHIFT, VK_SPACE, VK_TAB, VK_UP,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetCursorPos, GetWindowRect, GetWindowTextW, IsWindowVisible,
    SetCursorPos, SetForegroundWindow, ShowWindow, SW_RESTORE,
};

use crate::error::{BotError, Result};
use crate::geometry::{Rect, Span};
use crate::logger;
use crate::types::*;
use super::{InputDevice, ScreenSource};

fn virtual_key(key: &str) -> Option<VIRTUAL_KEY> {
    let named = match key.to_ascii_lowercase().as_str() {
        "enter" | "return" => Some(VK_RETURN),
        "escape" | "esc" => Some(VK_ESCAPE),
        "delete" | "del" => Some(VK_DELETE),
        "backspace" => Some(VK_BACK),
        "tab" => Some(VK_TAB),
        "space" => Some(VK_SPACE),
        "up" => Some(VK_UP),
        "down" => Some(VK_DOWN),
        "left" => Some(VK_LEFT),
        "right" => Some(VK_RIGHT),
        "ctrl" | "control" => Some(VK_CONTROL),
        "shift" => Some(VK_SHIFT),
        "alt" => Some(VK_MENU),
        k if k.len() > 1 && k.starts_with('f') => k[1..]
            .parse::<u16>()
            .ok()
            .filter(|n| (1..=12).contains(n))
            .map(|n| VIRTUAL_KEY(VK_F1.0 + n - 1)),
        _ => None,
    };
    if named.is_some() {
        return named;
    }

    let mut chars = key.chars();
    let (Some(ch), None) = (chars.next(), chars.next()) else { return None };
    let mut buf = [0u16; 2];
    let unit = ch.encode_utf16(&mut buf)[0];
    let scan = unsafe { VkKeyScanW(unit) };
    if scan == -1 {
        None
    } else {
        Some(VIRTUAL_KEY((scan as u16) & 0xFF))
    }
}

fn keyboard_input(vk: VIRTUAL_KEY, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT { wVk: vk, wScan: scan, dwFlags: flags, time: 0, dwExtraInfo: 0 },
        },
    }
}

fn mouse_input(flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT { dx: 0, dy: 0, mouseData: 0, dwFlags: flags, time: 0, dwExtraInfo: 0 },
        },
    }
}

fn send(inputs: &[INPUT]) {
    let sent = unsafe { SendInput(inputs, size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        logger::warn_p("win32", &format!("SendInput accepted {}/{} events", sent, inputs.len()));
    }
}

/// First visible top-level window whose title matches `title` (case-insensitive).
fn find_hwnd(title: &str) -> Option<HWND> {
    let re = regex::Regex::new(&format!("(?i){}", regex::escape(title))).ok()?;

    struct Search {
        re: regex::Regex,
        found: Option<HWND>,
    }

    unsafe extern "system" fn visit(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let search = &mut *(lparam.0 as *mut Search);
        if !IsWindowVisible(hwnd).as_bool() {
            return BOOL(1);
        }
        let mut buf = [0u16; 512];
        let len = GetWindowTextW(hwnd, &mut buf);
        if len <= 0 {
            return BOOL(1);
        }
        let text = String::from_utf16_lossy(&buf[..len as usize]);
        if search.re.is_match(&text) {
            search.found = Some(hwnd);
            return BOOL(0);
        }
        BOOL(1)
    }

    let mut search = Search { re, found: None };
    unsafe {
        // EnumWindows reports an error when the callback stops early
        let _ = EnumWindows(Some(visit), LPARAM(&mut search as *mut Search as isize));
    }
    search.found
}

fn wide_to_string(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

pub struct Win32Screen;

impl ScreenSource for Win32Screen {
    fn process_running(&self, name: &str) -> bool {
        unsafe {
            let Ok(snapshot) = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) else {
                logger::warn_p("win32", "process snapshot failed");
                return false;
            };
            let mut entry = PROCESSENTRY32W {
                dwSize: size_of::<PROCESSENTRY32W>() as u32,
                ..Default::default()
            };
            let mut found = false;
            let mut more = Process32FirstW(snapshot, &mut entry).is_ok();
            while more {
                if wide_to_string(&entry.szExeFile).eq_ignore_ascii_case(name) {
                    found = true;
                    break;
                }
                more = Process32NextW(snapshot, &mut entry).is_ok();
            }
            let _ = CloseHandle(snapshot);
            found
        }
    }

    fn find_window(&self, title: &str) -> Option<Rect> {
        let hwnd = find_hwnd(title)?;
        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd, &mut rect).ok()? };
        Some(Span::new(rect.left, rect.top, rect.right, rect.bottom).to_rect())
    }

    fn focus_window(&mut self, title: &str) -> bool {
        let Some(hwnd) = find_hwnd(title) else { return false };
        unsafe {
            let _ = ShowWindow(hwnd, SW_RESTORE);
            SetForegroundWindow(hwnd).as_bool()
        }
    }

    fn displays(&self) -> Vec<DisplayInfo> {
        unsafe extern "system" fn visit(
            monitor: HMONITOR,
            _hdc: HDC,
            _clip: *mut RECT,
            lparam: LPARAM,
        ) -> BOOL {
            let out = &mut *(lparam.0 as *mut Vec<DisplayInfo>);
            let mut info = MONITORINFOEXW::default();
            info.monitorInfo.cbSize = size_of::<MONITORINFOEXW>() as u32;
            if GetMonitorInfoW(monitor, &mut info as *mut MONITORINFOEXW as *mut MONITORINFO).as_bool() {
                let r = info.monitorInfo.rcMonitor;
                out.push(DisplayInfo {
                    name: wide_to_string(&info.szDevice),
                    bbox: Span::new(r.left, r.top, r.right, r.bottom).to_rect(),
                });
            }
            BOOL(1)
        }

        let mut out: Vec<DisplayInfo> = Vec::new();
        unsafe {
            let _ = EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(visit),
                LPARAM(&mut out as *mut Vec<DisplayInfo> as isize),
            );
        }
        out
    }

    fn capture_display(&mut self, index: usize) -> Result<RgbaImage> {
        let display = self
            .displays()
            .into_iter()
            .nth(index)
            .ok_or_else(|| BotError::Capture(format!("no display {}", index)))?;
        let Rect { left, top, width, height } = display.bbox;
        if width <= 0 || height <= 0 {
            return Err(BotError::Capture(format!("display {} is empty", display.name)));
        }

        unsafe {
            let screen_dc = GetDC(HWND::default());
            if screen_dc.is_invalid() {
                return Err(BotError::Capture("GetDC failed".into()));
            }
            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
            let old = SelectObject(mem_dc, bitmap);

            let blit = BitBlt(mem_dc, 0, 0, width, height, screen_dc, left, top, SRCCOPY);

            let mut bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    biHeight: -height, // top-down
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let mut buffer = vec![0u8; (width * height * 4) as usize];
            let lines = if blit.is_ok() {
                GetDIBits(
                    mem_dc,
                    bitmap,
                    0,
                    height as u32,
                    Some(buffer.as_mut_ptr() as *mut _),
                    &mut bmi,
                    DIB_RGB_COLORS,
                )
            } else {
                0
            };

            SelectObject(mem_dc, old);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(HWND::default(), screen_dc);

            if lines == 0 {
                return Err(BotError::Capture(format!("BitBlt of {} failed", display.name)));
            }

            // BGRA -> RGBA
            for px in buffer.chunks_exact_mut(4) {
                px.swap(0, 2);
                px[3] = 255;
            }
            RgbaImage::from_raw(width as u32, height as u32, buffer)
                .ok_or_else(|| BotError::Capture("bitmap size mismatch".into()))
        }
    }
}

pub struct Win32Input;

impl InputDevice for Win32Input {
    fn send_key(&mut self, key: &str, action: KeyAction) {
        let Some(vk) = virtual_key(key) else {
            logger::warn_p("win32", &format!("unknown key \"{}\"", key));
            return;
        };
        let flags = match action {
            KeyAction::Down => KEYBD_EVENT_FLAGS(0),
            KeyAction::Up => KEYEVENTF_KEYUP,
        };
        send(&[keyboard_input(vk, 0, flags)]);
    }

    fn move_pointer(&mut self, x: i32, y: i32) {
        if unsafe { SetCursorPos(x, y) }.is_err() {
            logger::warn_p("win32", &format!("SetCursorPos({}, {}) failed", x, y));
        }
    }

    fn pointer_position(&self) -> (i32, i32) {
        let mut p = POINT::default();
        match unsafe { GetCursorPos(&mut p) } {
            Ok(()) => (p.x, p.y),
            Err(_) => (0, 0),
        }
    }

    fn click(&mut self, button: MouseButton) {
        let (down, up) = match button {
            MouseButton::Left => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
            MouseButton::Right => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
        };
        send(&[mouse_input(down), mouse_input(up)]);
    }

    fn key_pressed(&self, key: &str) -> bool {
        let Some(vk) = virtual_key(key) else { return false };
        // High bit set while the key is down.
        (unsafe { GetAsyncKeyState(i32::from(vk.0)) } as u16) & 0x8000 != 0
    }

    fn type_text(&mut self, text: &str) {
        let mut inputs = Vec::with_capacity(text.len() * 2);
        for unit in text.encode_utf16() {
            inputs.push(keyboard_input(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE));
            inputs.push(keyboard_input(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP));
        }
        send(&inputs);
    }
}
