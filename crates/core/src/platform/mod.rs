pub mod stub;
pub mod hotkey;

#[cfg(target_os = "windows")]
pub mod win32;

use image::RgbaImage;

use crate::error::Result;
use crate::geometry::Rect;
use crate::logger;
use crate::types::*;

/// Window discovery and raw display capture.
pub trait ScreenSource: Send {
    fn process_running(&self, name: &str) -> bool;
    /// Screen rectangle of the first window whose title matches.
    fn find_window(&self, title: &str) -> Option<Rect>;
    /// Bring the window to the foreground. False if it does not exist.
    fn focus_window(&mut self, title: &str) -> bool;
    fn displays(&self) -> Vec<DisplayInfo>;
    /// Full bitmap of the display at `index` in `displays()`.
    fn capture_display(&mut self, index: usize) -> Result<RgbaImage>;
}

/// Low-level keyboard and pointer injection.
pub trait InputDevice: Send {
    fn send_key(&mut self, key: &str, action: KeyAction);
    fn move_pointer(&mut self, x: i32, y: i32);
    fn pointer_position(&self) -> (i32, i32);
    fn click(&mut self, button: MouseButton);

    /// Whether the physical key is down right now. Devices that cannot read
    /// keyboard state report every key as up.
    fn key_pressed(&self, _key: &str) -> bool {
        false
    }

    fn type_text(&mut self, text: &str) {
        for ch in text.chars() {
            let key = ch.to_string();
            self.send_key(&key, KeyAction::Down);
            self.send_key(&key, KeyAction::Up);
        }
    }
}

/// A screen source paired with an input device from the same backend.
pub struct Backend {
    pub screen: Box<dyn ScreenSource>,
    pub input: Box<dyn InputDevice>,
}

/// Create the backend appropriate for the current OS.
pub fn create_platform(force_stub: bool) -> Backend {
    if force_stub {
        return stub_backend();
    }
    #[cfg(target_os = "windows")]
    {
        logger::register_prefix("win32", logger::COLOR_GRAY);
        return Backend {
            screen: Box::new(win32::Win32Screen),
            input: Box::new(win32::Win32Input),
        };
    }
    #[cfg(not(target_os = "windows"))]
    {
        logger::warn("no native backend on this platform; using stub");
        stub_backend()
    }
}

fn stub_backend() -> Backend {
    logger::register_prefix("stub", logger::COLOR_GRAY);
    let (screen, _) = stub::StubScreen::new();
    let (input, _) = stub::StubInput::new();
    Backend { screen: Box::new(screen), input: Box::new(input) }
}
