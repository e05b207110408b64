use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};

use crate::error::{BotError, Result};
use crate::geometry::Rect;
use crate::logger;
use crate::types::*;
use super::{InputDevice, ScreenSource};

/// Shared handle to the frame a `StubScreen` serves. Swap it to change
/// what the bot "sees" while it runs.
pub type FrameHandle = Arc<Mutex<RgbaImage>>;

/// Shared log of everything a `StubInput` received.
pub type EventLog = Arc<Mutex<Vec<InputEvent>>>;

/// Screen source with one display and one client window, both configurable.
pub struct StubScreen {
    frame: FrameHandle,
    process: Option<String>,
    window_title: String,
    window: Option<Rect>,
    displays: Vec<DisplayInfo>,
}

impl StubScreen {
    /// A running client whose window fills a single 1920x1080 display.
    pub fn new() -> (Self, FrameHandle) {
        let frame: FrameHandle =
            Arc::new(Mutex::new(RgbaImage::from_pixel(1920, 1080, Rgba([0, 0, 0, 255]))));
        let screen = Self {
            frame: frame.clone(),
            process: None,
            window_title: String::new(),
            window: Some(Rect::new(0, 0, 1920, 1080)),
            displays: vec![DisplayInfo { name: "stub-0".into(), bbox: Rect::new(0, 0, 1920, 1080) }],
        };
        (screen, frame)
    }

    /// Display and window both sized to `image`, which becomes the frame.
    pub fn with_frame(image: RgbaImage) -> (Self, FrameHandle) {
        let bbox = Rect::new(0, 0, image.width() as i32, image.height() as i32);
        let (mut screen, frame) = Self::new();
        if let Ok(mut f) = frame.lock() {
            *f = image;
        }
        screen.window = Some(bbox);
        screen.displays = vec![DisplayInfo { name: "stub-0".into(), bbox }];
        (screen, frame)
    }

    /// Only report the process as running under this name.
    pub fn with_process(mut self, name: &str) -> Self {
        self.process = Some(name.to_string());
        self
    }

    /// Only answer window lookups whose title contains `title`.
    pub fn with_title(mut self, title: &str) -> Self {
        self.window_title = title.to_string();
        self
    }

    pub fn with_window(mut self, bbox: Option<Rect>) -> Self {
        self.window = bbox;
        self
    }

    pub fn with_displays(mut self, displays: Vec<DisplayInfo>) -> Self {
        self.displays = displays;
        self
    }

    fn log(&self, msg: &str) {
        logger::info_p("stub", msg);
    }
}

impl ScreenSource for StubScreen {
    fn process_running(&self, name: &str) -> bool {
        self.log(&format!("process_running(\"{}\")", name));
        self.process.as_deref().map_or(true, |p| p.eq_ignore_ascii_case(name))
    }

    fn find_window(&self, title: &str) -> Option<Rect> {
        self.log(&format!("find_window(\"{}\")", title));
        let wanted = self.window_title.to_lowercase();
        if title.to_lowercase().contains(&wanted) {
            self.window
        } else {
            None
        }
    }

    fn focus_window(&mut self, title: &str) -> bool {
        self.log(&format!("focus_window(\"{}\")", title));
        self.find_window(title).is_some()
    }

    fn displays(&self) -> Vec<DisplayInfo> {
        self.displays.clone()
    }

    fn capture_display(&mut self, index: usize) -> Result<RgbaImage> {
        if index >= self.displays.len() {
            return Err(BotError::Capture(format!("no display {}", index)));
        }
        let frame = self
            .frame
            .lock()
            .map_err(|_| BotError::Capture("frame lock poisoned".into()))?;
        Ok(frame.clone())
    }
}

/// Input device that records events instead of sending them.
pub struct StubInput {
    events: EventLog,
    pointer: (i32, i32),
}

impl StubInput {
    pub fn new() -> (Self, EventLog) {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        (Self { events: events.clone(), pointer: (0, 0) }, events)
    }

    fn record(&self, event: InputEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl InputDevice for StubInput {
    fn send_key(&mut self, key: &str, action: KeyAction) {
        logger::info_p("stub", &format!("send_key(\"{}\", {:?})", key, action));
        self.record(InputEvent::Key(key.to_string(), action));
    }

    fn move_pointer(&mut self, x: i32, y: i32) {
        self.pointer = (x, y);
        self.record(InputEvent::Move(x, y));
    }

    fn pointer_position(&self) -> (i32, i32) {
        self.pointer
    }

    fn click(&mut self, button: MouseButton) {
        logger::info_p("stub", &format!("click({:?}) at {:?}", button, self.pointer));
        self.record(InputEvent::Click(button));
    }

    /// A key counts as pressed while its last recorded event is a key-down.
    fn key_pressed(&self, key: &str) -> bool {
        let Ok(events) = self.events.lock() else { return false };
        events
            .iter()
            .rev()
            .find_map(|e| match e {
                InputEvent::Key(k, action) if k == key => Some(*action == KeyAction::Down),
                _ => None,
            })
            .unwrap_or(false)
    }

    fn type_text(&mut self, text: &str) {
        logger::info_p("stub", &format!("type_text(\"{}\")", text));
        self.record(InputEvent::Text(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_reports_configured_geometry() {
        let (screen, _) = StubScreen::new();
        let screen = screen.with_process("WowClassic.exe").with_title("World of Warcraft");
        assert!(screen.process_running("wowclassic.exe"));
        assert!(!screen.process_running("notepad.exe"));
        assert_eq!(screen.find_window("World of Warcraft"), Some(Rect::new(0, 0, 1920, 1080)));
        assert_eq!(screen.find_window("Notepad"), None);
    }

    #[test]
    fn swapped_frame_is_served() {
        let (mut screen, frame) = StubScreen::with_frame(RgbaImage::new(4, 4));
        *frame.lock().unwrap() = RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255]));
        assert_eq!(screen.capture_display(0).unwrap().get_pixel(0, 0)[0], 9);
        assert!(screen.capture_display(1).is_err());
    }

    #[test]
    fn input_records_events_and_pointer() {
        let (mut input, events) = StubInput::new();
        input.send_key("w", KeyAction::Down);
        input.move_pointer(10, 20);
        input.click(MouseButton::Left);
        assert_eq!(input.pointer_position(), (10, 20));
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                InputEvent::Key("w".into(), KeyAction::Down),
                InputEvent::Move(10, 20),
                InputEvent::Click(MouseButton::Left),
            ]
        );
    }

    #[test]
    fn key_state_follows_the_last_key_event() {
        let (mut input, _) = StubInput::new();
        assert!(!input.key_pressed("w"));
        input.send_key("w", KeyAction::Down);
        input.send_key("a", KeyAction::Down);
        input.send_key("a", KeyAction::Up);
        assert!(input.key_pressed("w"));
        assert!(!input.key_pressed("a"));
    }
}
