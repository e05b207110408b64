//! Client window, its display, and the named sub-image registry.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Local};
use image::{imageops, RgbaImage};

use crate::error::{BotError, Result};
use crate::geometry::{absolute_location, is_subbox, relative_location, Rect, Span};
use crate::logger;
use crate::matcher::PreparedFrame;
use crate::movement::MovementCommand;
use crate::platform::ScreenSource;

/// The game client's top-level window. Coordinates are only valid until the
/// next `refresh`.
#[derive(Debug, Clone)]
pub struct GameWindow {
    pub process_name: String,
    pub title: String,
    pub bbox: Option<Rect>,
    pub location: Option<Span>,
    pub is_open: bool,
}

impl GameWindow {
    pub fn new(process_name: &str, title: &str) -> Self {
        Self {
            process_name: process_name.to_string(),
            title: title.to_string(),
            bbox: None,
            location: None,
            is_open: false,
        }
    }

    /// Re-query the window rectangle from the OS.
    pub fn refresh(&mut self, screen: &dyn ScreenSource) -> Result<Rect> {
        self.is_open = false;
        self.bbox = None;
        self.location = None;

        if !screen.process_running(&self.process_name) {
            return Err(BotError::ProcessNotRunning(self.process_name.clone()));
        }
        let bbox = screen.find_window(&self.title).ok_or_else(|| BotError::WindowNotFound {
            process: self.process_name.clone(),
            title: self.title.clone(),
        })?;

        self.is_open = true;
        self.bbox = Some(bbox);
        self.location = Some(bbox.to_span());
        Ok(bbox)
    }
}

/// The physical display that contains the client window.
#[derive(Debug, Clone)]
pub struct Display {
    pub name: String,
    pub index: usize,
    pub bbox: Rect,
    pub location: Span,
    pub frame: Option<RgbaImage>,
    pub captured_at: Option<DateTime<Local>>,
}

impl Display {
    pub fn refresh(&mut self, screen: &mut dyn ScreenSource) -> Result<()> {
        self.frame = Some(screen.capture_display(self.index)?);
        self.captured_at = Some(Local::now());
        Ok(())
    }
}

/// A named template, immutable once registered.
#[derive(Debug, Clone)]
pub struct SubImage {
    pub name: String,
    pub template: RgbaImage,
}

/// Outcome of the latest match of one sub-image. Replaced on every update.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub name: String,
    pub found: bool,
    /// Window-relative span of the hit.
    pub location: Option<Span>,
    /// Screen-absolute span of the hit.
    pub absolute_location: Option<Span>,
    pub updated_at: DateTime<Local>,
}

impl MatchRecord {
    pub fn absolute_rect(&self) -> Option<Rect> {
        self.absolute_location.map(Span::to_rect)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    pub threshold: f64,
    pub grayscale: bool,
    /// Capture a new frame before matching.
    pub refresh_frame: bool,
}

impl MatchOptions {
    pub fn new(threshold: f64, grayscale: bool) -> Self {
        Self { threshold, grayscale, refresh_frame: true }
    }

    /// Match against the frame already held by the view.
    pub fn cached(self) -> Self {
        Self { refresh_frame: false, ..self }
    }
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self::new(0.9, true)
    }
}

/// Sub-image names the routines look for.
pub mod indicators {
    pub const RESURRECTION: &str = "resurrection";
    pub const LEAVE_BATTLEGROUND: &str = "leave_battleground";
    pub const ENTER_BATTLE: &str = "enter_battle";
    pub const JOIN_BATTLE: &str = "join_battle";
    pub const QUEUE_FOR_BATTLEGROUND: &str = "queue_for_battleground";
    pub const CHAT_TYPING_BOX: &str = "chat_typing_box";
    pub const MOUNT_ICON: &str = "mount_icon";
}

fn registry_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Everything the bot knows about one running client.
pub struct ClientView {
    screen: Box<dyn ScreenSource>,
    pub window: GameWindow,
    display: Option<Display>,
    /// Window position inside the display.
    window_offset: Option<Span>,
    frame: Option<RgbaImage>,
    sub_images: BTreeMap<String, SubImage>,
    scripts: HashMap<String, Vec<MovementCommand>>,
    matches: HashMap<String, MatchRecord>,
}

impl ClientView {
    pub fn new(screen: Box<dyn ScreenSource>, window: GameWindow) -> Self {
        Self {
            screen,
            window,
            display: None,
            window_offset: None,
            frame: None,
            sub_images: BTreeMap::new(),
            scripts: HashMap::new(),
            matches: HashMap::new(),
        }
    }

    pub fn register_sub_image(&mut self, name: &str, template: RgbaImage) -> Result<()> {
        let key = registry_key(name);
        if self.sub_images.contains_key(&key) {
            return Err(BotError::DuplicateSubImage(name.to_string()));
        }
        self.sub_images.insert(key.clone(), SubImage { name: key, template });
        Ok(())
    }

    pub fn register_script(&mut self, name: &str, commands: Vec<MovementCommand>) {
        self.scripts.insert(name.to_string(), commands);
    }

    /// Lookup by trimmed, case-insensitive name.
    pub fn sub_image(&self, name: &str) -> Result<&SubImage> {
        self.try_sub_image(name)
            .ok_or_else(|| BotError::SubImageNotFound(name.to_string()))
    }

    pub fn try_sub_image(&self, name: &str) -> Option<&SubImage> {
        self.sub_images.get(&registry_key(name))
    }

    pub fn sub_image_names(&self) -> impl Iterator<Item = &str> {
        self.sub_images.keys().map(String::as_str)
    }

    pub fn script(&self, name: &str) -> Result<&[MovementCommand]> {
        self.scripts
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| BotError::ScriptNotFound(name.to_string()))
    }

    pub fn script_names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    pub fn last_match(&self, name: &str) -> Option<&MatchRecord> {
        self.matches.get(&registry_key(name))
    }

    pub fn frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    pub fn display(&self) -> Option<&Display> {
        self.display.as_ref()
    }

    pub fn focus(&mut self) -> bool {
        let ok = self.screen.focus_window(&self.window.title);
        if !ok {
            logger::warn_p("screen", &format!("could not focus '{}'", self.window.title));
        }
        ok
    }

    /// Find the single display containing the window and cache the window's
    /// offset inside it.
    pub fn locate_display(&mut self) -> Result<&Display> {
        let window = self.window.refresh(self.screen.as_ref())?;
        let candidates: Vec<(usize, crate::types::DisplayInfo)> = self
            .screen
            .displays()
            .into_iter()
            .enumerate()
            .filter(|(_, d)| is_subbox(&d.bbox, &window))
            .collect();

        let (index, info) = match candidates.len() {
            0 => return Err(BotError::DisplayNotFound),
            1 => candidates.into_iter().next().ok_or(BotError::DisplayNotFound)?,
            count => return Err(BotError::AmbiguousDisplay { count }),
        };

        self.window_offset = Some(relative_location(&info.bbox, &window)?);
        logger::info_p(
            "screen",
            &format!("window {} on display {} ({})", window, info.name, info.bbox),
        );
        let display = self.display.insert(Display {
            name: info.name,
            index,
            bbox: info.bbox,
            location: info.bbox.to_span(),
            frame: None,
            captured_at: None,
        });
        Ok(&*display)
    }

    /// Capture the display and crop the window out of it.
    pub fn refresh_frame(&mut self) -> Result<&RgbaImage> {
        if self.display.is_none() || self.window_offset.is_none() {
            self.locate_display()?;
        }
        let (Some(display), Some(offset)) = (self.display.as_mut(), self.window_offset) else {
            return Err(BotError::DisplayNotFound);
        };
        display.refresh(self.screen.as_mut())?;
        let full = display
            .frame
            .as_ref()
            .ok_or_else(|| BotError::Capture("display produced no frame".into()))?;

        let cropped = imageops::crop_imm(
            full,
            offset.left.max(0) as u32,
            offset.top.max(0) as u32,
            offset.width().max(0) as u32,
            offset.height().max(0) as u32,
        )
        .to_image();
        let frame = self.frame.insert(cropped);
        Ok(&*frame)
    }

    /// Use `image` as the window frame without touching the platform.
    pub fn load_frame(&mut self, image: RgbaImage) {
        if self.window.location.is_none() {
            let bbox = Rect::new(0, 0, image.width() as i32, image.height() as i32);
            self.window.bbox = Some(bbox);
            self.window.location = Some(bbox.to_span());
        }
        self.frame = Some(image);
    }

    /// Match one sub-image against the window frame and replace its record.
    pub fn update_location(&mut self, name: &str, opts: &MatchOptions) -> Result<MatchRecord> {
        let key = registry_key(name);
        if !self.sub_images.contains_key(&key) {
            return Err(BotError::SubImageNotFound(name.to_string()));
        }
        self.matches.remove(&key);

        if opts.refresh_frame {
            self.refresh_frame()?;
        }
        let prepared = self.prepare(opts)?;
        let record = self.match_prepared(&key, &prepared, opts)?;
        self.matches.insert(key, record.clone());
        Ok(record)
    }

    /// Refresh once, then match every registered sub-image.
    pub fn update_all(&mut self, opts: &MatchOptions) -> Result<Vec<MatchRecord>> {
        if opts.refresh_frame {
            self.refresh_frame()?;
        }
        let prepared = self.prepare(opts)?;
        let keys: Vec<String> = self.sub_images.keys().cloned().collect();
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let record = self.match_prepared(&key, &prepared, opts)?;
            self.matches.insert(key, record.clone());
            out.push(record);
        }
        Ok(out)
    }

    /// Visibility of each of `names` against a single frame.
    pub fn visible(&mut self, names: &[&str], opts: &MatchOptions) -> Result<Vec<bool>> {
        let keys: Vec<String> = names.iter().map(|n| registry_key(n)).collect();
        if let Some(missing) = keys.iter().position(|k| !self.sub_images.contains_key(k)) {
            return Err(BotError::SubImageNotFound(names[missing].to_string()));
        }
        if opts.refresh_frame {
            self.refresh_frame()?;
        }
        let prepared = self.prepare(opts)?;
        let mut seen = Vec::with_capacity(keys.len());
        for key in keys {
            let record = self.match_prepared(&key, &prepared, opts)?;
            seen.push(record.found);
            self.matches.insert(key, record);
        }
        Ok(seen)
    }

    /// Transform the current frame once for a batch of matches.
    fn prepare(&self, opts: &MatchOptions) -> Result<PreparedFrame> {
        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| BotError::Capture("no frame captured yet".into()))?;
        Ok(PreparedFrame::new(frame, opts.grayscale))
    }

    fn match_prepared(&self, key: &str, prepared: &PreparedFrame, opts: &MatchOptions) -> Result<MatchRecord> {
        let sub = self
            .sub_images
            .get(key)
            .ok_or_else(|| BotError::SubImageNotFound(key.to_string()))?;

        let location = prepared
            .best_match(&sub.template)
            .filter(|m| m.score >= opts.threshold)
            .map(|m| m.location);
        let absolute = match (location, self.window.location) {
            (Some(local), Some(origin)) => Some(absolute_location(&origin, &local)),
            _ => None,
        };
        Ok(MatchRecord {
            name: sub.name.clone(),
            found: location.is_some(),
            location,
            absolute_location: absolute,
            updated_at: Local::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::platform::stub::StubScreen;
    use crate::types::DisplayInfo;

    fn registered_view(screen: StubScreen) -> ClientView {
        let mut view = ClientView::new(Box::new(screen), GameWindow::new("WowClassic.exe", "World of Warcraft"));
        for (_, name) in fixtures::SCENARIOS {
            view.register_sub_image(name, fixtures::indicator(name)).unwrap();
        }
        view
    }

    #[test]
    fn registry_lookup_is_trimmed_and_case_insensitive() {
        let (screen, _) = StubScreen::new();
        let mut view = registered_view(screen);
        assert_eq!(view.sub_image("  Leave_Battleground ").unwrap().name, "leave_battleground");
        assert!(view.try_sub_image("mount_icon").is_none());
        assert!(matches!(view.sub_image("mount_icon"), Err(BotError::SubImageNotFound(_))));
        assert!(matches!(
            view.register_sub_image("RESURRECTION", RgbaImage::new(2, 2)),
            Err(BotError::DuplicateSubImage(_))
        ));
    }

    #[test]
    fn each_scenario_frame_shows_exactly_its_indicator() {
        let (screen, frame) = StubScreen::with_frame(fixtures::frame_showing(&[]));
        let mut view = registered_view(screen);
        let opts = MatchOptions::new(0.75, true);
        for (scenario, expected) in fixtures::SCENARIOS {
            *frame.lock().unwrap() = fixtures::scenario_frame(scenario);
            let found: Vec<String> = view
                .update_all(&opts)
                .unwrap()
                .into_iter()
                .filter(|r| r.found)
                .map(|r| r.name)
                .collect();
            assert_eq!(found, vec![expected.to_string()], "scenario {}", scenario);
        }
    }

    #[test]
    fn window_lookup_errors_are_distinct() {
        let (screen, _) = StubScreen::new();
        let mut w = GameWindow::new("WowClassic.exe", "World of Warcraft");
        let absent = screen.with_process("Other.exe");
        let err = w.refresh(&absent).unwrap_err();
        assert!(matches!(err, BotError::ProcessNotRunning(_)));
        assert!(!w.is_open);

        let (screen, _) = StubScreen::new();
        let untitled = screen.with_process("WowClassic.exe").with_title("Battle.net");
        let err = w.refresh(&untitled).unwrap_err();
        assert!(matches!(err, BotError::WindowNotFound { .. }));
    }

    #[test]
    fn window_must_sit_on_exactly_one_display() {
        let (screen, _) = StubScreen::new();
        let screen = screen.with_window(Some(Rect::new(0, 0, 800, 600))).with_displays(vec![
            DisplayInfo { name: "a".into(), bbox: Rect::new(0, 0, 1920, 1080) },
            DisplayInfo { name: "b".into(), bbox: Rect::new(-10, -10, 1920, 1080) },
        ]);
        let mut view = registered_view(screen);
        assert!(matches!(view.locate_display(), Err(BotError::AmbiguousDisplay { count: 2 })));

        let (screen, _) = StubScreen::new();
        let screen = screen
            .with_window(Some(Rect::new(0, 0, 800, 600)))
            .with_displays(vec![DisplayInfo { name: "a".into(), bbox: Rect::new(1920, 0, 1920, 1080) }]);
        let mut view = registered_view(screen);
        assert!(matches!(view.locate_display(), Err(BotError::DisplayNotFound)));
    }

    #[test]
    fn hits_are_reported_in_window_and_screen_space() {
        let tpl = fixtures::indicator("enter_battle");
        // window at (40, 30) inside a 320x240 display at screen (1000, 0)
        let inner = fixtures::frame_with(&[(&tpl, 20, 10)], 3);
        let mut full = RgbaImage::new(320, 240);
        imageops::replace(&mut full, &inner, 40, 30);

        let (screen, _) = StubScreen::with_frame(full);
        let screen = screen
            .with_window(Some(Rect::new(1040, 30, 160, 120)))
            .with_displays(vec![DisplayInfo { name: "right".into(), bbox: Rect::new(1000, 0, 320, 240) }]);
        let mut view = registered_view(screen);

        let rec = view.update_location("enter_battle", &MatchOptions::new(0.9, true)).unwrap();
        assert!(rec.found);
        assert_eq!(rec.location, Some(Span::new(20, 10, 36, 26)));
        assert_eq!(rec.absolute_location, Some(Span::new(1060, 40, 1076, 56)));
        assert_eq!(view.frame().unwrap().dimensions(), (160, 120));
        assert_eq!(view.display().unwrap().index, 0);
    }

    #[test]
    fn miss_replaces_previous_hit() {
        let (screen, frame) = StubScreen::with_frame(fixtures::frame_showing(&["join_battle"]));
        let mut view = registered_view(screen);
        let opts = MatchOptions::new(0.75, true);
        assert!(view.update_location("join_battle", &opts).unwrap().found);

        *frame.lock().unwrap() = fixtures::frame_showing(&[]);
        let rec = view.update_location("join_battle", &opts).unwrap();
        assert!(!rec.found);
        assert_eq!(rec.location, None);
        assert_eq!(view.last_match("JOIN_BATTLE"), Some(&rec));
    }

    #[test]
    fn loaded_frame_is_matched_without_capture() {
        let (screen, _) = StubScreen::new();
        let mut view = registered_view(screen.with_window(None));
        view.load_frame(fixtures::scenario_frame("av_end"));
        let seen = view
            .visible(&["leave_battleground", "resurrection"], &MatchOptions::new(0.75, true).cached())
            .unwrap();
        assert_eq!(seen, vec![true, false]);
        let rec = view.last_match("leave_battleground").unwrap();
        assert_eq!(rec.location, rec.absolute_location);
    }
}
