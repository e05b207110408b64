//! Recording and replay of key timelines.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::error::{BotError, Result};
use crate::input::Controller;
use crate::logger;
use crate::sleep::{sleep_cancellable, sleep_secs};

/// One key held from `start_time` to `end_time`, in recording seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keystroke {
    pub key: String,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press,
    Release,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimedAction {
    pub time: f64,
    pub action: Action,
    pub key: String,
}

pub fn load_keystrokes(path: &Path) -> Result<Vec<Keystroke>> {
    let text = fs::read_to_string(path)?;
    let strokes: Vec<Keystroke> =
        serde_json::from_str(&text).map_err(|e| BotError::asset(path, e.to_string()))?;
    for (i, k) in strokes.iter().enumerate() {
        if k.key.is_empty() {
            return Err(BotError::asset(path, format!("entry {} has an empty key", i)));
        }
        if !k.start_time.is_finite() || !k.end_time.is_finite() {
            return Err(BotError::asset(path, format!("entry {} has a non-finite time", i)));
        }
        if k.end_time < k.start_time {
            return Err(BotError::asset(path, format!("entry {} ends before it starts", i)));
        }
    }
    Ok(strokes)
}

pub fn save_keystrokes(path: &Path, strokes: &[Keystroke]) -> Result<()> {
    let text = serde_json::to_string_pretty(strokes).map_err(std::io::Error::from)?;
    fs::write(path, text)?;
    Ok(())
}

/// Builds strokes from key transitions. Times are seconds since recording
/// began.
#[derive(Debug, Default)]
pub struct Recorder {
    down_since: BTreeMap<String, f64>,
    strokes: Vec<Keystroke>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current state of `key`. Repeated samples in the same state
    /// are ignored.
    pub fn sample(&mut self, key: &str, pressed: bool, time: f64) {
        match (pressed, self.down_since.contains_key(key)) {
            (true, false) => {
                self.down_since.insert(key.to_string(), time);
                logger::info_p("move", &format!("{} pressed at {:.2}s", key, time));
            }
            (false, true) => {
                if let Some(start) = self.down_since.remove(key) {
                    logger::info_p(
                        "move",
                        &format!("{} released at {:.2}s, held {:.2}s", key, time, time - start),
                    );
                    self.strokes.push(Keystroke { key: key.to_string(), start_time: start, end_time: time });
                }
            }
            _ => {}
        }
    }

    pub fn is_down(&self, key: &str) -> bool {
        self.down_since.contains_key(key)
    }

    /// Close keys still held at `time` and return every stroke ordered by
    /// start time.
    pub fn finish(mut self, time: f64) -> Vec<Keystroke> {
        for (key, start) in std::mem::take(&mut self.down_since) {
            self.strokes.push(Keystroke { key, start_time: start, end_time: time.max(start) });
        }
        self.strokes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        self.strokes
    }
}

/// Sample the physical state of `keys` every `poll_secs` until `stop_key`
/// goes down or `cancel` fires.
pub fn record_keystrokes(
    ctl: &Controller,
    keys: &[String],
    stop_key: &str,
    poll_secs: f64,
    cancel: &CancellationToken,
) -> Vec<Keystroke> {
    let start = Instant::now();
    let mut recorder = Recorder::new();
    loop {
        let now = start.elapsed().as_secs_f64();
        if cancel.is_cancelled() || ctl.key_pressed(stop_key) {
            return recorder.finish(now);
        }
        for key in keys {
            recorder.sample(key, ctl.key_pressed(key), now);
        }
        sleep_secs(poll_secs);
    }
}

/// Flatten strokes into a press/release timeline sorted by time and shifted
/// so the first action happens at zero. Presses sort before releases at the
/// same instant.
pub fn parse_keystrokes(strokes: &[Keystroke]) -> Vec<TimedAction> {
    let mut actions: Vec<TimedAction> = strokes
        .iter()
        .flat_map(|k| {
            [
                TimedAction { time: k.start_time, action: Action::Press, key: k.key.clone() },
                TimedAction { time: k.end_time, action: Action::Release, key: k.key.clone() },
            ]
        })
        .collect();
    actions.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then_with(|| (a.action == Action::Release).cmp(&(b.action == Action::Release)))
    });

    if let Some(start) = actions.first().map(|a| a.time) {
        for a in &mut actions {
            a.time -= start;
        }
    }
    actions
}

/// Replay a timeline. Returns false when it is empty or was interrupted;
/// keys still held at interruption are released.
pub fn perform_keystrokes(
    ctl: &mut Controller,
    actions: &[TimedAction],
    cancel: &CancellationToken,
) -> bool {
    if actions.is_empty() {
        return false;
    }

    let mut pressed: BTreeSet<&str> = BTreeSet::new();
    for (i, a) in actions.iter().enumerate() {
        if cancel.is_cancelled() {
            return abort(ctl, &pressed);
        }
        match a.action {
            Action::Press => {
                ctl.key_down(&a.key);
                pressed.insert(&a.key);
            }
            Action::Release => {
                ctl.key_up(&a.key);
                pressed.remove(a.key.as_str());
            }
        }
        if let Some(next) = actions.get(i + 1) {
            if !sleep_cancellable(next.time - a.time, cancel) {
                return abort(ctl, &pressed);
            }
        }
    }
    true
}

fn abort(ctl: &mut Controller, pressed: &BTreeSet<&str>) -> bool {
    let keys: Vec<&str> = pressed.iter().copied().collect();
    ctl.release(&keys);
    logger::warn_p("move", &format!("keystroke replay interrupted, released {:?}", keys));
    false
}
