//! Logical keyboard/mouse state on top of an `InputDevice`.
//!
//! The controller remembers which keys it has pressed so that every exit
//! path can release exactly those keys.

use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::geometry::Rect;
use crate::platform::InputDevice;
use crate::sleep;
use crate::types::{KeyAction, MouseButton};

pub struct Controller {
    device: Box<dyn InputDevice>,
    held: BTreeSet<String>,
    /// Pointer path duration bounds in seconds.
    pointer_secs: (f64, f64),
}

impl Controller {
    pub fn new(device: Box<dyn InputDevice>) -> Self {
        Self { device, held: BTreeSet::new(), pointer_secs: (0.1, 0.2) }
    }

    /// Pointer moves complete without pausing between waypoints.
    pub fn instant_pointer(mut self) -> Self {
        self.pointer_secs = (0.0, 0.0);
        self
    }

    pub fn key_down(&mut self, key: &str) {
        self.device.send_key(key, KeyAction::Down);
        self.held.insert(key.to_string());
    }

    pub fn key_up(&mut self, key: &str) {
        self.device.send_key(key, KeyAction::Up);
        self.held.remove(key);
    }

    /// Press, hold for `hold_secs`, release.
    pub fn tap(&mut self, key: &str, hold_secs: f64) {
        self.key_down(key);
        sleep::sleep_secs(hold_secs);
        self.key_up(key);
    }

    pub fn press(&mut self, key: &str) {
        self.tap(key, 0.0);
    }

    /// `modifier`+`key` chord, e.g. ctrl+a.
    pub fn hotkey(&mut self, modifier: &str, key: &str) {
        self.key_down(modifier);
        self.press(key);
        self.key_up(modifier);
    }

    pub fn type_text(&mut self, text: &str) {
        self.device.type_text(text);
    }

    /// Send a key-up for each of `keys`, held or not.
    pub fn release(&mut self, keys: &[&str]) {
        for key in keys {
            self.key_up(key);
        }
    }

    /// Release every key this controller believes is held.
    pub fn release_all(&mut self) {
        let held: Vec<String> = self.held.iter().cloned().collect();
        for key in held {
            self.key_up(&key);
        }
    }

    pub fn held_keys(&self) -> Vec<String> {
        self.held.iter().cloned().collect()
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    pub fn click(&mut self, button: MouseButton) {
        self.device.click(button);
    }

    /// Physical state of `key` as the device reads it, independent of
    /// what this controller has pressed.
    pub fn key_pressed(&self, key: &str) -> bool {
        self.device.key_pressed(key)
    }

    pub fn pointer_position(&self) -> (i32, i32) {
        self.device.pointer_position()
    }

    /// Walk the pointer to (x, y) through 4-9 intermediate jittered points.
    ///
    /// Waypoints are evenly spaced on the straight line; all but the final
    /// one get Gaussian noise with sigma `ceil(0.01 * distance)`. The whole
    /// path takes 0.1-0.2 s split evenly across steps.
    pub fn move_pointer_humanlike(&mut self, x: i32, y: i32) {
        let mut rng = rand::thread_rng();
        let (x0, y0) = self.device.pointer_position();
        let (dx, dy) = ((x - x0) as f64, (y - y0) as f64);
        let distance = (dx * dx + dy * dy).sqrt();
        let sigma = (0.01 * distance).ceil();
        let noise = Normal::new(0.0, sigma).ok();

        let n_points: usize = rng.gen_range(5..=10);
        let total = sleep::uniform(self.pointer_secs.0, self.pointer_secs.1);
        let step = Duration::from_secs_f64(total / (n_points - 1) as f64);

        for i in 1..n_points {
            let t = i as f64 / (n_points - 1) as f64;
            let (mut px, mut py) = (x0 as f64 + dx * t, y0 as f64 + dy * t);
            if i < n_points - 1 && sigma > 0.0 {
                if let Some(n) = &noise {
                    px += n.sample(&mut rng);
                    py += n.sample(&mut rng);
                }
            }
            let (px, py) = if i == n_points - 1 { (x, y) } else { (px.round() as i32, py.round() as i32) };
            self.device.move_pointer(px, py);
            if !step.is_zero() {
                thread::sleep(step);
            }
        }
    }

    /// Human-like move to the centre of `rect`, then left click.
    pub fn click_rect(&mut self, rect: &Rect) {
        let (x, y) = rect.center();
        self.move_pointer_humanlike(x, y);
        self.device.click(MouseButton::Left);
    }
}
