use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

/// Everything tunable, persisted as `settings.json`. Missing fields take
/// their defaults so a partial file is fine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client: ClientSettings,
    pub matching: MatchSettings,
    pub keys: KeyBindings,
    pub movement: MovementSettings,
    pub battleground: BattlegroundSettings,
    pub farm: FarmSettings,
    pub assets: AssetSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub process_name: String,
    pub window_title: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            process_name: "WowClassic.exe".into(),
            window_title: "World of Warcraft".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    pub threshold: f64,
    pub grayscale: bool,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self { threshold: 0.75, grayscale: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: String,
    pub turn_left: String,
    pub turn_right: String,
    pub mount: String,
    pub interact: String,
    pub target_dummy: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".into(),
            turn_left: "[".into(),
            turn_right: "]".into(),
            mount: "t".into(),
            interact: "/".into(),
            target_dummy: "3".into(),
        }
    }
}

impl KeyBindings {
    /// Keys held during locomotion; released on every exit path.
    pub fn movement_keys(&self) -> [&str; 3] {
        [self.forward.as_str(), self.turn_left.as_str(), self.turn_right.as_str()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Distance units covered per second of holding forward.
    pub forward_speed: f64,
    /// Seconds a stationary character needs for a full turn.
    pub full_turn_secs: f64,
    /// Turn-time factors at rotation fractions 0, 1/4, 1/2, 3/4, 1.
    pub idle_curve: [f64; 5],
    pub moving_curve: [f64; 5],
    pub poll_interval_ms: u64,
    pub watcher_join_timeout_ms: u64,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            forward_speed: 1.0,
            full_turn_secs: 2.0,
            idle_curve: [0.0, 0.95, 0.98, 0.99, 1.0],
            moving_curve: [1.0, 0.90, 0.88, 0.87, 0.86],
            poll_interval_ms: 250,
            watcher_join_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattlegroundSettings {
    pub games: u32,
    pub target_name: String,
    pub max_wait_secs: f64,
    pub pop_poll_secs: f64,
    pub reload_wait_secs: f64,
    pub loading_secs: [f64; 2],
    pub leave_cooldown_secs: [f64; 2],
    pub dead_wait_secs: f64,
    pub mount_wait_secs: [f64; 2],
    /// Settle time after UI actions (clicks, chat, focus).
    pub ui_delay_secs: f64,
    pub random_batch: usize,
    pub units_range: [f64; 2],
    pub rotation_sigma: f64,
    pub revive_units: f64,
    pub exit_script: String,
    pub farm_script: String,
}

impl Default for BattlegroundSettings {
    fn default() -> Self {
        Self {
            games: 25,
            target_name: "Thelman Slatefist".into(),
            max_wait_secs: 400.0,
            pop_poll_secs: 2.0,
            reload_wait_secs: 5.0,
            loading_secs: [115.0, 120.0],
            leave_cooldown_secs: [10.0, 15.0],
            dead_wait_secs: 5.0,
            mount_wait_secs: [3.0, 3.2],
            ui_delay_secs: 0.5,
            random_batch: 10,
            units_range: [5.0, 40.0],
            rotation_sigma: 0.2,
            revive_units: 100.0,
            exit_script: "move_out_of_cave".into(),
            farm_script: "move_to_harpies".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmSettings {
    pub count: u32,
    pub loot_wait_secs: [f64; 2],
    pub cooldown_secs: [f64; 2],
}

impl Default for FarmSettings {
    fn default() -> Self {
        Self {
            count: 30,
            loot_wait_secs: [18.0, 20.0],
            cooldown_secs: [100.0, 102.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    pub templates_dir: PathBuf,
    pub movements_dir: PathBuf,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("data"),
            movements_dir: PathBuf::from("movements"),
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings: Self =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        settings.validate().with_context(|| format!("validating {}", path.display()))?;
        Ok(settings)
    }

    /// Reject values the planner and the waits cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let m = &self.movement;
        ensure!(
            m.forward_speed.is_finite() && m.forward_speed > 0.0,
            "movement.forward_speed must be positive, got {}",
            m.forward_speed
        );
        duration("movement.full_turn_secs", m.full_turn_secs)?;
        for (name, curve) in [("movement.idle_curve", &m.idle_curve), ("movement.moving_curve", &m.moving_curve)] {
            ensure!(curve.iter().all(|v| v.is_finite() && *v >= 0.0), "{} must be finite and non-negative", name);
        }
        ensure!(m.poll_interval_ms > 0, "movement.poll_interval_ms must be positive");

        let t = self.matching.threshold;
        ensure!((0.0..=1.0).contains(&t), "matching.threshold must lie in [0, 1], got {}", t);

        let bg = &self.battleground;
        duration("battleground.max_wait_secs", bg.max_wait_secs)?;
        duration("battleground.pop_poll_secs", bg.pop_poll_secs)?;
        duration("battleground.reload_wait_secs", bg.reload_wait_secs)?;
        duration("battleground.dead_wait_secs", bg.dead_wait_secs)?;
        duration("battleground.ui_delay_secs", bg.ui_delay_secs)?;
        duration("battleground.revive_units", bg.revive_units)?;
        duration("battleground.rotation_sigma", bg.rotation_sigma)?;
        range("battleground.loading_secs", bg.loading_secs)?;
        range("battleground.leave_cooldown_secs", bg.leave_cooldown_secs)?;
        range("battleground.mount_wait_secs", bg.mount_wait_secs)?;
        range("battleground.units_range", bg.units_range)?;
        range("farm.loot_wait_secs", self.farm.loot_wait_secs)?;
        range("farm.cooldown_secs", self.farm.cooldown_secs)?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    /// Zero every wait so scripted scenarios run instantly.
    pub fn without_waits(mut self) -> Self {
        let bg = &mut self.battleground;
        bg.max_wait_secs = 0.0;
        bg.pop_poll_secs = 0.0;
        bg.reload_wait_secs = 0.0;
        bg.loading_secs = [0.0, 0.0];
        bg.leave_cooldown_secs = [0.0, 0.0];
        bg.dead_wait_secs = 0.0;
        bg.mount_wait_secs = [0.0, 0.0];
        bg.ui_delay_secs = 0.0;
        self.farm.loot_wait_secs = [0.0, 0.0];
        self.farm.cooldown_secs = [0.0, 0.0];
        self.movement.poll_interval_ms = 5;
        self
    }
}

fn duration(name: &str, v: f64) -> anyhow::Result<()> {
    ensure!(v.is_finite() && v >= 0.0, "{} must be finite and non-negative, got {}", name, v);
    Ok(())
}

fn range(name: &str, r: [f64; 2]) -> anyhow::Result<()> {
    duration(name, r[0])?;
    duration(name, r[1])?;
    ensure!(r[0] <= r[1], "{} is inverted: [{}, {}]", name, r[0], r[1]);
    Ok(())
}
