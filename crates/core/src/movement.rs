//! Turning coarse `{units, rotation}` commands into timed key holds.
//!
//! Holding forward for one second covers `forward_speed` units. A turn of
//! fraction `f` of a full circle holds the turn key for
//! `f * curve(f) * full_turn_secs`, where the curve is interpolated from five
//! calibration points and differs for a moving and a standing character.

use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::error::{BotError, Result};
use crate::input::Controller;
use crate::logger;
use crate::screen::{indicators, ClientView, MatchOptions};
use crate::settings::{KeyBindings, MovementSettings};
use crate::sleep::{self, sleep_cancellable};

/// Tolerance for plan comparisons so that re-planning a plan is a no-op.
const EPS: f64 = 1e-9;

/// Rotation fractions of the five calibration points.
const CURVE_X: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Raw movement: walk `units` while turning `rotation` of a full circle
/// (negative turns left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementCommand {
    pub units: f64,
    pub rotation: f64,
}

impl MovementCommand {
    pub fn new(units: f64, rotation: f64) -> Self {
        Self { units, rotation }
    }

    pub fn forward(units: f64) -> Self {
        Self { units, rotation: 0.0 }
    }
}

/// A command with its derived timings, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedMovement {
    pub units: f64,
    pub rotation: f64,
    pub rotation_time: f64,
    pub forward_time: f64,
    pub execution_time: f64,
}

impl PlannedMovement {
    pub fn command(&self) -> MovementCommand {
        MovementCommand::new(self.units, self.rotation)
    }
}

/// Fraction of a full turn a rotation amounts to. A rotation of exactly
/// 1.0 is a full turn; anything else wraps modulo one.
pub fn rotation_fraction(rotation: f64) -> f64 {
    if rotation == 1.0 {
        1.0
    } else {
        rotation.abs() % 1.0
    }
}

/// Piecewise-linear lookup on the calibration curve, clamped to [0, 1].
fn interpolate(x: f64, curve: &[f64; 5]) -> f64 {
    let x = x.clamp(0.0, 1.0);
    for i in 1..CURVE_X.len() {
        if x <= CURVE_X[i] {
            let t = (x - CURVE_X[i - 1]) / (CURVE_X[i] - CURVE_X[i - 1]);
            return curve[i - 1] + t * (curve[i] - curve[i - 1]);
        }
    }
    curve[4]
}

/// Calibrated character speeds.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnProfile {
    pub forward_speed: f64,
    pub full_turn_secs: f64,
    pub idle_curve: [f64; 5],
    pub moving_curve: [f64; 5],
}

impl Default for TurnProfile {
    fn default() -> Self {
        Self::from(&MovementSettings::default())
    }
}

impl From<&MovementSettings> for TurnProfile {
    fn from(s: &MovementSettings) -> Self {
        Self {
            forward_speed: s.forward_speed,
            full_turn_secs: s.full_turn_secs,
            idle_curve: s.idle_curve,
            moving_curve: s.moving_curve,
        }
    }
}

impl TurnProfile {
    pub fn rotation_time(&self, units: f64, rotation: f64) -> f64 {
        let fraction = rotation_fraction(rotation);
        let curve = if units > 0.0 { &self.moving_curve } else { &self.idle_curve };
        fraction * interpolate(fraction, curve) * self.full_turn_secs
    }

    pub fn plan(&self, cmd: MovementCommand) -> PlannedMovement {
        let rotation_time = self.rotation_time(cmd.units, cmd.rotation);
        let forward_time = cmd.units / self.forward_speed;
        PlannedMovement {
            units: cmd.units,
            rotation: cmd.rotation,
            rotation_time,
            forward_time,
            execution_time: rotation_time.max(forward_time),
        }
    }

    /// Split long straight stretches into steps of at most one second so a
    /// cancellation is noticed quickly. Short commands and commands whose
    /// turn outlasts the walk are kept whole.
    pub fn preprocess(&self, commands: &[MovementCommand]) -> Vec<PlannedMovement> {
        let mut out = Vec::with_capacity(commands.len());
        for &cmd in commands {
            let planned = self.plan(cmd);
            if planned.execution_time <= 1.0 + EPS
                || planned.rotation_time + EPS >= planned.forward_time
            {
                out.push(planned);
                continue;
            }

            let mut remaining = cmd.units;
            if planned.rotation_time > 0.0 {
                let during_turn = planned.rotation_time / planned.execution_time * cmd.units;
                remaining -= during_turn;
                out.push(self.plan(MovementCommand::new(during_turn, cmd.rotation)));
            }

            let steps = remaining / self.forward_speed;
            let whole = steps.floor() as usize;
            for _ in 0..whole {
                out.push(self.plan(MovementCommand::forward(self.forward_speed)));
            }
            let rest = (steps - whole as f64) * self.forward_speed;
            if rest > EPS {
                out.push(self.plan(MovementCommand::forward(rest)));
            }
        }
        out
    }
}

/// Mounted characters cover twice the distance per second.
pub fn adjust_for_mount(commands: &[MovementCommand], mounted: bool) -> Vec<MovementCommand> {
    commands
        .iter()
        .map(|c| if mounted { MovementCommand::new(c.units / 2.0, c.rotation) } else { *c })
        .collect()
}

/// `n` commands with uniform distance and zero-centred Gaussian rotation.
pub fn generate_random_movements<R: Rng>(
    rng: &mut R,
    n: usize,
    units_range: [f64; 2],
    rotation_sigma: f64,
) -> Vec<MovementCommand> {
    let normal = Normal::new(0.0, rotation_sigma.abs()).ok();
    (0..n)
        .map(|_| {
            let units = if units_range[1] > units_range[0] {
                rng.gen_range(units_range[0]..=units_range[1])
            } else {
                units_range[0]
            };
            let rotation = match &normal {
                Some(d) => d.sample(&mut *rng),
                None => 0.0,
            };
            MovementCommand::new(units, rotation)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementKeys {
    pub forward: String,
    pub turn_left: String,
    pub turn_right: String,
}

impl From<&KeyBindings> for MovementKeys {
    fn from(k: &KeyBindings) -> Self {
        Self {
            forward: k.forward.clone(),
            turn_left: k.turn_left.clone(),
            turn_right: k.turn_right.clone(),
        }
    }
}

impl MovementKeys {
    pub fn all(&self) -> [&str; 3] {
        [self.forward.as_str(), self.turn_left.as_str(), self.turn_right.as_str()]
    }

    fn turn_key(&self, rotation: f64) -> &str {
        if rotation < 0.0 {
            self.turn_left.as_str()
        } else {
            self.turn_right.as_str()
        }
    }
}

/// Drives a `Controller` through planned movements.
#[derive(Debug, Clone)]
pub struct MovementExecutor {
    pub profile: TurnProfile,
    pub keys: MovementKeys,
    pub poll_interval: Duration,
    pub watcher_join_timeout: Duration,
}

impl MovementExecutor {
    pub fn new(profile: TurnProfile, keys: MovementKeys) -> Self {
        Self {
            profile,
            keys,
            poll_interval: Duration::from_millis(250),
            watcher_join_timeout: Duration::from_secs(1),
        }
    }

    pub fn from_settings(movement: &MovementSettings, keys: &KeyBindings) -> Self {
        Self {
            poll_interval: Duration::from_millis(movement.poll_interval_ms),
            watcher_join_timeout: Duration::from_millis(movement.watcher_join_timeout_ms),
            ..Self::new(TurnProfile::from(movement), MovementKeys::from(keys))
        }
    }

    pub fn plan(&self, commands: &[MovementCommand], mounted: bool) -> Vec<PlannedMovement> {
        self.profile.preprocess(&adjust_for_mount(commands, mounted))
    }

    fn abort(&self, ctl: &mut Controller) -> bool {
        logger::info_p("move", "movement interrupted");
        ctl.release(&self.keys.all());
        false
    }

    /// Execute `commands`. Returns false if `cancel` fired first; either way
    /// no movement key is left held.
    pub fn run(
        &self,
        ctl: &mut Controller,
        commands: &[MovementCommand],
        mounted: bool,
        cancel: &CancellationToken,
    ) -> bool {
        let keys = &self.keys;
        ctl.release(&keys.all());
        let mut forward_down = false;

        for m in self.plan(commands, mounted) {
            if cancel.is_cancelled() {
                return self.abort(ctl);
            }
            let turn_key = keys.turn_key(m.rotation);

            if !forward_down && m.units > 0.0 {
                ctl.key_down(&keys.forward);
                forward_down = true;
            } else if forward_down && m.units <= 0.0 {
                ctl.key_up(&keys.forward);
                forward_down = false;
            }

            if m.rotation_time > m.forward_time {
                // walk while starting the turn, then finish it standing
                ctl.key_down(turn_key);
                if !sleep_cancellable(m.forward_time, cancel) {
                    return self.abort(ctl);
                }
                if forward_down {
                    ctl.key_up(&keys.forward);
                    forward_down = false;
                }
                if !sleep_cancellable(m.execution_time - m.forward_time, cancel) {
                    return self.abort(ctl);
                }
                ctl.key_up(turn_key);
            } else if m.rotation_time > 0.0 {
                ctl.key_down(turn_key);
                if !sleep_cancellable(m.rotation_time, cancel) {
                    return self.abort(ctl);
                }
                ctl.key_up(turn_key);
                if !sleep_cancellable(m.execution_time - m.rotation_time, cancel) {
                    return self.abort(ctl);
                }
            } else if !sleep_cancellable(m.execution_time, cancel) {
                return self.abort(ctl);
            }
        }

        ctl.release(&keys.all());
        true
    }

    /// Turn in place by `rotation` of a full circle.
    pub fn rotate(&self, ctl: &mut Controller, rotation: f64, cancel: &CancellationToken) -> bool {
        self.run(ctl, &[MovementCommand::new(0.0, rotation)], false, cancel)
    }

    /// Walk straight ahead without splitting.
    pub fn move_forward(&self, ctl: &mut Controller, units: f64, cancel: &CancellationToken) -> bool {
        ctl.key_down(&self.keys.forward);
        let done = sleep_cancellable(units / self.profile.forward_speed, cancel);
        ctl.key_up(&self.keys.forward);
        done
    }

    /// Run `commands` while a watcher thread polls `stop_when` against the
    /// view; a true result cancels the movement. With `early_check`, a true
    /// result before starting skips the movement entirely.
    ///
    /// Returns whether the movement ran to completion. A predicate error
    /// stops the movement and is returned once the watcher has exited.
    #[allow(clippy::too_many_arguments)]
    pub fn run_until_condition<F>(
        &self,
        view: &mut ClientView,
        ctl: &mut Controller,
        commands: &[MovementCommand],
        mounted: bool,
        early_check: bool,
        shutdown: &CancellationToken,
        mut stop_when: F,
    ) -> Result<bool>
    where
        F: FnMut(&mut ClientView) -> Result<bool> + Send,
    {
        if early_check && stop_when(&mut *view)? {
            logger::info_p("move", "stop condition already met, not moving");
            return Ok(false);
        }

        let movement = shutdown.child();
        let finished = CancellationToken::new();
        let poll = self.poll_interval.as_secs_f64();

        let (completed, watched) = thread::scope(|s| {
            let watcher_movement = movement.clone();
            let watcher_finished = finished.clone();
            let watcher = s.spawn(move || -> Result<()> {
                while !watcher_finished.is_cancelled() && !watcher_movement.is_cancelled() {
                    match stop_when(&mut *view) {
                        Ok(true) => {
                            logger::info_p("move", "stop condition met");
                            watcher_movement.cancel();
                            break;
                        }
                        Ok(false) => {}
                        Err(e) => {
                            watcher_movement.cancel();
                            return Err(e);
                        }
                    }
                    sleep_cancellable(poll, &watcher_finished);
                }
                Ok(())
            });

            let completed = self.run(ctl, commands, mounted, &movement);
            finished.cancel();

            let deadline = Instant::now() + self.watcher_join_timeout;
            while !watcher.is_finished() && Instant::now() < deadline {
                thread::sleep(sleep::SLICE);
            }
            if !watcher.is_finished() {
                logger::warn_p("move", "condition watcher still busy after movement ended");
            }
            (completed, watcher.join())
        });

        ctl.release(&self.keys.all());
        match watched {
            Ok(Ok(())) => Ok(completed),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BotError::WatcherPanicked),
        }
    }

    /// Move until the character dies or the match ends.
    #[allow(clippy::too_many_arguments)]
    pub fn move_until_death(
        &self,
        view: &mut ClientView,
        ctl: &mut Controller,
        commands: &[MovementCommand],
        mounted: bool,
        early_check: bool,
        opts: &MatchOptions,
        shutdown: &CancellationToken,
    ) -> Result<bool> {
        let opts = *opts;
        self.run_until_condition(view, ctl, commands, mounted, early_check, shutdown, move |v| {
            let seen = v.visible(&[indicators::RESURRECTION, indicators::LEAVE_BATTLEGROUND], &opts)?;
            Ok(seen.into_iter().any(|s| s))
        })
    }
}

/// Summon the mount unless the mounted indicator is already showing.
/// Returns whether it shows afterwards.
pub fn mount_up(
    view: &mut ClientView,
    ctl: &mut Controller,
    mount_key: &str,
    opts: &MatchOptions,
    wait_secs: [f64; 2],
) -> Result<bool> {
    if view.update_location(indicators::MOUNT_ICON, opts)?.found {
        return Ok(true);
    }
    ctl.release(&[mount_key]);
    ctl.tap(mount_key, sleep::uniform(0.1, 0.2));
    sleep::sleep_between(wait_secs);
    let mounted = view.update_location(indicators::MOUNT_ICON, opts)?.found;
    logger::info_p("move", if mounted { "mounted" } else { "mount did not show up" });
    Ok(mounted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::platform::stub::{EventLog, StubInput, StubScreen};
    use crate::screen::GameWindow;
    use crate::types::{InputEvent, KeyAction};
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_executor() -> MovementExecutor {
        let profile = TurnProfile { forward_speed: 100.0, full_turn_secs: 0.04, ..TurnProfile::default() };
        let mut exec = MovementExecutor::new(profile, MovementKeys::from(&KeyBindings::default()));
        exec.poll_interval = Duration::from_millis(5);
        exec
    }

    fn controller() -> (Controller, EventLog) {
        let (input, events) = StubInput::new();
        (Controller::new(Box::new(input)).instant_pointer(), events)
    }

    fn key_downs(events: &EventLog, key: &str) -> usize {
        events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| **e == InputEvent::Key(key.into(), KeyAction::Down))
            .count()
    }

    fn view_showing(names: &[&str]) -> ClientView {
        let (screen, _) = StubScreen::with_frame(fixtures::frame_showing(names));
        let mut view = ClientView::new(Box::new(screen), GameWindow::new("WowClassic.exe", "World of Warcraft"));
        for name in [indicators::RESURRECTION, indicators::LEAVE_BATTLEGROUND, indicators::MOUNT_ICON] {
            view.register_sub_image(name, fixtures::indicator(name)).unwrap();
        }
        view
    }

    #[test]
    fn rotation_fraction_wraps_except_full_turn() {
        assert_eq!(rotation_fraction(1.0), 1.0);
        assert_eq!(rotation_fraction(-1.0), 0.0);
        assert!((rotation_fraction(-0.25) - 0.25).abs() < 1e-12);
        assert!((rotation_fraction(1.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn curve_interpolates_between_calibration_points() {
        let curve = [1.0, 0.90, 0.88, 0.87, 0.86];
        assert_eq!(interpolate(0.0, &curve), 1.0);
        assert!((interpolate(0.5, &curve) - 0.88).abs() < 1e-12);
        assert!((interpolate(0.125, &curve) - 0.95).abs() < 1e-12);
        assert_eq!(interpolate(2.0, &curve), 0.86);
    }

    #[test]
    fn stationary_and_moving_turns_use_different_curves() {
        let p = TurnProfile::default();
        assert!((p.rotation_time(0.0, 0.25) - 0.25 * 0.95 * 2.0).abs() < 1e-12);
        assert!((p.rotation_time(5.0, 0.25) - 0.25 * 0.90 * 2.0).abs() < 1e-12);
        assert!((p.rotation_time(0.0, 1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn long_straight_walk_is_split_into_unit_steps() {
        let p = TurnProfile::default();
        let plan = p.preprocess(&[MovementCommand::forward(100.0)]);
        assert!(plan.len() >= 100);
        let total: f64 = plan.iter().map(|m| m.units).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert!(plan.iter().all(|m| m.rotation == 0.0 && m.execution_time <= 1.0 + 1e-9));
    }

    #[test]
    fn split_keeps_turn_in_first_slice() {
        let p = TurnProfile::default();
        let plan = p.preprocess(&[MovementCommand::new(10.5, 0.25)]);
        assert_eq!(plan[0].rotation, 0.25);
        assert!((plan[0].forward_time - plan[0].rotation_time).abs() < 1e-9);
        assert!(plan[1..].iter().all(|m| m.rotation == 0.0));
        let total: f64 = plan.iter().map(|m| m.units).sum();
        assert!((total - 10.5).abs() < 1e-9);
    }

    #[test]
    fn short_and_turn_heavy_commands_are_kept_whole() {
        let p = TurnProfile::default();
        let cmds = [MovementCommand::new(0.8, 0.1), MovementCommand::new(1.2, 0.9)];
        let plan = p.preprocess(&cmds);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].command(), cmds[0]);
        assert_eq!(plan[1].command(), cmds[1]);
    }

    #[test]
    fn preprocessing_is_idempotent() {
        let p = TurnProfile::default();
        let mut rng = StdRng::seed_from_u64(21);
        let mut cmds = generate_random_movements(&mut rng, 40, [0.0, 60.0], 0.4);
        cmds.push(MovementCommand::forward(100.0));
        cmds.push(MovementCommand::new(3.0, 1.0));
        let once = p.preprocess(&cmds);
        let again: Vec<MovementCommand> = once.iter().map(PlannedMovement::command).collect();
        assert_eq!(p.preprocess(&again), once);
    }

    #[test]
    fn mounting_halves_distance() {
        let cmds = [MovementCommand::new(10.0, 0.3)];
        assert_eq!(adjust_for_mount(&cmds, true), vec![MovementCommand::new(5.0, 0.3)]);
        assert_eq!(adjust_for_mount(&cmds, false), cmds.to_vec());
    }

    #[test]
    fn random_movements_respect_ranges() {
        let mut rng = StdRng::seed_from_u64(3);
        let cmds = generate_random_movements(&mut rng, 200, [5.0, 40.0], 0.2);
        assert_eq!(cmds.len(), 200);
        assert!(cmds.iter().all(|c| (5.0..=40.0).contains(&c.units)));
        let mut rng2 = StdRng::seed_from_u64(3);
        assert_eq!(generate_random_movements(&mut rng2, 200, [5.0, 40.0], 0.2), cmds);
    }

    #[test]
    fn cancelled_before_start_holds_nothing() {
        let exec = fast_executor();
        let (mut ctl, events) = controller();
        let token = CancellationToken::new();
        token.cancel();
        let cmds = [MovementCommand::new(50.0, 0.3), MovementCommand::forward(20.0)];
        assert!(!exec.run(&mut ctl, &cmds, false, &token));
        assert!(ctl.held_keys().is_empty());
        assert_eq!(key_downs(&events, "w"), 0);
    }

    #[test]
    fn completed_run_releases_everything() {
        let exec = fast_executor();
        let (mut ctl, events) = controller();
        let token = CancellationToken::new();
        assert!(exec.run(&mut ctl, &[MovementCommand::new(2.0, -0.2)], false, &token));
        assert!(ctl.held_keys().is_empty());
        assert_eq!(key_downs(&events, "["), 1);
        assert_eq!(key_downs(&events, "]"), 0);
    }

    fn run_and_record(cmd: MovementCommand) -> Vec<InputEvent> {
        let exec = fast_executor();
        let (mut ctl, events) = controller();
        assert!(exec.run(&mut ctl, &[cmd], false, &CancellationToken::new()));
        let log = events.lock().unwrap().clone();
        log
    }

    fn down(key: &str) -> InputEvent {
        InputEvent::Key(key.into(), KeyAction::Down)
    }

    fn up(key: &str) -> InputEvent {
        InputEvent::Key(key.into(), KeyAction::Up)
    }

    #[test]
    fn long_turn_releases_forward_before_the_turn_key() {
        let plan = fast_executor().plan(&[MovementCommand::new(0.5, 0.5)], false);
        assert!(plan[0].rotation_time > plan[0].forward_time);

        assert_eq!(
            run_and_record(MovementCommand::new(0.5, 0.5)),
            vec![
                up("w"), up("["), up("]"),
                down("w"), down("]"),
                up("w"),
                up("]"),
                up("w"), up("["), up("]"),
            ]
        );
    }

    #[test]
    fn short_turn_keeps_walking_after_the_turn_key_lifts() {
        let plan = fast_executor().plan(&[MovementCommand::new(5.0, 0.1)], false);
        assert!(plan[0].rotation_time < plan[0].forward_time);

        assert_eq!(
            run_and_record(MovementCommand::new(5.0, 0.1)),
            vec![
                up("w"), up("["), up("]"),
                down("w"), down("]"),
                up("]"),
                up("w"), up("["), up("]"),
            ]
        );
    }

    #[test]
    fn forward_key_is_pressed_again_after_a_standing_turn() {
        let exec = fast_executor();
        let (mut ctl, events) = controller();
        let cmds = [
            MovementCommand::forward(1.0),
            MovementCommand::new(0.0, 0.5),
            MovementCommand::forward(1.0),
        ];
        assert!(exec.run(&mut ctl, &cmds, false, &CancellationToken::new()));
        assert_eq!(key_downs(&events, "w"), 2);
    }

    #[test]
    fn early_check_skips_movement_when_dead() {
        let exec = fast_executor();
        let mut view = view_showing(&[indicators::RESURRECTION]);
        let (mut ctl, events) = controller();
        let opts = MatchOptions::new(0.75, true);
        let moved = exec
            .move_until_death(&mut view, &mut ctl, &[MovementCommand::forward(100.0)], false, true, &opts, &CancellationToken::new())
            .unwrap();
        assert!(!moved);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn watcher_interrupts_a_long_walk() {
        let exec = fast_executor();
        let mut view = view_showing(&[]);
        let (mut ctl, _) = controller();
        let polls = AtomicUsize::new(0);
        let start = Instant::now();
        let completed = exec
            .run_until_condition(
                &mut view,
                &mut ctl,
                &[MovementCommand::forward(2_000.0)],
                false,
                false,
                &CancellationToken::new(),
                |_| Ok(polls.fetch_add(1, Ordering::SeqCst) >= 2),
            )
            .unwrap();
        assert!(!completed);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(ctl.held_keys().is_empty());
    }

    #[test]
    fn watcher_error_stops_movement_and_surfaces() {
        let exec = fast_executor();
        let mut view = view_showing(&[]);
        let (mut ctl, _) = controller();
        let result = exec.run_until_condition(
            &mut view,
            &mut ctl,
            &[MovementCommand::forward(2_000.0)],
            false,
            false,
            &CancellationToken::new(),
            |_| Err(BotError::Capture("gone".into())),
        );
        assert!(matches!(result, Err(BotError::Capture(_))));
        assert!(ctl.held_keys().is_empty());
    }

    #[test]
    fn short_walk_completes_under_watch() {
        let exec = fast_executor();
        let mut view = view_showing(&[]);
        let (mut ctl, _) = controller();
        let opts = MatchOptions::new(0.75, true);
        let completed = exec
            .move_until_death(&mut view, &mut ctl, &[MovementCommand::forward(5.0)], false, true, &opts, &CancellationToken::new())
            .unwrap();
        assert!(completed);
    }

    #[test]
    fn mount_up_only_presses_when_not_mounted() {
        let opts = MatchOptions::new(0.75, true);

        let mut view = view_showing(&[indicators::MOUNT_ICON]);
        let (mut ctl, events) = controller();
        assert!(mount_up(&mut view, &mut ctl, "t", &opts, [0.0, 0.0]).unwrap());
        assert!(events.lock().unwrap().is_empty());

        let mut view = view_showing(&[]);
        let (mut ctl, events) = controller();
        assert!(!mount_up(&mut view, &mut ctl, "t", &opts, [0.0, 0.0]).unwrap());
        assert_eq!(key_downs(&events, "t"), 1);
    }
}
