//! The AFK battleground loop: queue, wait for the pop, walk out of the
//! cave, then keep moving until the match ends, for a number of matches.

use std::time::Instant;

use crate::chat::{focus_client, reload_client, send_chat_command};
use crate::error::Result;
use crate::logger;
use crate::movement::{generate_random_movements, mount_up, MovementCommand};
use crate::screen::indicators;
use crate::session::Session;
use crate::types::BotState;

/// Run the configured number of matches. Returns how many completed.
/// Any error ends the whole run after releasing held keys.
pub fn run_afk_av(s: &mut Session) -> Result<u32> {
    let games = s.settings.battleground.games;
    s.update_status(|st| {
        st.routine = "afk-av".into();
        st.games = games;
        st.completed = 0;
    });
    logger::info_p("bg", &format!("starting {} battleground(s)", games));

    match play_matches(s, games) {
        Ok(done) => {
            s.release_keys();
            s.set_state(BotState::Done, &format!("{} match(es) completed", done));
            logger::info_p("bg", &format!("done: {} match(es)", done));
            Ok(done)
        }
        Err(e) => {
            s.fail(&e);
            Err(e)
        }
    }
}

fn play_matches(s: &mut Session, games: u32) -> Result<u32> {
    let bg = s.settings.battleground.clone();
    // both scripts are needed every match; fail before queuing
    s.view.script(&bg.exit_script)?;
    s.view.script(&bg.farm_script)?;

    focus_client(&mut s.view, bg.ui_delay_secs);
    s.release_keys();

    let mut completed = 0;
    for i in 0..games {
        s.ensure_running()?;
        s.update_status(|st| st.match_index = i + 1);
        play_match(s)?;
        completed += 1;
        s.update_status(|st| st.completed = completed);
        logger::info_p("bg", &format!("completed battleground #{}", i + 1));
    }
    Ok(completed)
}

fn play_match(s: &mut Session) -> Result<()> {
    if queue(s)? {
        if !wait_for_pop(s)? {
            logger::warn_p("bg", "battleground did not pop; carrying on");
        }
    } else {
        logger::warn_p("bg", "could not queue; carrying on");
    }
    navigate(s)?;
    hold_position(s)?;
    leave_match(s)
}

/// Target the battlemaster and talk to it.
pub fn queue(s: &mut Session) -> Result<bool> {
    s.set_state(BotState::Queuing, "targeting battlemaster");
    s.release_keys();
    let opts = s.opts();
    let bg = s.settings.battleground.clone();

    focus_client(&mut s.view, bg.ui_delay_secs);
    reload_client(&mut s.view, &mut s.ctl, &opts, bg.ui_delay_secs, bg.reload_wait_secs)?;
    s.ensure_running()?;

    let command = format!("/tar {}", bg.target_name);
    if !send_chat_command(&mut s.view, &mut s.ctl, &command, &opts, bg.ui_delay_secs)? {
        return Ok(false);
    }
    s.wait(bg.ui_delay_secs)?;

    let interact = s.settings.keys.interact.clone();
    s.ctl.press(&interact);
    s.wait(bg.ui_delay_secs)?;
    Ok(true)
}

/// Click `name` if it is on screen right now.
fn click_if_visible(s: &mut Session, name: &str) -> Result<bool> {
    let opts = s.opts();
    let rec = s.view.update_location(name, &opts)?;
    match rec.absolute_rect() {
        Some(rect) => {
            s.ctl.click_rect(&rect);
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Open the queue dialog, join, then poll for the enter prompt.
pub fn wait_for_pop(s: &mut Session) -> Result<bool> {
    s.set_state(BotState::WaitingForPop, "opening queue dialog");
    let bg = s.settings.battleground.clone();

    if !click_if_visible(s, indicators::QUEUE_FOR_BATTLEGROUND)? {
        logger::warn_p("bg", "queue dialog not found");
        return Ok(false);
    }
    s.wait(bg.ui_delay_secs)?;

    if !click_if_visible(s, indicators::JOIN_BATTLE)? {
        logger::warn_p("bg", "join confirmation not found");
        return Ok(false);
    }
    logger::info_p("bg", "queued");
    s.wait(bg.ui_delay_secs)?;

    s.set_state(BotState::WaitingForPop, &format!("waiting up to {}s", bg.max_wait_secs));
    let start = Instant::now();
    loop {
        if click_if_visible(s, indicators::ENTER_BATTLE)? {
            s.set_state(BotState::Entering, "entering battleground");
            logger::info_p("bg", "entering battleground");
            return Ok(true);
        }
        if start.elapsed().as_secs_f64() >= bg.max_wait_secs {
            break;
        }
        s.wait(bg.pop_poll_secs)?;
    }
    logger::warn_p("bg", "timed out waiting for the enter prompt");
    Ok(false)
}

/// Wait out the loading screen, leave the cave, mount, reach the spot.
pub fn navigate(s: &mut Session) -> Result<()> {
    s.set_state(BotState::Navigating, "loading");
    let bg = s.settings.battleground.clone();
    let opts = s.opts();
    s.wait_between(bg.loading_secs)?;

    s.set_state(BotState::Navigating, &bg.exit_script);
    let exit = s.view.script(&bg.exit_script)?.to_vec();
    move_watched(s, &exit, false)?;
    s.ensure_running()?;

    let mount_key = s.settings.keys.mount.clone();
    let mounted = mount_up(&mut s.view, &mut s.ctl, &mount_key, &opts, bg.mount_wait_secs)?;

    s.set_state(BotState::Navigating, &bg.farm_script);
    let spot = s.view.script(&bg.farm_script)?.to_vec();
    move_watched(s, &spot, mounted)?;
    Ok(())
}

/// Movement cut short by death or the end of the match.
fn move_watched(s: &mut Session, commands: &[MovementCommand], mounted: bool) -> Result<bool> {
    let opts = s.opts();
    let shutdown = s.shutdown().clone();
    s.executor
        .move_until_death(&mut s.view, &mut s.ctl, commands, mounted, true, &opts, &shutdown)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BattleStatus {
    Alive,
    Dead,
    Over,
    /// Both indicators on screen at once.
    Unclear,
}

/// Read both indicators from a single frame.
fn battle_status(s: &mut Session) -> Result<BattleStatus> {
    let opts = s.opts();
    let seen = s
        .view
        .visible(&[indicators::RESURRECTION, indicators::LEAVE_BATTLEGROUND], &opts)?;
    Ok(match (seen[0], seen[1]) {
        (false, false) => BattleStatus::Alive,
        (true, false) => BattleStatus::Dead,
        (false, true) => BattleStatus::Over,
        (true, true) => BattleStatus::Unclear,
    })
}

/// Keep moving around until the match is over, handling deaths.
pub fn hold_position(s: &mut Session) -> Result<()> {
    let bg = s.settings.battleground.clone();
    let opts = s.opts();
    let mut was_dead = false;

    loop {
        s.ensure_running()?;
        match battle_status(s)? {
            BattleStatus::Over => {
                logger::info_p("bg", "battle is over");
                return Ok(());
            }
            BattleStatus::Dead => {
                if !was_dead {
                    logger::info_p("bg", "dead, waiting for resurrection");
                }
                s.set_state(BotState::Dead, "waiting for resurrection");
                s.release_keys();
                was_dead = true;
                s.wait(bg.dead_wait_secs)?;
                continue;
            }
            BattleStatus::Unclear => {
                s.release_keys();
                s.wait(bg.pop_poll_secs)?;
                continue;
            }
            BattleStatus::Alive => {}
        }

        s.set_state(BotState::Active, "moving");
        if was_dead {
            // get clear of the graveyard
            move_watched(s, &[MovementCommand::forward(bg.revive_units)], false)?;
            was_dead = false;
            continue;
        }

        let mount_key = s.settings.keys.mount.clone();
        let mounted = mount_up(&mut s.view, &mut s.ctl, &mount_key, &opts, bg.mount_wait_secs)?;
        let batch = generate_random_movements(
            &mut rand::thread_rng(),
            bg.random_batch,
            bg.units_range,
            bg.rotation_sigma,
        );
        if !move_watched(s, &batch, mounted)? {
            s.release_keys();
        }
    }
}

/// Click the leave button and sit out the cooldown.
pub fn leave_match(s: &mut Session) -> Result<()> {
    s.set_state(BotState::MatchOver, "leaving battleground");
    s.release_keys();
    let bg = s.settings.battleground.clone();

    let rect = match s.view.last_match(indicators::LEAVE_BATTLEGROUND).and_then(|r| r.absolute_rect()) {
        Some(rect) => Some(rect),
        None => {
            let opts = s.opts();
            s.view.update_location(indicators::LEAVE_BATTLEGROUND, &opts)?.absolute_rect()
        }
    };
    match rect {
        Some(rect) => s.ctl.click_rect(&rect),
        None => logger::warn_p("bg", "leave button vanished before it could be clicked"),
    }
    s.wait_between(bg.leave_cooldown_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use crate::fixtures;
    use crate::session::testing::stub_session;
    use crate::types::{InputEvent, KeyAction, MouseButton};
    use std::thread;
    use std::time::Duration;

    fn with_scripts(s: &mut Session) {
        s.view.register_script("move_out_of_cave", vec![MovementCommand::new(20.0, 0.1)]);
        s.view.register_script("move_to_harpies", vec![MovementCommand::forward(30.0)]);
    }

    #[test]
    fn single_match_runs_to_completion_on_end_screen() {
        let (mut s, _, events) = stub_session(&[indicators::LEAVE_BATTLEGROUND]);
        with_scripts(&mut s);
        s.settings.battleground.games = 1;

        assert_eq!(run_afk_av(&mut s).unwrap(), 1);
        assert!(s.ctl.held_keys().is_empty());

        let status = s.status();
        assert_eq!(status.state, BotState::Done);
        assert_eq!(status.completed, 1);

        let log = events.lock().unwrap();
        assert!(log.contains(&InputEvent::Click(MouseButton::Left)));
        // death/match-end watcher stopped every walk before it began
        assert!(!log.contains(&InputEvent::Key("w".into(), KeyAction::Down)));
    }

    #[test]
    fn missing_script_aborts_before_queuing() {
        let (mut s, _, events) = stub_session(&[]);
        let err = run_afk_av(&mut s).unwrap_err();
        assert!(matches!(err, BotError::ScriptNotFound(_)));
        assert_eq!(s.status().state, BotState::Failed);
        assert!(!events.lock().unwrap().iter().any(|e| matches!(e, InputEvent::Click(_))));
    }

    #[test]
    fn stop_request_ends_the_run() {
        let (mut s, _, _) = stub_session(&[indicators::LEAVE_BATTLEGROUND]);
        with_scripts(&mut s);
        s.shutdown().cancel();
        assert!(matches!(run_afk_av(&mut s), Err(BotError::Stopped)));
        assert!(s.ctl.held_keys().is_empty());
    }

    #[test]
    fn pop_sequence_clicks_three_dialogs() {
        let (mut s, _, events) = stub_session(&[
            indicators::QUEUE_FOR_BATTLEGROUND,
            indicators::JOIN_BATTLE,
            indicators::ENTER_BATTLE,
        ]);
        assert!(wait_for_pop(&mut s).unwrap());
        let clicks = events.lock().unwrap().iter().filter(|e| matches!(e, InputEvent::Click(_))).count();
        assert_eq!(clicks, 3);
        assert_eq!(s.status().state, BotState::Entering);
    }

    #[test]
    fn pop_times_out_without_enter_prompt() {
        let (mut s, _, _) = stub_session(&[indicators::QUEUE_FOR_BATTLEGROUND, indicators::JOIN_BATTLE]);
        assert!(!wait_for_pop(&mut s).unwrap());
    }

    #[test]
    fn missing_queue_dialog_is_not_an_error() {
        let (mut s, _, _) = stub_session(&[]);
        assert!(!wait_for_pop(&mut s).unwrap());
    }

    #[test]
    fn dead_then_match_end_leaves_loop() {
        let (mut s, frame, _) = stub_session(&[]);
        *frame.lock().unwrap() = fixtures::scenario_frame("av_dead");
        let swapper = {
            let frame = frame.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                *frame.lock().unwrap() = fixtures::scenario_frame("av_end");
            })
        };
        hold_position(&mut s).unwrap();
        swapper.join().unwrap();
        assert!(s.ctl.held_keys().is_empty());
    }

    #[test]
    fn queue_targets_and_interacts() {
        let (mut s, _, events) = stub_session(&[indicators::CHAT_TYPING_BOX]);
        assert!(queue(&mut s).unwrap());
        let log = events.lock().unwrap();
        assert!(log.contains(&InputEvent::Text("/rl".into())));
        assert!(log.contains(&InputEvent::Text("/tar Thelman Slatefist".into())));
        assert_eq!(log.last(), Some(&InputEvent::Key("/".into(), KeyAction::Up)));
    }
}
