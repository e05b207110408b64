//! Spawning and looting target dummies on a cooldown.

use crate::chat::{focus_client, reload_client};
use crate::error::Result;
use crate::logger;
use crate::session::Session;
use crate::sleep::uniform;
use crate::types::{BotState, MouseButton};

/// Spawn and loot `count` dummies. Returns how many were looted; the first
/// failure ends the routine.
pub fn run_farm_dummies(s: &mut Session, count: u32) -> Result<u32> {
    s.update_status(|st| {
        st.routine = "farm-dummies".into();
        st.games = count;
        st.completed = 0;
    });

    match farm(s, count) {
        Ok(done) => {
            s.set_state(BotState::Done, &format!("looted {} dummies", done));
            logger::info_p("farm", &format!("done looting {} target dummies", done));
            Ok(done)
        }
        Err(e) => {
            s.fail(&e);
            Err(e)
        }
    }
}

fn farm(s: &mut Session, count: u32) -> Result<u32> {
    let cooldown = s.settings.farm.cooldown_secs;
    let mut looted = 0;
    for i in 0..count {
        s.ensure_running()?;
        s.update_status(|st| st.match_index = i + 1);
        spawn_then_loot(s)?;
        looted += 1;
        s.update_status(|st| st.completed = looted);
        s.set_state(BotState::Farming, "dummy cooldown");
        s.wait_between(cooldown)?;
    }
    Ok(looted)
}

/// Drop a dummy at the centre of the display, then loot it once it dies.
pub fn spawn_then_loot(s: &mut Session) -> Result<()> {
    s.set_state(BotState::Farming, "spawning dummy");
    let opts = s.opts();
    let delay = s.settings.battleground.ui_delay_secs;
    let key = s.settings.keys.target_dummy.clone();
    let loot_wait = s.settings.farm.loot_wait_secs;

    let (x, y) = s.view.locate_display()?.bbox.center();
    focus_client(&mut s.view, delay);
    reload_client(&mut s.view, &mut s.ctl, &opts, delay, s.settings.battleground.reload_wait_secs)?;

    s.ctl.move_pointer_humanlike(x, y);
    s.wait(uniform(0.1, 0.15))?;
    s.ctl.tap(&key, uniform(0.1, 0.15));
    s.wait(uniform(0.1, 0.15))?;
    s.ctl.click(MouseButton::Left);

    s.set_state(BotState::Farming, "waiting to loot");
    s.wait_between(loot_wait)?;
    s.ctl.click(MouseButton::Right);
    logger::info_p("farm", "looted dummy");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use crate::session::testing::stub_session;
    use crate::types::{InputEvent, KeyAction};

    #[test]
    fn dummies_are_spawned_and_looted() {
        let (mut s, _, events) = stub_session(&[]);
        assert_eq!(run_farm_dummies(&mut s, 2).unwrap(), 2);

        let log = events.lock().unwrap();
        let spawns = log.iter().filter(|e| **e == InputEvent::Key("3".into(), KeyAction::Down)).count();
        let loots = log.iter().filter(|e| **e == InputEvent::Click(MouseButton::Right)).count();
        assert_eq!((spawns, loots), (2, 2));
        // 160x120 stub display
        assert!(log.contains(&InputEvent::Move(80, 60)));
        assert_eq!(s.status().completed, 2);
    }

    #[test]
    fn stop_request_ends_farming() {
        let (mut s, _, _) = stub_session(&[]);
        s.shutdown().cancel();
        assert!(matches!(run_farm_dummies(&mut s, 5), Err(BotError::Stopped)));
    }
}
