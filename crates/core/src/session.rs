use std::sync::{Arc, Mutex};

use crate::cancel::CancellationToken;
use crate::error::{BotError, Result};
use crate::input::Controller;
use crate::logger;
use crate::movement::MovementExecutor;
use crate::screen::{ClientView, MatchOptions};
use crate::settings::Settings;
use crate::sleep::{sleep_cancellable, uniform};
use crate::types::{BotState, BotStatus};

/// Everything a routine drives: the client view, the input controller, the
/// tunables, and the status shared with the TUI.
pub struct Session {
    pub view: ClientView,
    pub ctl: Controller,
    pub settings: Settings,
    pub executor: MovementExecutor,
    status: Arc<Mutex<BotStatus>>,
    shutdown: CancellationToken,
}

impl Session {
    pub fn new(
        view: ClientView,
        ctl: Controller,
        settings: Settings,
        status: Arc<Mutex<BotStatus>>,
        shutdown: CancellationToken,
    ) -> Self {
        let executor = MovementExecutor::from_settings(&settings.movement, &settings.keys);
        Self { view, ctl, settings, executor, status, shutdown }
    }

    pub fn opts(&self) -> MatchOptions {
        MatchOptions::new(self.settings.matching.threshold, self.settings.matching.grayscale)
    }

    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn status(&self) -> BotStatus {
        self.status.lock().unwrap().clone()
    }

    pub fn update_status(&self, f: impl FnOnce(&mut BotStatus)) {
        f(&mut self.status.lock().unwrap());
    }

    pub fn set_state(&self, state: BotState, detail: &str) {
        self.update_status(|s| {
            s.state = state;
            s.detail = detail.to_string();
        });
    }

    /// `Err(Stopped)` once a stop was requested.
    pub fn ensure_running(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            Err(BotError::Stopped)
        } else {
            Ok(())
        }
    }

    pub fn wait(&self, secs: f64) -> Result<()> {
        if sleep_cancellable(secs, &self.shutdown) {
            Ok(())
        } else {
            Err(BotError::Stopped)
        }
    }

    pub fn wait_between(&self, range: [f64; 2]) -> Result<()> {
        self.wait(uniform(range[0], range[1]))
    }

    /// Release every key the controller holds plus the movement bindings.
    pub fn release_keys(&mut self) {
        self.ctl.release_all();
        let keys = self.settings.keys.movement_keys();
        self.ctl.release(&keys);
    }

    /// Log, release keys, and mark the routine failed.
    pub fn fail(&mut self, err: &BotError) {
        self.release_keys();
        match err {
            BotError::Stopped => {
                logger::warn_p("bg", "stopped by user");
                self.set_state(BotState::Done, "stopped");
            }
            e => {
                logger::error_p("bg", &format!("aborting: {}", e));
                self.set_state(BotState::Failed, &e.to_string());
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::stub_session;
    use super::*;

    #[test]
    fn wait_reports_stop() {
        let (session, _, _) = stub_session(&[]);
        assert!(session.wait(0.0).is_ok());
        session.shutdown().cancel();
        assert!(matches!(session.wait(10.0), Err(BotError::Stopped)));
        assert!(matches!(session.ensure_running(), Err(BotError::Stopped)));
    }

    #[test]
    fn fail_releases_keys_and_records_reason() {
        let (mut session, _, _) = stub_session(&[]);
        session.ctl.key_down("w");
        session.fail(&BotError::ScriptNotFound("move_to_harpies".into()));
        assert!(session.ctl.held_keys().is_empty());
        let status = session.status();
        assert_eq!(status.state, BotState::Failed);
        assert!(status.detail.contains("move_to_harpies"));
    }
}
