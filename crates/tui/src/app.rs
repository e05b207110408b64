use std::sync::{mpsc, Arc, Mutex};

use avbot_core::cancel::CancellationToken;
use avbot_core::types::BotStatus;
use crossterm::event::KeyCode;

use crate::confirm::ConfirmDialog;

pub struct App {
    pub status: Arc<Mutex<BotStatus>>,
    pub log_visible: bool,
    pub log_messages: Vec<String>,
    pub log_scroll: usize, // offset from bottom, 0 = latest
    pub log_rx: mpsc::Receiver<String>,
    pub shutdown: CancellationToken,
    pub confirm: Option<ConfirmDialog>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        status: Arc<Mutex<BotStatus>>,
        log_rx: mpsc::Receiver<String>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            status,
            log_visible: true,
            log_messages: Vec::new(),
            log_scroll: 0,
            log_rx,
            shutdown,
            confirm: None,
            should_quit: false,
        }
    }

    pub fn drain_logs(&mut self) {
        while let Ok(msg) = self.log_rx.try_recv() {
            self.log_messages.push(msg);
            if self.log_scroll > 0 {
                // keep the viewport pinned while scrolled back
                self.log_scroll += 1;
            }
        }
    }

    pub fn snapshot(&self) -> BotStatus {
        self.status.lock().unwrap().clone()
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    /// Quit right away once the routine has finished, otherwise ask first.
    pub fn request_quit(&mut self) {
        if self.snapshot().state.is_finished() || self.shutdown.is_cancelled() {
            self.should_quit = true;
        } else {
            self.confirm = Some(ConfirmDialog::new("Stop the bot and quit?"));
        }
    }

    pub fn on_key(&mut self, code: KeyCode) {
        if let Some(dialog) = self.confirm.as_mut() {
            match code {
                KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
                    dialog.toggle();
                }
                KeyCode::Char('y') | KeyCode::Char('Y') => self.answer(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.answer(false),
                KeyCode::Enter => {
                    let yes = dialog.selected;
                    self.answer(yes);
                }
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.request_quit(),
            KeyCode::Char('l') | KeyCode::Char('L') => self.toggle_log(),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_log_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_log_down(1),
            KeyCode::PageUp => self.scroll_log_up(10),
            KeyCode::PageDown => self.scroll_log_down(10),
            KeyCode::End => self.log_scroll = 0,
            _ => {}
        }
    }

    fn answer(&mut self, yes: bool) {
        self.confirm = None;
        if yes {
            self.shutdown.cancel();
            self.should_quit = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avbot_core::types::BotState;

    fn app() -> (App, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel();
        let app = App::new(Arc::new(Mutex::new(BotStatus::default())), rx, CancellationToken::new());
        (app, tx)
    }

    #[test]
    fn quitting_a_running_bot_needs_confirmation() {
        let (mut app, _tx) = app();
        app.on_key(KeyCode::Char('q'));
        assert!(app.confirm.is_some());
        assert!(!app.should_quit);

        app.on_key(KeyCode::Char('n'));
        assert!(app.confirm.is_none());
        assert!(!app.shutdown.is_cancelled());

        app.on_key(KeyCode::Char('q'));
        app.on_key(KeyCode::Left);
        app.on_key(KeyCode::Enter);
        assert!(app.shutdown.is_cancelled());
        assert!(app.should_quit);
    }

    #[test]
    fn finished_bot_quits_immediately() {
        let (mut app, _tx) = app();
        app.status.lock().unwrap().state = BotState::Done;
        app.on_key(KeyCode::Char('q'));
        assert!(app.confirm.is_none());
        assert!(app.should_quit);
    }

    #[test]
    fn scrolled_log_stays_pinned() {
        let (mut app, tx) = app();
        tx.send("a".into()).unwrap();
        app.drain_logs();
        app.scroll_log_up(1);
        tx.send("b".into()).unwrap();
        tx.send("c".into()).unwrap();
        app.drain_logs();
        assert_eq!(app.log_messages.len(), 3);
        assert_eq!(app.log_scroll, 3);
        app.on_key(KeyCode::End);
        assert_eq!(app.log_scroll, 0);
    }
}
