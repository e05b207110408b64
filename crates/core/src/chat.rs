//! Typing slash commands into the client's chat box.

use crate::error::Result;
use crate::input::Controller;
use crate::logger;
use crate::screen::{indicators, ClientView, MatchOptions};
use crate::sleep::sleep_secs;

/// Type `command` into the chat box and submit it.
///
/// If the chat box is open its text is cleared first; otherwise Enter opens
/// it. Returns false when the box never shows up.
pub fn send_chat_command(
    view: &mut ClientView,
    ctl: &mut Controller,
    command: &str,
    opts: &MatchOptions,
    settle_secs: f64,
) -> Result<bool> {
    let chat_box = view.update_location(indicators::CHAT_TYPING_BOX, opts)?;

    let target = match chat_box.absolute_rect() {
        Some(rect) => {
            ctl.click_rect(&rect);
            ctl.hotkey("ctrl", "a");
            ctl.press("delete");
            rect
        }
        None => {
            ctl.press("enter");
            sleep_secs(settle_secs);
            let reopened = view.update_location(indicators::CHAT_TYPING_BOX, opts)?;
            let Some(rect) = reopened.absolute_rect() else {
                logger::warn_p("bg", "chat box not found after pressing enter");
                return Ok(false);
            };
            ctl.click_rect(&rect);
            sleep_secs(settle_secs);
            rect
        }
    };

    ctl.type_text(command);
    ctl.press("enter");
    logger::info_p("bg", &format!("chat: {} (box at {})", command, target));

    if view.update_location(indicators::CHAT_TYPING_BOX, opts)?.found {
        logger::warn_p("bg", "chat box still visible after sending");
    }
    Ok(true)
}

/// Bring the client window to the front and let it settle.
pub fn focus_client(view: &mut ClientView, settle_secs: f64) -> bool {
    let ok = view.focus();
    sleep_secs(settle_secs);
    ok
}

/// Reload the UI with `/rl` and wait for it to come back.
pub fn reload_client(
    view: &mut ClientView,
    ctl: &mut Controller,
    opts: &MatchOptions,
    settle_secs: f64,
    reload_wait_secs: f64,
) -> Result<bool> {
    let sent = send_chat_command(view, ctl, "/rl", opts, settle_secs)?;
    sleep_secs(reload_wait_secs);
    Ok(sent)
}
