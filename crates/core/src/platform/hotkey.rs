use crate::cancel::CancellationToken;

/// Start a background thread that listens for the global hotkey Ctrl+Shift+K
/// and cancels `token` when it is pressed.
#[cfg(target_os = "windows")]
pub fn start_hotkey_listener(token: CancellationToken) {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        RegisterHotKey, MOD_CONTROL, MOD_NOREPEAT, MOD_SHIFT, VK_K,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetMessageW, MSG, WM_HOTKEY};

    const HOTKEY_ID: i32 = 1;

    std::thread::spawn(move || {
        // Registered with no window, so WM_HOTKEY lands on this thread's queue.
        let registered = unsafe {
            RegisterHotKey(
                HWND::default(),
                HOTKEY_ID,
                MOD_CONTROL | MOD_SHIFT | MOD_NOREPEAT,
                u32::from(VK_K.0),
            )
        };
        if let Err(e) = registered {
            crate::logger::error(&format!(
                "failed to register stop hotkey Ctrl+Shift+K: {}; another application may have claimed it",
                e
            ));
            return;
        }
        crate::logger::info("stop hotkey Ctrl+Shift+K registered");

        let mut msg = MSG::default();
        // 0 on WM_QUIT, -1 on error
        while unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) }.0 > 0 {
            if msg.message == WM_HOTKEY && msg.wParam.0 == HOTKEY_ID as usize {
                crate::logger::warn("stop hotkey pressed");
                token.cancel();
            }
        }
    });
}

#[cfg(not(target_os = "windows"))]
pub fn start_hotkey_listener(_token: CancellationToken) {
    // Global hotkeys not supported on this platform
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_leaves_the_token_alone_until_pressed() {
        let token = CancellationToken::new();
        start_hotkey_listener(token.clone());
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(!token.is_cancelled());
    }
}
