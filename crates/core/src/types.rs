use crate::geometry::Rect;

/// Direction of a key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// One input event as seen by an input device (recorded by the stub backend)
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key(String, KeyAction),
    Move(i32, i32),
    Click(MouseButton),
    Text(String),
}

/// Physical display reported by the screen source, in screen coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayInfo {
    pub name: String,
    pub bbox: Rect,
}

/// Phase of the battleground loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BotState {
    #[default]
    Idle,
    Queuing,
    WaitingForPop,
    Entering,
    Navigating,
    Active,
    Dead,
    MatchOver,
    Farming,
    Done,
    Failed,
}

impl BotState {
    pub fn label(&self) -> &'static str {
        match self {
            BotState::Idle => "idle",
            BotState::Queuing => "queuing",
            BotState::WaitingForPop => "waiting for pop",
            BotState::Entering => "entering",
            BotState::Navigating => "navigating",
            BotState::Active => "active",
            BotState::Dead => "dead",
            BotState::MatchOver => "match over",
            BotState::Farming => "farming",
            BotState::Done => "done",
            BotState::Failed => "failed",
        }
    }

    /// True once the routine has returned.
    pub fn is_finished(&self) -> bool {
        matches!(self, BotState::Done | BotState::Failed)
    }
}

/// Snapshot published by a running routine, read by the TUI
#[derive(Debug, Clone, Default)]
pub struct BotStatus {
    pub routine: String,
    pub state: BotState,
    /// 1-based index of the current match or dummy
    pub match_index: u32,
    pub games: u32,
    pub completed: u32,
    pub detail: String,
}
