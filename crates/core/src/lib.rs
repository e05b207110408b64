pub mod assets;
pub mod battleground;
pub mod cancel;
pub mod chat;
pub mod error;
pub mod farm;
pub mod geometry;
pub mod input;
pub mod keystrokes;
pub mod logger;
pub mod matcher;
pub mod movement;
pub mod platform;
pub mod screen;
pub mod session;
pub mod settings;
pub mod sleep;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use error::{BotError, Result};
