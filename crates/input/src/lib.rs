//! Terminal input module.
//!
//! Maps `crossterm` key events into [`InputCommand`]s: either an action for the
//! server or a command handled locally by the session (start, reset, pause,
//! emergency reset, quit).

pub mod map;

pub use colour_balls_types as types;

pub use map::{map_key, should_quit, InputCommand};
