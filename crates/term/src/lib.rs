//! Terminal renderer module.
//!
//! Draws the board, the falling piece, the next piece, score/level and a
//! status line into a simple framebuffer, then flushes it with crossterm.
//! Matched cells flash on a fixed cadence (see [`flash`]).
//!
//! Everything except [`TerminalRenderer`] is pure and unit-testable.

pub mod fb;
pub mod flash;
pub mod game_view;
pub mod renderer;

pub use colour_balls_types as types;

pub use fb::{Cell, CellStyle, FrameBuffer, Rgb};
pub use flash::{FlashClock, FlashPhase};
pub use game_view::{ball_color, GameView, HudView, Viewport};
pub use renderer::{encode_diff_into, encode_full_into, TerminalRenderer};
