//! Engine module - the periodic game loop
//!
//! [`GameLoopScheduler`] asks its [`TickTarget`] for a `move_down` every
//! period. The period follows the level:
//!
//! ```text
//! period_ms = max(100, 1000 * 0.9^(level - 1))
//! ```
//!
//! The scheduler is also the coordinator's [`LoopControl`](crate::core::LoopControl):
//! game over stops it, a level change re-times it.

pub mod scheduler;

pub use colour_balls_core as core;
pub use colour_balls_types as types;

pub use scheduler::{GameLoopScheduler, LoopState, TickTarget};
