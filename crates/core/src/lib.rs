//! Core module - action dispatch and resilience for a server-authoritative game
//!
//! The server owns the game; this crate decides when the client may talk to it
//! and how the local view model changes in response.
//!
//! # Module Structure
//!
//! - [`coordinator`]: the view model, action dispatch and the match-resolution loop
//! - [`lock`]: animation lock with its local/global safety deadlines
//! - [`guard`]: rejects duplicate hard drops while one is in flight
//! - [`predict`]: bounds-checked local prediction while the circuit is open
//! - [`hooks`]: collaborator interfaces injected at construction
//! - [`error`]: the [`GameError`] taxonomy surfaced by dispatch
//!
//! # Resolution Timing
//!
//! | Step | Default |
//! |------|---------|
//! | Flash before clear request | 1500 ms |
//! | Local deadline (session force-released) | 3000 ms |
//! | Global deadline (full client reset) | 10000 ms |
//! | Cascade depth limit | 32 steps |
//!
//! # Environment Variables
//!
//! - `COLOUR_BALLS_CLEAR_DELAY_MS`
//! - `COLOUR_BALLS_LOCAL_DEADLINE_MS`
//! - `COLOUR_BALLS_GLOBAL_DEADLINE_MS`
//! - `COLOUR_BALLS_MAX_CASCADE_DEPTH`

pub mod coordinator;
pub mod error;
pub mod guard;
pub mod hooks;
pub mod lock;
pub mod predict;

pub use colour_balls_client as client;
pub use colour_balls_types as types;

pub use coordinator::{
    Advisory, CoordinatorConfig, DispatchOutcome, DispatchStatus, GameStateCoordinator,
    MAX_CASCADE_DEPTH,
};
pub use error::GameError;
pub use guard::{HardDropGuard, HardDropPermit};
pub use hooks::{EmergencyReset, LoopControl};
pub use lock::{AnimationLockManager, MatchedCell, SafetyDeadlines, SessionId, SessionView};
pub use predict::{fits, predict};
