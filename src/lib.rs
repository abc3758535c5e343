//! Colour Balls terminal client (workspace facade crate).
//!
//! Re-exports the member crates under `crates/` and adds the pieces that only
//! the binary needs: configuration, logging and the input-to-session wiring.

pub use colour_balls_client as client;
pub use colour_balls_core as core;
pub use colour_balls_engine as engine;
pub use colour_balls_input as input;
pub use colour_balls_term as term;
pub use colour_balls_types as types;

pub mod app;
pub mod config;
pub mod logging;
