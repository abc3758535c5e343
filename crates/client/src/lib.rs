//! Client module - the network gateway to the Colour Balls server
//!
//! The server owns the authoritative game; this crate is the only code that
//! talks to it. Every request is bounded by a timeout and passes through a
//! failure circuit, and every outcome comes back as a classified value rather
//! than a panic or an unrecoverable error.
//!
//! # Protocol Overview
//!
//! Plain HTTP with JSON bodies:
//!
//! | Method | Path | Body | Reply |
//! |--------|------|------|-------|
//! | GET  | `/api/state` | - | game state |
//! | POST | `/api/action` | `{"type": "...", "data": {...}}` | game state + `matchedPositions` |
//! | POST | `/api/clear-matches` | `{}` | game state + `matchedPositions` |
//! | POST | `/api/reset` | `{}` | initial state, no matches |
//!
//! A game state reply looks like:
//!
//! ```text
//! {"board":[[0,0,...],...],"currentPiece":{"colors":[1,4,2],"x":4,"y":0,"orientation":0},
//!  "nextPieceColors":[3,5,6],"score":0,"level":1,"gameOver":false,"matchedPositions":[[19,2],[19,3],[19,4]]}
//! ```
//!
//! # Outcomes
//!
//! - **Success**: the parsed [`StateResponse`]
//! - [`ClientError::Timeout`]: no reply within the request timeout (5 s)
//! - [`ClientError::Transport`]: connect/I/O failure or an unparseable body
//! - [`ClientError::Http`]: non-2xx status, with the server's `error` text if any
//! - [`ClientError::CircuitOpen`]: served locally, nothing was sent
//!
//! Any of the first three counts against the circuit; a success resets it.
//!
//! # Environment Variables
//!
//! - `COLOUR_BALLS_SERVER_URL`: server base URL (default: "http://127.0.0.1:5000")
//! - `COLOUR_BALLS_REQUEST_TIMEOUT_MS`: per-request bound (default: 5000)
//! - `COLOUR_BALLS_FAILURE_THRESHOLD`: failures before the circuit opens (default: 3)
//! - `COLOUR_BALLS_CIRCUIT_COOLDOWN_MS`: open-circuit cooldown (default: 30000)
//!
//! # Testing
//!
//! Swap the transport for a [`ScriptedTransport`] to drive the client without a
//! server:
//!
//! ```
//! use std::sync::Arc;
//! use colour_balls_client::{ClientConfig, Endpoint, RemoteGameClient, ScriptedReply, ScriptedTransport};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let transport = Arc::new(ScriptedTransport::new());
//! transport.push(Endpoint::State, ScriptedReply::ok(serde_json::json!({"score": 30, "level": 1})));
//!
//! let client = RemoteGameClient::new(transport.clone(), &ClientConfig::default());
//! let state = client.fetch_state().await.unwrap();
//! assert_eq!(state.score, Some(30));
//! # });
//! ```

pub mod circuit;
pub mod client;
pub mod error;
pub mod protocol;
pub mod scripted;
pub mod transport;

pub use colour_balls_types as types;

pub use circuit::{CircuitBreaker, CircuitSnapshot, CircuitState};
pub use client::{ClientConfig, RemoteGameClient};
pub use error::{ClientError, ClientResult, TransportError};
pub use protocol::{ActionRequest, Endpoint, StateResponse};
pub use scripted::{RecordedCall, ScriptedReply, ScriptedTransport};
pub use transport::{HttpReply, HttpTransport, Transport};
