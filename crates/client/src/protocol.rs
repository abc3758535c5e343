//! Protocol module - JSON request/response types for the game server
//!
//! Every reply carries (a subset of) the game state. Fields are optional so a
//! partial reply never clobbers state the server did not mention.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::{
    ActionKind, Board, CellPos, Orientation, Piece, PieceColors, StatePatch, MAX_PIECE_LEN,
};

/// Server endpoints, relative to the configured base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /api/state`
    State,
    /// `POST /api/action`
    Action,
    /// `POST /api/clear-matches`
    ClearMatches,
    /// `POST /api/reset`
    Reset,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::State => "/api/state",
            Endpoint::Action => "/api/action",
            Endpoint::ClearMatches => "/api/clear-matches",
            Endpoint::Reset => "/api/reset",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/api/state" => Some(Endpoint::State),
            "/api/action" => Some(Endpoint::Action),
            "/api/clear-matches" => Some(Endpoint::ClearMatches),
            "/api/reset" => Some(Endpoint::Reset),
            _ => None,
        }
    }
}

// ============== Client -> Server ==============

/// A player or timer action with its optional payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub data: Option<Value>,
}

impl ActionRequest {
    pub fn new(kind: ActionKind) -> Self {
        Self { kind, data: None }
    }

    pub fn with_data(kind: ActionKind, data: Value) -> Self {
        Self {
            kind,
            data: Some(data),
        }
    }

    pub fn to_body(&self) -> ActionBody {
        ActionBody {
            kind: self.kind.as_str().to_string(),
            data: self
                .data
                .clone()
                .unwrap_or_else(|| Value::Object(Default::default())),
        }
    }
}

/// `POST /api/action` body: `{"type": "...", "data": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionBody {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

// ============== Server -> Client ==============

/// Piece as sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceWire {
    pub colors: Vec<u8>,
    pub x: i16,
    pub y: i16,
    #[serde(default)]
    pub orientation: i32,
}

impl PieceWire {
    pub fn into_piece(self) -> Piece {
        let orientation = Orientation::from_degrees(self.orientation).unwrap_or_else(|| {
            tracing::warn!(degrees = self.orientation, "unknown piece orientation; using 0");
            Orientation::Deg0
        });
        if self.colors.len() > MAX_PIECE_LEN {
            tracing::warn!(len = self.colors.len(), "piece longer than supported; truncating");
        }
        Piece::new(&self.colors, self.x, self.y, orientation)
    }
}

/// Reply body shared by every endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<Vec<Vec<u8>>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_piece: Option<Option<PieceWire>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_piece_colors: Option<Option<Vec<u8>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_over: Option<bool>,
    /// `[[row, col], ...]`
    #[serde(default, deserialize_with = "null_as_empty")]
    pub matched_positions: Vec<(u8, u8)>,
    /// Application-level failure reported in an otherwise valid body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StateResponse {
    pub fn has_matches(&self) -> bool {
        !self.matched_positions.is_empty()
    }

    pub fn matched_cells(&self) -> Vec<CellPos> {
        self.matched_positions
            .iter()
            .map(|&(row, col)| CellPos::new(row, col))
            .collect()
    }

    /// Convert into the schema'd patch merged by the coordinator.
    pub fn into_patch(self) -> StatePatch {
        let matched_positions = self.matched_cells();
        StatePatch {
            board: self.board.map(Board::from_rows),
            current_piece: self.current_piece.map(|p| p.map(PieceWire::into_piece)),
            next_piece_colors: self.next_piece_colors.map(|c| {
                c.map(|colors| colors.into_iter().take(MAX_PIECE_LEN).collect::<PieceColors>())
            }),
            score: self.score,
            level: self.level,
            game_over: self.game_over,
            matched_positions,
        }
    }
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a reply body.
pub fn parse_state(body: &str) -> Result<StateResponse, serde_json::Error> {
    serde_json::from_str(body)
}

/// Pull `{"error": "..."}` out of a failed reply, if the body has one.
pub fn error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
    }
    serde_json::from_str::<ErrorBody>(body).ok()?.error
}
