//! Core types module - shared data structures and constants
//!
//! This module defines the view model the client keeps for a Colour Balls game.
//! All types are plain data with no I/O, usable from the coordinator, the
//! renderer and the wire protocol alike.
//!
//! # Board
//!
//! - **Width**: 10 columns (indexed 0-9)
//! - **Height**: 20 rows (indexed 0-19)
//! - Each cell holds a color index; `0` is empty, `1..=6` are ball colors.
//!
//! A piece is a straight run of colored balls anchored at `(x, y)`. Its
//! orientation picks the direction the run extends from the anchor:
//!
//! | Orientation | Direction |
//! |-------------|-----------|
//! | 0°   | +x (right) |
//! | 90°  | +y (down)  |
//! | 180° | -x (left)  |
//! | 270° | -y (up)    |
//!
//! # Timing Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `REQUEST_TIMEOUT_MS` | 5000 | Bound on every server round trip |
//! | `FAILURE_THRESHOLD` | 3 | Consecutive failures that open the circuit |
//! | `CIRCUIT_COOLDOWN_MS` | 30000 | Time before an open circuit is retried |
//! | `CLEAR_DELAY_MS` | 1500 | Wait between a match and its clear request |
//! | `LOCAL_DEADLINE_MS` | 3000 | Animation session force-release |
//! | `GLOBAL_DEADLINE_MS` | 10000 | Full client reset if a session never settles |
//! | `FLASH_INTERVAL_MS` | 200 | Matched-cell flash toggle period |
//!
//! # Examples
//!
//! ```
//! use colour_balls_types::{drop_interval_ms, ActionKind, Orientation};
//!
//! assert_eq!(ActionKind::HardDrop.as_str(), "hard_drop");
//! assert_eq!(Orientation::Deg0.rotate_cw(), Orientation::Deg90);
//! assert_eq!(drop_interval_ms(1), 1000);
//! assert_eq!(drop_interval_ms(100), 100);
//! ```

use std::collections::BTreeSet;

use arrayvec::ArrayVec;

/// Board width in cells (10 columns)
pub const BOARD_WIDTH: u8 = 10;

/// Board height in cells (20 rows)
pub const BOARD_HEIGHT: u8 = 20;

/// Upper bound on balls per piece accepted from the wire.
pub const MAX_PIECE_LEN: usize = 6;

/// Number of distinct ball colors (indices 1..=6).
pub const COLOR_COUNT: u8 = 6;

/// Network call bound in milliseconds.
pub const REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Consecutive failures before the circuit opens.
pub const FAILURE_THRESHOLD: u32 = 3;

/// Open-circuit cooldown in milliseconds.
pub const CIRCUIT_COOLDOWN_MS: u64 = 30_000;

/// Delay between a reported match and the clear-matches request.
///
/// Longer than the flash cycle (`FLASH_INTERVAL_MS * FLASH_TOGGLES`).
pub const CLEAR_DELAY_MS: u64 = 1_500;

/// Local safety deadline for an animation session.
pub const LOCAL_DEADLINE_MS: u64 = 3_000;

/// Global safety deadline for an animation session.
pub const GLOBAL_DEADLINE_MS: u64 = 10_000;

/// Matched-cell flash toggle period.
pub const FLASH_INTERVAL_MS: u64 = 200;

/// Flash toggles per match (3 full on/off cycles).
pub const FLASH_TOGGLES: u32 = 6;

/// Drop cadence at level 1.
pub const BASE_DROP_MS: u64 = 1_000;

/// Per-level cadence multiplier.
pub const DROP_SPEEDUP: f64 = 0.9;

/// Fastest allowed cadence.
pub const DROP_INTERVAL_MIN_MS: u64 = 100;

/// Tick cadence for a level: `max(100, 1000 * 0.9^(level-1))`.
///
/// Levels below 1 are treated as level 1.
///
/// # Examples
///
/// ```
/// use colour_balls_types::drop_interval_ms;
///
/// assert_eq!(drop_interval_ms(0), 1000);
/// assert_eq!(drop_interval_ms(2), 900);
/// assert_eq!(drop_interval_ms(3), 810);
/// ```
pub fn drop_interval_ms(level: u32) -> u64 {
    let exp = level.max(1) - 1;
    let ms = BASE_DROP_MS as f64 * DROP_SPEEDUP.powi(exp.min(i32::MAX as u32) as i32);
    (ms.round() as u64).max(DROP_INTERVAL_MIN_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_defaults_match_server_contract() {
        assert_eq!(REQUEST_TIMEOUT_MS, 5_000);
        assert_eq!(FAILURE_THRESHOLD, 3);
        assert_eq!(CIRCUIT_COOLDOWN_MS, 30_000);
        assert_eq!(CLEAR_DELAY_MS, 1_500);
        assert_eq!(LOCAL_DEADLINE_MS, 3_000);
        assert_eq!(GLOBAL_DEADLINE_MS, 10_000);
        assert!(FLASH_INTERVAL_MS * FLASH_TOGGLES as u64 <= CLEAR_DELAY_MS);
    }

    #[test]
    fn drop_interval_floors_at_minimum() {
        assert_eq!(drop_interval_ms(1), 1000);
        assert_eq!(drop_interval_ms(5), 656);
        assert_eq!(drop_interval_ms(22), 109);
        assert_eq!(drop_interval_ms(23), 100);
        assert_eq!(drop_interval_ms(u32::MAX), 100);
    }

    #[test]
    fn orientation_cycles_and_offsets() {
        let mut o = Orientation::Deg0;
        for _ in 0..4 {
            o = o.rotate_cw();
        }
        assert_eq!(o, Orientation::Deg0);
        assert_eq!(Orientation::Deg0.offset(2), (2, 0));
        assert_eq!(Orientation::Deg90.offset(2), (0, 2));
        assert_eq!(Orientation::Deg180.offset(2), (-2, 0));
        assert_eq!(Orientation::Deg270.offset(2), (0, -2));
        assert_eq!(Orientation::from_degrees(450), Some(Orientation::Deg90));
        assert_eq!(Orientation::from_degrees(45), None);
        assert_eq!(Orientation::from_degrees(-90).map(|o| o.degrees()), Some(270));
    }

    #[test]
    fn piece_cells_follow_orientation() {
        let piece = Piece::new(&[1, 2, 3], 4, 5, Orientation::Deg270);
        let cells: Vec<_> = piece.cells().collect();
        assert_eq!(cells, vec![(4, 5, 1), (4, 4, 2), (4, 3, 3)]);

        let edge = Piece::new(&[1, 2, 3], i16::MIN, 0, Orientation::Deg180);
        assert_eq!(edge.cells().collect::<Vec<_>>(), vec![(i16::MIN, 0, 1)]);
    }

    #[test]
    fn merge_preserves_absent_fields_and_overwrites_matches() {
        let mut state = GameState::default();
        state.score = 120;
        state.level = 2;
        state.matched_positions.insert(CellPos::new(19, 0));

        state.merge(StatePatch {
            score: Some(150),
            ..StatePatch::default()
        });

        assert_eq!(state.score, 150);
        assert_eq!(state.level, 2);
        assert!(state.matched_positions.is_empty());
    }

    #[test]
    fn merge_distinguishes_null_piece_from_absent_piece() {
        let mut state = GameState::default();
        state.current_piece = Some(Piece::new(&[1, 2, 3], 4, 0, Orientation::Deg0));

        state.merge(StatePatch::default());
        assert!(state.current_piece.is_some());

        state.merge(StatePatch {
            current_piece: Some(None),
            ..StatePatch::default()
        });
        assert!(state.current_piece.is_none());
    }

    #[test]
    fn merge_clamps_level() {
        let mut state = GameState::default();
        state.merge(StatePatch {
            level: Some(0),
            ..StatePatch::default()
        });
        assert_eq!(state.level, 1);
    }

    #[test]
    fn action_kind_wire_names() {
        assert_eq!(ActionKind::MoveLeft.as_str(), "move_left");
        assert_eq!(ActionKind::HardDrop.as_str(), "hard_drop");
        assert_eq!(ActionKind::StartGame.to_string(), "start_game");
        assert!(ActionKind::StartGame.allowed_when_circuit_open());
        assert!(ActionKind::Reset.allowed_when_circuit_open());
        assert!(!ActionKind::HardDrop.allowed_when_circuit_open());
        assert!(ActionKind::Rotate.is_predictable());
        assert!(!ActionKind::HardDrop.is_predictable());
    }
}

/// Piece orientation in 90° steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    /// Horizontal, extending right from the anchor
    #[default]
    Deg0,
    /// Vertical, extending down from the anchor
    Deg90,
    /// Horizontal, extending left from the anchor
    Deg180,
    /// Vertical, extending up from the anchor
    Deg270,
}

impl Orientation {
    /// Parse from degrees. Multiples of 90 are normalized into `0..360`.
    pub fn from_degrees(deg: i32) -> Option<Self> {
        match deg.rem_euclid(360) {
            0 => Some(Orientation::Deg0),
            90 => Some(Orientation::Deg90),
            180 => Some(Orientation::Deg180),
            270 => Some(Orientation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(&self) -> u16 {
        match self {
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 90,
            Orientation::Deg180 => 180,
            Orientation::Deg270 => 270,
        }
    }

    /// Rotate clockwise (90°)
    pub fn rotate_cw(&self) -> Self {
        match self {
            Orientation::Deg0 => Orientation::Deg90,
            Orientation::Deg90 => Orientation::Deg180,
            Orientation::Deg180 => Orientation::Deg270,
            Orientation::Deg270 => Orientation::Deg0,
        }
    }

    /// Offset of the `i`-th ball from the anchor as `(dx, dy)`.
    pub fn offset(&self, i: usize) -> (i16, i16) {
        let i = i as i16;
        match self {
            Orientation::Deg0 => (i, 0),
            Orientation::Deg90 => (0, i),
            Orientation::Deg180 => (-i, 0),
            Orientation::Deg270 => (0, -i),
        }
    }
}

/// A board position as `(row, col)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellPos {
    pub row: u8,
    pub col: u8,
}

impl CellPos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

/// Piece colors, at most `MAX_PIECE_LEN` balls.
pub type PieceColors = ArrayVec<u8, MAX_PIECE_LEN>;

/// The falling piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub colors: PieceColors,
    /// Anchor column
    pub x: i16,
    /// Anchor row
    pub y: i16,
    pub orientation: Orientation,
}

impl Piece {
    /// Build a piece; colors beyond `MAX_PIECE_LEN` are dropped.
    pub fn new(colors: &[u8], x: i16, y: i16, orientation: Orientation) -> Self {
        Self {
            colors: colors.iter().copied().take(MAX_PIECE_LEN).collect(),
            x,
            y,
            orientation,
        }
    }

    /// Number of balls.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Occupied cells as `(x, y, color)`. Balls whose coordinates fall
    /// outside `i16` are skipped; no board can hold them.
    pub fn cells(&self) -> impl Iterator<Item = (i16, i16, u8)> + '_ {
        self.colors.iter().enumerate().filter_map(move |(i, &c)| {
            let (dx, dy) = self.orientation.offset(i);
            Some((self.x.checked_add(dx)?, self.y.checked_add(dy)?, c))
        })
    }
}

/// Grid of color indices, row-major. `0` = empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: Vec<Vec<u8>>,
}

impl Default for Board {
    fn default() -> Self {
        Self::empty(BOARD_WIDTH, BOARD_HEIGHT)
    }
}

impl Board {
    pub fn empty(width: u8, height: u8) -> Self {
        Self {
            rows: vec![vec![0; width as usize]; height as usize],
        }
    }

    pub fn from_rows(rows: Vec<Vec<u8>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }

    /// Width of the first row; the server always sends a rectangular grid.
    pub fn width(&self) -> u8 {
        self.rows.first().map(|r| r.len()).unwrap_or(0).min(u8::MAX as usize) as u8
    }

    pub fn height(&self) -> u8 {
        self.rows.len().min(u8::MAX as usize) as u8
    }

    pub fn get(&self, row: u8, col: u8) -> Option<u8> {
        self.rows.get(row as usize)?.get(col as usize).copied()
    }

    /// Bounds check that tolerates negative coordinates.
    pub fn contains(&self, x: i16, y: i16) -> bool {
        x >= 0 && y >= 0 && x < self.width() as i16 && y < self.height() as i16
    }
}

/// Player/timer action kinds accepted by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    MoveLeft,
    MoveRight,
    MoveDown,
    Rotate,
    HardDrop,
    StartGame,
    Reset,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::MoveLeft => "move_left",
            ActionKind::MoveRight => "move_right",
            ActionKind::MoveDown => "move_down",
            ActionKind::Rotate => "rotate",
            ActionKind::HardDrop => "hard_drop",
            ActionKind::StartGame => "start_game",
            ActionKind::Reset => "reset",
        }
    }

    /// Kinds that still reach the network while the circuit is open.
    pub fn allowed_when_circuit_open(&self) -> bool {
        matches!(self, ActionKind::StartGame | ActionKind::Reset)
    }

    /// Kinds the client can approximate locally in degraded mode.
    pub fn is_predictable(&self) -> bool {
        matches!(
            self,
            ActionKind::MoveLeft | ActionKind::MoveRight | ActionKind::MoveDown | ActionKind::Rotate
        )
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The client-side view model, rebuilt from server replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    pub current_piece: Option<Piece>,
    pub next_piece_colors: PieceColors,
    pub score: u64,
    /// Always >= 1
    pub level: u32,
    pub game_over: bool,
    /// Cells flagged for the current resolution step.
    pub matched_positions: BTreeSet<CellPos>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            board: Board::default(),
            current_piece: None,
            next_piece_colors: PieceColors::new(),
            score: 0,
            level: 1,
            game_over: false,
            matched_positions: BTreeSet::new(),
        }
    }
}

impl GameState {
    /// Merge a server reply.
    ///
    /// Present fields overwrite, absent fields are preserved. `matched_positions`
    /// always overwrites (an absent list is empty).
    pub fn merge(&mut self, patch: StatePatch) {
        if let Some(board) = patch.board {
            self.board = board;
        }
        if let Some(piece) = patch.current_piece {
            self.current_piece = piece;
        }
        if let Some(next) = patch.next_piece_colors {
            self.next_piece_colors = next.unwrap_or_default();
        }
        if let Some(score) = patch.score {
            self.score = score;
        }
        if let Some(level) = patch.level {
            self.level = level.max(1);
        }
        if let Some(game_over) = patch.game_over {
            self.game_over = game_over;
        }
        self.matched_positions = patch.matched_positions.into_iter().collect();
    }

    /// Replace wholesale: start from defaults and merge.
    pub fn rebuilt_from(patch: StatePatch) -> Self {
        let mut state = Self::default();
        state.merge(patch);
        state
    }
}

/// A partial state reported by the server.
///
/// Outer `None` = field absent. For `current_piece` and `next_piece_colors`
/// the inner `None` is an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePatch {
    pub board: Option<Board>,
    pub current_piece: Option<Option<Piece>>,
    pub next_piece_colors: Option<Option<PieceColors>>,
    pub score: Option<u64>,
    pub level: Option<u32>,
    pub game_over: Option<bool>,
    pub matched_positions: Vec<CellPos>,
}
