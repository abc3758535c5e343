//! Degraded-mode piece prediction.
//!
//! Used only while the circuit is open. The prediction is geometric: the moved
//! or rotated piece must keep every ball on the board. Occupied cells are not
//! considered; the server resolves collisions once it is reachable again.

use crate::types::{ActionKind, Board, Piece};

/// Predict `piece` after `kind`.
///
/// Returns `None` for kinds that cannot be approximated locally. A blocked
/// move returns the piece unchanged.
pub fn predict(piece: &Piece, kind: ActionKind, board: &Board) -> Option<Piece> {
    // Anchors come off the wire; a step past the i16 range is blocked.
    let next = match kind {
        ActionKind::MoveLeft => piece.x.checked_sub(1).map(|x| Piece { x, ..piece.clone() }),
        ActionKind::MoveRight => piece.x.checked_add(1).map(|x| Piece { x, ..piece.clone() }),
        ActionKind::MoveDown => piece.y.checked_add(1).map(|y| Piece { y, ..piece.clone() }),
        ActionKind::Rotate => Some(Piece {
            orientation: piece.orientation.rotate_cw(),
            ..piece.clone()
        }),
        _ => return None,
    };
    Some(
        next.filter(|p| fits(p, board))
            .unwrap_or_else(|| piece.clone()),
    )
}

/// Every ball of `piece` lies inside `board`.
pub fn fits(piece: &Piece, board: &Board) -> bool {
    piece.cells().count() == piece.colors.len()
        && piece.cells().all(|(x, y, _)| board.contains(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Orientation;

    fn board() -> Board {
        Board::default()
    }

    fn piece(x: i16, y: i16, orientation: Orientation) -> Piece {
        Piece::new(&[1, 2, 3], x, y, orientation)
    }

    #[test]
    fn test_left_edge_blocks_move_left() {
        let p = piece(0, 5, Orientation::Deg0);
        assert_eq!(predict(&p, ActionKind::MoveLeft, &board()).unwrap().x, 0);
    }

    #[test]
    fn test_move_right_respects_piece_length() {
        // Occupies columns 6..=8; one step still fits.
        let p = piece(6, 5, Orientation::Deg0);
        let moved = predict(&p, ActionKind::MoveRight, &board()).unwrap();
        assert_eq!(moved.x, 7);
        assert!(fits(&moved, &board()));

        // Tail already on the last column.
        let blocked = predict(&moved, ActionKind::MoveRight, &board()).unwrap();
        assert_eq!(blocked.x, 7);
    }

    #[test]
    fn test_reversed_piece_extends_left() {
        // 180°: anchor is the rightmost ball.
        let p = piece(2, 5, Orientation::Deg180);
        assert_eq!(predict(&p, ActionKind::MoveLeft, &board()).unwrap().x, 2);
        assert_eq!(predict(&p, ActionKind::MoveRight, &board()).unwrap().x, 3);
        let p = piece(9, 5, Orientation::Deg180);
        assert_eq!(predict(&p, ActionKind::MoveRight, &board()).unwrap().x, 9);
    }

    #[test]
    fn test_move_down_stops_at_floor() {
        let p = piece(4, 17, Orientation::Deg90);
        assert_eq!(predict(&p, ActionKind::MoveDown, &board()).unwrap().y, 17);
        let p = piece(4, 19, Orientation::Deg0);
        assert_eq!(predict(&p, ActionKind::MoveDown, &board()).unwrap().y, 19);
        let p = piece(4, 18, Orientation::Deg0);
        assert_eq!(predict(&p, ActionKind::MoveDown, &board()).unwrap().y, 19);
    }

    #[test]
    fn test_rotate_checks_new_footprint() {
        let p = piece(4, 5, Orientation::Deg0);
        let r = predict(&p, ActionKind::Rotate, &board()).unwrap();
        assert_eq!(r.orientation, Orientation::Deg90);

        // Vertical footprint would leave the board.
        let p = piece(4, 18, Orientation::Deg0);
        let r = predict(&p, ActionKind::Rotate, &board()).unwrap();
        assert_eq!(r.orientation, Orientation::Deg0);

        // 90° -> 180° extends left from the anchor.
        let p = piece(1, 5, Orientation::Deg90);
        let r = predict(&p, ActionKind::Rotate, &board()).unwrap();
        assert_eq!(r.orientation, Orientation::Deg90);
    }

    #[test]
    fn test_extreme_anchors_are_blocked_not_wrapped() {
        let p = piece(i16::MIN, 0, Orientation::Deg0);
        assert_eq!(predict(&p, ActionKind::MoveLeft, &board()).unwrap(), p);

        let p = piece(i16::MAX, 0, Orientation::Deg180);
        assert_eq!(predict(&p, ActionKind::MoveRight, &board()).unwrap(), p);

        let p = piece(0, i16::MAX, Orientation::Deg90);
        assert_eq!(predict(&p, ActionKind::MoveDown, &board()).unwrap(), p);
        assert!(!fits(&piece(i16::MAX - 1, 0, Orientation::Deg0), &board()));
    }

    #[test]
    fn test_unpredictable_kinds() {
        let p = piece(4, 5, Orientation::Deg0);
        assert!(predict(&p, ActionKind::HardDrop, &board()).is_none());
        assert!(predict(&p, ActionKind::StartGame, &board()).is_none());
    }
}
