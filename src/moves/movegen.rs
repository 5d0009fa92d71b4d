//! Legal ply generation.
//!
//! Capture chains are found by depth-first backtracking that mutates the
//! board and rewinds it: captured pieces are cleared while a chain is being
//! extended, so they cannot be captured twice, and the moving piece sits on
//! its current landing square, so a king may pass back over its origin.

use super::types::{Instruction, Ply};
use crate::bitboard::BitboardExt;
use crate::board::{Board, Color, Kind};
use crate::square::Square;
use once_cell::sync::Lazy;

/// Whether a player with captures available may still pick a simple move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureRule {
    Mandatory,
    NotMandatory,
}

/// Whether a capturing player must pick a ply that captures the most pieces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BestRule {
    Mandatory,
    NotMandatory,
}

const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Squares along each diagonal from every square, nearest first.
static RAYS: Lazy<[[Vec<Square>; 4]; 64]> = Lazy::new(|| {
    std::array::from_fn(|index| {
        let origin = Square::from_index(index as u8);
        std::array::from_fn(|direction| {
            let (drow, dcol) = DIAGONALS[direction];
            let mut ray = Vec::new();
            let mut current = origin;
            while let Some(next) = current.offset(drow, dcol) {
                ray.push(next);
                current = next;
            }
            ray
        })
    })
});

#[inline]
fn ray(origin: Square, direction: usize) -> &'static [Square] {
    &RAYS[origin.index()][direction]
}

/// All legal plies for `player` under the given rule flags.
///
/// The board is mutated while chains are explored but is always restored
/// before returning. Output order is deterministic for identical inputs.
pub fn generate_plies(
    board: &mut Board,
    player: Color,
    capture_rule: CaptureRule,
    best_rule: BestRule,
) -> Vec<Ply> {
    let mut plies = Vec::new();
    generate_capture_plies(&mut plies, board, player);

    let has_captures = !plies.is_empty();
    if !has_captures
        || (capture_rule == CaptureRule::NotMandatory && best_rule == BestRule::NotMandatory)
    {
        generate_simple_plies(&mut plies, board, player);
    }

    if has_captures && best_rule == BestRule::Mandatory {
        let most = plies.iter().map(Ply::capture_count).max().unwrap_or(0);
        plies.retain(|ply| ply.capture_count() == most);
    }

    plies
}

pub(crate) fn generate_capture_plies(plies: &mut Vec<Ply>, board: &mut Board, player: Color) {
    let mut chain = Ply::new();
    for origin in board.occupancy(player).squares() {
        let kind = match board.piece_at(origin) {
            Some((_, kind)) => kind,
            None => continue,
        };
        match kind {
            Kind::Pawn => follow_pawn_captures(plies, &mut chain, board, origin, player),
            Kind::King => follow_king_captures(plies, &mut chain, board, origin, player),
        }
    }
}

pub(crate) fn generate_simple_plies(plies: &mut Vec<Ply>, board: &Board, player: Color) {
    for origin in board.occupancy(player).squares() {
        let kind = match board.piece_at(origin) {
            Some((_, kind)) => kind,
            None => continue,
        };
        match kind {
            Kind::Pawn => simple_pawn_plies(plies, board, origin, player),
            Kind::King => simple_king_plies(plies, board, origin),
        }
    }
}

fn simple_pawn_plies(plies: &mut Vec<Ply>, board: &Board, origin: Square, color: Color) {
    for dcol in [-1i8, 1] {
        let Some(dest) = origin.offset(color.forward(), dcol) else {
            continue;
        };
        if board.is_occupied(dest) {
            continue;
        }
        let mut ply = Ply::new();
        ply.push(Instruction::Move {
            from: origin,
            to: dest,
        });
        if dest.row() == color.promotion_row() {
            ply.push(Instruction::Crown { at: dest });
        }
        plies.push(ply);
    }
}

fn simple_king_plies(plies: &mut Vec<Ply>, board: &Board, origin: Square) {
    for direction in 0..4 {
        for &dest in ray(origin, direction) {
            if board.is_occupied(dest) {
                break;
            }
            let mut ply = Ply::new();
            ply.push(Instruction::Move {
                from: origin,
                to: dest,
            });
            plies.push(ply);
        }
    }
}

/// Extends the current pawn chain from `origin`, emitting it when no
/// further jump is available. `chain` is empty exactly on the initial call
/// for a piece, in which case a dead end is not a capture ply at all.
fn follow_pawn_captures(
    plies: &mut Vec<Ply>,
    chain: &mut Ply,
    board: &mut Board,
    origin: Square,
    player: Color,
) {
    let mut sink = true;

    for (drow, dcol) in DIAGONALS {
        let Some(jumped) = origin.offset(drow, dcol) else {
            continue;
        };
        let Some(dest) = origin.offset(2 * drow, 2 * dcol) else {
            continue;
        };
        if board.is_occupied(dest) {
            continue;
        }
        let Some((jumped_color, jumped_kind)) = board.piece_at(jumped) else {
            continue;
        };
        if jumped_color == player {
            continue;
        }

        sink = false;

        chain.push(Instruction::Move {
            from: origin,
            to: dest,
        });
        chain.push(Instruction::Capture {
            at: jumped,
            color: jumped_color,
            kind: jumped_kind,
        });
        board.move_piece(origin, dest);
        board.clear(jumped);

        follow_pawn_captures(plies, chain, board, dest, player);

        board.set(jumped, jumped_color, jumped_kind);
        board.move_piece(dest, origin);
        chain.pop();
        chain.pop();
    }

    if sink && !chain.is_empty() {
        let mut ply = chain.clone();
        // Crown only at the chain's final landing square; passing through
        // the promotion row mid-chain does not crown.
        if origin.row() == player.promotion_row() {
            ply.push(Instruction::Crown { at: origin });
        }
        plies.push(ply);
    }
}

/// King version of the chain walk: along each diagonal, the first enemy
/// piece is the capture and every following empty square is a landing;
/// a second piece of either color ends the direction, as does a friendly
/// piece met before any enemy.
fn follow_king_captures(
    plies: &mut Vec<Ply>,
    chain: &mut Ply,
    board: &mut Board,
    origin: Square,
    player: Color,
) {
    let mut sink = true;

    for direction in 0..4 {
        let mut capture: Option<(Square, Color, Kind)> = None;

        for &step in ray(origin, direction) {
            if let Some((color, kind)) = board.piece_at(step) {
                if capture.is_some() || color == player {
                    break;
                }
                capture = Some((step, color, kind));
            } else if let Some((at, captured_color, captured_kind)) = capture {
                sink = false;

                chain.push(Instruction::Move {
                    from: origin,
                    to: step,
                });
                chain.push(Instruction::Capture {
                    at,
                    color: captured_color,
                    kind: captured_kind,
                });
                board.move_piece(origin, step);
                board.clear(at);

                follow_king_captures(plies, chain, board, step, player);

                board.set(at, captured_color, captured_kind);
                board.move_piece(step, origin);
                chain.pop();
                chain.pop();
            }
        }
    }

    if sink && !chain.is_empty() {
        // No crowning here: the piece is already a king.
        plies.push(chain.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sq(row: u8, col: u8) -> Square {
        Square::new(row, col)
    }

    fn mv(from_row: u8, from_col: u8, to_row: u8, to_col: u8) -> Instruction {
        Instruction::Move {
            from: sq(from_row, from_col),
            to: sq(to_row, to_col),
        }
    }

    fn cap(row: u8, col: u8, color: Color, kind: Kind) -> Instruction {
        Instruction::Capture {
            at: sq(row, col),
            color,
            kind,
        }
    }

    fn crown(row: u8, col: u8) -> Instruction {
        Instruction::Crown { at: sq(row, col) }
    }

    fn ply<const N: usize>(steps: [Instruction; N]) -> Ply {
        steps.into_iter().collect()
    }

    fn wire_set(plies: &[Ply]) -> BTreeSet<String> {
        plies.iter().map(Ply::to_wire).collect()
    }

    /// Order-insensitive ply list comparison with readable failures.
    fn assert_same_plies(got: &[Ply], want: &[Ply]) {
        let got = wire_set(got);
        let want = wire_set(want);
        let extra: Vec<_> = got.difference(&want).collect();
        let missing: Vec<_> = want.difference(&got).collect();
        assert!(
            extra.is_empty() && missing.is_empty(),
            "extra plies: {extra:?}\nmissing plies: {missing:?}"
        );
    }

    fn simple_plies(board: &Board, player: Color) -> Vec<Ply> {
        let mut plies = Vec::new();
        generate_simple_plies(&mut plies, board, player);
        plies
    }

    fn capture_plies(board: &mut Board, player: Color) -> Vec<Ply> {
        let mut plies = Vec::new();
        generate_capture_plies(&mut plies, board, player);
        plies
    }

    #[test]
    fn test_simple_pawn_moves() {
        let mut board = Board::empty();
        board.set(sq(1, 1), Color::Black, Kind::Pawn);
        // no possibilities
        board.set(sq(0, 0), Color::Black, Kind::Pawn);
        // one possibility occupied
        board.set(sq(0, 2), Color::Black, Kind::Pawn);
        // against the left and right walls
        board.set(sq(1, 7), Color::Black, Kind::Pawn);
        board.set(sq(3, 0), Color::Black, Kind::Pawn);
        // crowning
        board.set(sq(6, 6), Color::Black, Kind::Pawn);

        board.set(sq(6, 1), Color::White, Kind::Pawn);
        board.set(sq(7, 0), Color::White, Kind::Pawn);
        board.set(sq(7, 2), Color::White, Kind::Pawn);
        board.set(sq(4, 0), Color::White, Kind::Pawn);
        board.set(sq(4, 7), Color::White, Kind::Pawn);
        board.set(sq(1, 5), Color::White, Kind::Pawn);

        assert_same_plies(
            &simple_plies(&board, Color::Black),
            &[
                ply([mv(1, 1, 2, 2)]),
                ply([mv(1, 1, 2, 0)]),
                ply([mv(0, 2, 1, 3)]),
                ply([mv(1, 7, 2, 6)]),
                ply([mv(3, 0, 4, 1)]),
                ply([mv(6, 6, 7, 7), crown(7, 7)]),
                ply([mv(6, 6, 7, 5), crown(7, 5)]),
            ],
        );

        assert_same_plies(
            &simple_plies(&board, Color::White),
            &[
                ply([mv(6, 1, 5, 0)]),
                ply([mv(6, 1, 5, 2)]),
                ply([mv(7, 2, 6, 3)]),
                ply([mv(4, 0, 3, 1)]),
                ply([mv(4, 7, 3, 6)]),
                ply([mv(1, 5, 0, 6), crown(0, 6)]),
                ply([mv(1, 5, 0, 4), crown(0, 4)]),
            ],
        );
    }

    #[test]
    fn test_simple_king_moves() {
        let mut board = Board::empty();
        board.set(sq(5, 5), Color::White, Kind::King);
        board.set(sq(0, 7), Color::White, Kind::King);
        board.set(sq(2, 2), Color::Black, Kind::King);

        assert_same_plies(
            &simple_plies(&board, Color::White),
            &[
                // the king at (5, 5)
                ply([mv(5, 5, 6, 6)]),
                ply([mv(5, 5, 7, 7)]),
                ply([mv(5, 5, 6, 4)]),
                ply([mv(5, 5, 7, 3)]),
                ply([mv(5, 5, 4, 4)]),
                // stopped by the black king before (2, 2)
                ply([mv(5, 5, 3, 3)]),
                ply([mv(5, 5, 4, 6)]),
                ply([mv(5, 5, 3, 7)]),
                // the king at (0, 7)
                ply([mv(0, 7, 1, 6)]),
                ply([mv(0, 7, 2, 5)]),
                ply([mv(0, 7, 3, 4)]),
                ply([mv(0, 7, 4, 3)]),
                ply([mv(0, 7, 5, 2)]),
                ply([mv(0, 7, 6, 1)]),
                ply([mv(0, 7, 7, 0)]),
            ],
        );

        assert_same_plies(
            &simple_plies(&board, Color::Black),
            &[
                ply([mv(2, 2, 3, 3)]),
                ply([mv(2, 2, 4, 4)]),
                ply([mv(2, 2, 3, 1)]),
                ply([mv(2, 2, 4, 0)]),
                ply([mv(2, 2, 1, 3)]),
                ply([mv(2, 2, 0, 4)]),
                ply([mv(2, 2, 1, 1)]),
                ply([mv(2, 2, 0, 0)]),
            ],
        );
    }

    #[test]
    fn test_pawn_capture_chains() {
        let mut board = Board::empty();
        board.set(sq(4, 6), Color::White, Kind::Pawn);
        board.set(sq(3, 5), Color::Black, Kind::Pawn);
        board.set(sq(3, 3), Color::Black, Kind::Pawn);
        board.set(sq(1, 3), Color::Black, Kind::Pawn);
        board.set(sq(1, 1), Color::White, Kind::Pawn);
        board.set(sq(5, 3), Color::Black, Kind::Pawn);
        board.set(sq(6, 4), Color::White, Kind::Pawn);

        assert_same_plies(
            &capture_plies(&mut board, Color::Black),
            &[
                ply([mv(3, 5, 5, 7), cap(4, 6, Color::White, Kind::Pawn)]),
                ply([
                    mv(5, 3, 7, 5),
                    cap(6, 4, Color::White, Kind::Pawn),
                    crown(7, 5),
                ]),
            ],
        );

        assert_same_plies(
            &capture_plies(&mut board, Color::White),
            &[
                ply([
                    mv(4, 6, 2, 4),
                    cap(3, 5, Color::Black, Kind::Pawn),
                    mv(2, 4, 0, 2),
                    cap(1, 3, Color::Black, Kind::Pawn),
                    crown(0, 2),
                ]),
                ply([
                    mv(4, 6, 2, 4),
                    cap(3, 5, Color::Black, Kind::Pawn),
                    mv(2, 4, 4, 2),
                    cap(3, 3, Color::Black, Kind::Pawn),
                ]),
                ply([
                    mv(6, 4, 4, 2),
                    cap(5, 3, Color::Black, Kind::Pawn),
                    mv(4, 2, 2, 4),
                    cap(3, 3, Color::Black, Kind::Pawn),
                    mv(2, 4, 0, 2),
                    cap(1, 3, Color::Black, Kind::Pawn),
                    crown(0, 2),
                ]),
            ],
        );
    }

    #[test]
    fn test_capture_through_promotion_row_does_not_crown() {
        // The chain passes through (0, 3) on the promotion row but does not
        // end there, so the pawn stays a pawn.
        let mut board = Board::empty();
        board.set(sq(4, 7), Color::White, Kind::Pawn);
        board.set(sq(3, 6), Color::Black, Kind::Pawn);
        board.set(sq(1, 4), Color::Black, Kind::Pawn);
        board.set(sq(1, 2), Color::Black, Kind::Pawn);

        assert_same_plies(
            &capture_plies(&mut board, Color::White),
            &[ply([
                mv(4, 7, 2, 5),
                cap(3, 6, Color::Black, Kind::Pawn),
                mv(2, 5, 0, 3),
                cap(1, 4, Color::Black, Kind::Pawn),
                mv(0, 3, 2, 1),
                cap(1, 2, Color::Black, Kind::Pawn),
            ])],
        );
    }

    #[test]
    fn test_king_capture_along_one_diagonal() {
        let mut board = Board::empty();
        board.set(sq(3, 3), Color::White, Kind::King);
        board.set(sq(5, 5), Color::Black, Kind::Pawn);

        assert_same_plies(
            &capture_plies(&mut board, Color::White),
            &[
                ply([mv(3, 3, 6, 6), cap(5, 5, Color::Black, Kind::Pawn)]),
                ply([mv(3, 3, 7, 7), cap(5, 5, Color::Black, Kind::Pawn)]),
            ],
        );
    }

    #[test]
    fn test_chain_may_revisit_squares_but_not_captures() {
        // A captured piece cannot be captured again, but the chain may pass
        // back over squares it already visited, including the origin.
        let mut board = Board::empty();
        board.set(sq(4, 7), Color::White, Kind::Pawn);
        board.set(sq(3, 6), Color::Black, Kind::Pawn);
        board.set(sq(1, 6), Color::Black, Kind::Pawn);
        board.set(sq(3, 4), Color::Black, Kind::Pawn);
        board.set(sq(1, 4), Color::Black, Kind::Pawn);
        board.set(sq(3, 2), Color::Black, Kind::Pawn);
        board.set(sq(1, 2), Color::Black, Kind::Pawn);

        assert_same_plies(
            &capture_plies(&mut board, Color::White),
            &[
                ply([
                    mv(4, 7, 2, 5),
                    cap(3, 6, Color::Black, Kind::Pawn),
                    mv(2, 5, 0, 7),
                    cap(1, 6, Color::Black, Kind::Pawn),
                    crown(0, 7),
                ]),
                ply([
                    mv(4, 7, 2, 5),
                    cap(3, 6, Color::Black, Kind::Pawn),
                    mv(2, 5, 0, 3),
                    cap(1, 4, Color::Black, Kind::Pawn),
                    mv(0, 3, 2, 1),
                    cap(1, 2, Color::Black, Kind::Pawn),
                    mv(2, 1, 4, 3),
                    cap(3, 2, Color::Black, Kind::Pawn),
                    mv(4, 3, 2, 5),
                    cap(3, 4, Color::Black, Kind::Pawn),
                    mv(2, 5, 0, 7),
                    cap(1, 6, Color::Black, Kind::Pawn),
                    crown(0, 7),
                ]),
                ply([
                    mv(4, 7, 2, 5),
                    cap(3, 6, Color::Black, Kind::Pawn),
                    mv(2, 5, 4, 3),
                    cap(3, 4, Color::Black, Kind::Pawn),
                    mv(4, 3, 2, 1),
                    cap(3, 2, Color::Black, Kind::Pawn),
                    mv(2, 1, 0, 3),
                    cap(1, 2, Color::Black, Kind::Pawn),
                    mv(0, 3, 2, 5),
                    cap(1, 4, Color::Black, Kind::Pawn),
                    mv(2, 5, 0, 7),
                    cap(1, 6, Color::Black, Kind::Pawn),
                    crown(0, 7),
                ]),
            ],
        );
    }

    #[test]
    fn test_friendly_piece_blocks_king_capture() {
        // A friendly piece ahead of the enemy ends the direction.
        let mut board = Board::empty();
        board.set(sq(7, 7), Color::White, Kind::King);
        board.set(sq(5, 5), Color::White, Kind::Pawn);
        board.set(sq(3, 3), Color::Black, Kind::Pawn);

        assert!(capture_plies(&mut board, Color::White).is_empty());
    }

    #[test]
    fn test_generation_restores_the_board() {
        let mut board = Board::empty();
        board.set(sq(4, 6), Color::White, Kind::Pawn);
        board.set(sq(3, 5), Color::Black, Kind::Pawn);
        board.set(sq(3, 3), Color::Black, Kind::Pawn);
        board.set(sq(1, 3), Color::Black, Kind::King);
        let before = board;

        let _ = generate_plies(
            &mut board,
            Color::White,
            CaptureRule::Mandatory,
            BestRule::Mandatory,
        );
        assert_eq!(board, before);
    }
}
