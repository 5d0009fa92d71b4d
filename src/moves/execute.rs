//! Applying and reverting instruction sequences against a board.

use super::types::{Instruction, Ply};
use crate::board::{Board, Color, Kind};
use crate::square::Square;
use thiserror::Error;

/// A `Capture` referenced a square whose contents do not match the recorded
/// piece. The ply was fabricated against a different position; the board is
/// left mid-ply and must be considered corrupt.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecuteError {
    #[error("capture of {expected_color} {expected_kind} at {at} but square holds {found_color} {found_kind}")]
    CaptureMismatch {
        at: Square,
        expected_color: Color,
        expected_kind: Kind,
        found_color: Color,
        found_kind: Kind,
    },
    #[error("capture of {expected_color} {expected_kind} at {at} but square is empty")]
    CaptureEmpty {
        at: Square,
        expected_color: Color,
        expected_kind: Kind,
    },
}

/// Applies the ply's instructions in order.
pub fn perform_instructions(board: &mut Board, ply: &Ply) -> Result<(), ExecuteError> {
    for instruction in ply {
        match *instruction {
            Instruction::Move { from, to } => board.move_piece(from, to),
            Instruction::Capture { at, color, kind } => match board.piece_at(at) {
                Some((found_color, found_kind)) if found_color == color && found_kind == kind => {
                    board.clear(at);
                }
                Some((found_color, found_kind)) => {
                    return Err(ExecuteError::CaptureMismatch {
                        at,
                        expected_color: color,
                        expected_kind: kind,
                        found_color,
                        found_kind,
                    });
                }
                None => {
                    return Err(ExecuteError::CaptureEmpty {
                        at,
                        expected_color: color,
                        expected_kind: kind,
                    });
                }
            },
            Instruction::Crown { at } => board.crown(at),
        }
    }
    Ok(())
}

/// Reverts a previously performed ply. Reversal runs in reverse order so a
/// chain of captures rewinds to the original position with every captured
/// piece restored.
pub fn undo_instructions(board: &mut Board, ply: &Ply) {
    for instruction in ply.iter().rev() {
        match *instruction {
            Instruction::Move { from, to } => board.move_piece(to, from),
            Instruction::Capture { at, color, kind } => board.set(at, color, kind),
            Instruction::Crown { at } => board.uncrown(at),
        }
    }
}
