//! The game state machine: a board plus turn/draw bookkeeping, with
//! reversible ply application and result computation.

use crate::board::{Board, Color, Kind, PieceCount};
use crate::moves::execute::{ExecuteError, perform_instructions, undo_instructions};
use crate::moves::movegen::{BestRule, CaptureRule, generate_plies};
use crate::moves::types::Ply;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default for the quiet-move draw: this many turns without a capture and
/// without a pawn move by either side end the game in a draw.
pub const DEFAULT_STAGNANT_TURNS_TO_DRAW: u16 = 20;

/// A sustained special ending (minimal king-vs-king material) draws after
/// this many turns.
pub const SPECIAL_ENDING_TURNS_TO_DRAW: u16 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Playing,
    WhiteWon,
    BlackWon,
    Draw,
}

impl GameResult {
    #[inline]
    #[must_use]
    pub fn is_over(self) -> bool {
        self != GameResult::Playing
    }

    #[inline]
    #[must_use]
    pub fn winner(self) -> Option<Color> {
        match self {
            GameResult::WhiteWon => Some(Color::White),
            GameResult::BlackWon => Some(Color::Black),
            GameResult::Playing | GameResult::Draw => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn has_winner(self) -> bool {
        self.winner().is_some()
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::Playing => write!(f, "playing"),
            GameResult::WhiteWon => write!(f, "white won"),
            GameResult::BlackWon => write!(f, "black won"),
            GameResult::Draw => write!(f, "draw"),
        }
    }
}

/// The per-turn state a ply changes besides the board itself.
#[derive(Clone, Debug, PartialEq, Eq)]
struct TurnState {
    to_play: Color,
    turns_since_capture: u16,
    turns_since_pawn_move: u16,
    turns_in_special_ending: u16,
}

/// Everything needed to reverse one [`Game::do_ply`]: the ply itself plus
/// the pre-mutation turn state. A pure value with no ties to the game.
#[derive(Debug)]
pub struct UndoInfo {
    ply: Ply,
    prev: TurnState,
    prev_plies: Option<Vec<Ply>>,
}

#[derive(Clone, Debug)]
pub struct Game {
    board: Board,
    capture_rule: CaptureRule,
    best_rule: BestRule,
    stagnant_turns_to_draw: u16,
    state: TurnState,
    // Lazily generated, invalidated on every mutation.
    plies: Option<Vec<Ply>>,
}

impl PartialEq for Game {
    /// The ply cache is derived state and takes no part in equality.
    fn eq(&self, other: &Game) -> bool {
        self.capture_rule == other.capture_rule
            && self.best_rule == other.best_rule
            && self.stagnant_turns_to_draw == other.stagnant_turns_to_draw
            && self.state == other.state
            && self.board == other.board
    }
}

impl Eq for Game {}

impl Game {
    /// A fresh game from the standard starting position, White to play.
    #[must_use]
    pub fn standard(capture_rule: CaptureRule, best_rule: BestRule) -> Game {
        Game::custom(
            capture_rule,
            best_rule,
            DEFAULT_STAGNANT_TURNS_TO_DRAW,
            Board::standard(),
            Color::White,
        )
    }

    /// A game from an arbitrary position. The special-ending counter starts
    /// at 1 when the initial position already is one.
    #[must_use]
    pub fn custom(
        capture_rule: CaptureRule,
        best_rule: BestRule,
        stagnant_turns_to_draw: u16,
        board: Board,
        to_play: Color,
    ) -> Game {
        let mut game = Game {
            board,
            capture_rule,
            best_rule,
            stagnant_turns_to_draw,
            state: TurnState {
                to_play,
                turns_since_capture: 0,
                turns_since_pawn_move: 0,
                turns_in_special_ending: 0,
            },
            plies: None,
        };
        game.board_changed(None);
        game
    }

    #[inline]
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    #[must_use]
    pub fn to_play(&self) -> Color {
        self.state.to_play
    }

    #[inline]
    #[must_use]
    pub fn capture_rule(&self) -> CaptureRule {
        self.capture_rule
    }

    #[inline]
    #[must_use]
    pub fn best_rule(&self) -> BestRule {
        self.best_rule
    }

    /// Applies a ply and returns what is needed to take it back.
    ///
    /// On error the board is mid-ply and the game must be discarded; see
    /// [`ExecuteError`].
    pub fn do_ply(&mut self, ply: &Ply) -> Result<UndoInfo, ExecuteError> {
        perform_instructions(&mut self.board, ply)?;
        let undo = UndoInfo {
            ply: ply.clone(),
            prev: self.state.clone(),
            prev_plies: self.plies.take(),
        };
        self.state.to_play = self.state.to_play.opposite();
        self.board_changed(Some(ply));
        Ok(undo)
    }

    /// Reverses a [`Game::do_ply`]. Undo records must be consumed in LIFO
    /// order to rewind through multiple plies.
    pub fn undo_ply(&mut self, undo: UndoInfo) {
        undo_instructions(&mut self.board, &undo.ply);
        self.state = undo.prev;
        self.plies = undo.prev_plies;
    }

    /// The legal plies for the side to move, generated on demand and cached
    /// until the next mutation.
    pub fn plies(&mut self) -> &[Ply] {
        if self.plies.is_none() {
            let generated = generate_plies(
                &mut self.board,
                self.state.to_play,
                self.capture_rule,
                self.best_rule,
            );
            self.plies = Some(generated);
        }
        self.plies.get_or_insert_with(Vec::new)
    }

    /// Current result. Piece extinction is checked before anything else so
    /// that a wiped-out side loses even when the ply list is coincidentally
    /// empty, and the draw rules come before the no-ply rule so a starving
    /// side still loses rather than draws.
    pub fn result(&mut self) -> GameResult {
        let count = self.board.count();
        if count.white() == 0 {
            return GameResult::BlackWon;
        }
        if count.black() == 0 {
            return GameResult::WhiteWon;
        }

        if self.state.turns_in_special_ending == SPECIAL_ENDING_TURNS_TO_DRAW {
            return GameResult::Draw;
        }

        if self.state.turns_since_pawn_move >= self.stagnant_turns_to_draw
            && self.state.turns_since_capture >= self.stagnant_turns_to_draw
        {
            return GameResult::Draw;
        }

        if self.plies().is_empty() {
            return match self.state.to_play {
                Color::White => GameResult::BlackWon,
                Color::Black => GameResult::WhiteWon,
            };
        }

        GameResult::Playing
    }

    fn board_changed(&mut self, ply: Option<&Ply>) {
        if in_special_ending(self.board.count()) {
            self.state.turns_in_special_ending += 1;
        } else {
            self.state.turns_in_special_ending = 0;
        }

        if let Some(ply) = ply {
            if ply.is_capture() {
                self.state.turns_since_capture = 0;
            } else {
                self.state.turns_since_capture += 1;
            }

            if self.is_pawn_move(ply) {
                self.state.turns_since_pawn_move = 0;
            } else {
                self.state.turns_since_pawn_move += 1;
            }
        }

        self.plies = None;
    }

    /// Whether the ply moved a pawn. A ply that crowns was a pawn move even
    /// though the piece standing on the landing square is now a king;
    /// otherwise the landing square's post-move kind is the answer.
    fn is_pawn_move(&self, ply: &Ply) -> bool {
        if ply.has_crown() {
            return true;
        }
        match ply.final_destination() {
            Some(dest) => matches!(self.board.piece_at(dest), Some((_, Kind::Pawn))),
            None => false,
        }
    }
}

fn one_side_special_ending(our_kings: u8, our_pawns: u8, their_kings: u8, their_pawns: u8) -> bool {
    if our_pawns > 0 {
        return false;
    }
    match our_kings {
        // 2 kings vs 1-2 kings, or 2 kings vs king + pawn.
        2 => {
            (their_pawns == 0 && (their_kings == 1 || their_kings == 2))
                || (their_pawns == 1 && their_kings == 1)
        }
        // 1 king vs king, or 1 king vs king + pawn.
        1 => their_kings == 1 && their_pawns <= 1,
        _ => false,
    }
}

/// Minimal-material endgames that draw when sustained; a capture can leave
/// a special ending for a non-special position, so this is re-evaluated on
/// every board change.
fn in_special_ending(count: PieceCount) -> bool {
    one_side_special_ending(
        count.white_kings,
        count.white_pawns,
        count.black_kings,
        count.black_pawns,
    ) || one_side_special_ending(
        count.black_kings,
        count.black_pawns,
        count.white_kings,
        count.white_pawns,
    )
}
