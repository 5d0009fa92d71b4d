//! Textual board forms: the 4-character-per-piece wire format used for
//! transport, and the diagram form used by tests and the CLI.

use super::{Board, Color, Kind};
use crate::square::Square;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Write as _;
use thiserror::Error;

/// Rejections produced while parsing the board wire format.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotationError {
    #[error("board notation length {0} is not a multiple of 4")]
    Length(usize),
    #[error("invalid coordinate digit {0:?}")]
    Coordinate(char),
    #[error("invalid color letter {0:?}")]
    Color(char),
    #[error("invalid kind letter {0:?}")]
    Kind(char),
}

fn coordinate_digit(byte: u8) -> Result<u8, NotationError> {
    if (b'0'..=b'7').contains(&byte) {
        Ok(byte - b'0')
    } else {
        Err(NotationError::Coordinate(byte as char))
    }
}

impl Board {
    /// Wire form: a `<row><col><color><kind>` quad per piece, row-major.
    /// The empty board serializes to the empty string.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        for sq in Square::all() {
            let Some((color, kind)) = self.piece_at(sq) else {
                continue;
            };
            let _ = write!(
                out,
                "{}{}{}{}",
                sq.row(),
                sq.col(),
                color.wire_char(),
                kind.wire_char()
            );
        }
        out
    }

    /// Inverse of [`Board::to_wire`].
    pub fn from_wire(s: &str) -> Result<Board, NotationError> {
        let bytes = s.as_bytes();
        if bytes.len() % 4 != 0 {
            return Err(NotationError::Length(bytes.len()));
        }
        let mut board = Board::empty();
        for quad in bytes.chunks_exact(4) {
            let row = coordinate_digit(quad[0])?;
            let col = coordinate_digit(quad[1])?;
            let color = match quad[2] {
                b'w' => Color::White,
                b'b' => Color::Black,
                other => return Err(NotationError::Color(other as char)),
            };
            let kind = match quad[3] {
                b'p' => Kind::Pawn,
                b'k' => Kind::King,
                other => return Err(NotationError::Kind(other as char)),
            };
            board.set(Square::new(row, col), color, kind);
        }
        Ok(board)
    }

    /// Builds a board from a diagram in the [`std::fmt::Display`] glyphs.
    ///
    /// Lines are trimmed and blank lines skipped; within a line every
    /// character advances one column, with `x`, `#`, `o`, `@` placing a
    /// piece and anything else leaving the square empty. Rows and columns
    /// past the eighth are ignored. Meant for tests and fixtures, so
    /// unknown characters are not errors.
    #[must_use]
    pub fn from_diagram(diagram: &str) -> Board {
        let mut board = Board::empty();
        let rows = diagram
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(8);
        for (row, line) in rows.enumerate() {
            for (col, cell) in line.chars().take(8).enumerate() {
                let (color, kind) = match cell {
                    'x' => (Color::Black, Kind::Pawn),
                    '#' => (Color::Black, Kind::King),
                    'o' => (Color::White, Kind::Pawn),
                    '@' => (Color::White, Kind::King),
                    _ => continue,
                };
                board.set(Square::new(row as u8, col as u8), color, kind);
            }
        }
        board
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Board::from_wire(&s).map_err(de::Error::custom)
    }
}
