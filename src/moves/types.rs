use crate::board::{Color, Kind};
use crate::square::Square;
use arrayvec::ArrayVec;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::Write as _;
use std::ops::Deref;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on instructions in one ply: a chain can capture at most the
/// opponent's 12 pieces (12 moves + 12 captures) plus a trailing crown.
pub const MAX_PLY_STEPS: usize = 25;

/// An atomic, reversible board edit. A [`Ply`] is a sequence of these.
///
/// `Capture` records the captured piece so the edit can be undone without
/// consulting any other state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    Move {
        from: Square,
        to: Square,
    },
    Capture {
        at: Square,
        color: Color,
        kind: Kind,
    },
    Crown {
        at: Square,
    },
}

/// Rejections produced while parsing instruction tokens or ply strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlyParseError {
    #[error("empty instruction token")]
    Empty,
    #[error("unknown instruction tag {0:?}")]
    Tag(char),
    #[error("instruction token {0:?} has the wrong length")]
    Length(String),
    #[error("invalid coordinate digit {0:?}")]
    Coordinate(char),
    #[error("invalid captured color {0:?}")]
    Color(char),
    #[error("invalid captured kind {0:?}")]
    Kind(char),
    #[error("ply has more than {MAX_PLY_STEPS} instructions")]
    TooManyInstructions,
}

fn coordinate_digit(byte: u8) -> Result<u8, PlyParseError> {
    if (b'0'..=b'7').contains(&byte) {
        Ok(byte - b'0')
    } else {
        Err(PlyParseError::Coordinate(byte as char))
    }
}

impl Instruction {
    #[inline]
    #[must_use]
    pub fn is_capture(&self) -> bool {
        matches!(self, Instruction::Capture { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_crown(&self) -> bool {
        matches!(self, Instruction::Crown { .. })
    }

    /// Wire token: `m<r><c><r><c>`, `c<r><c><color><kind>` or `k<r><c>`.
    #[must_use]
    pub fn to_token(&self) -> String {
        match *self {
            Instruction::Move { from, to } => {
                format!(
                    "m{}{}{}{}",
                    from.row(),
                    from.col(),
                    to.row(),
                    to.col()
                )
            }
            Instruction::Capture { at, color, kind } => {
                format!(
                    "c{}{}{}{}",
                    at.row(),
                    at.col(),
                    color.wire_char(),
                    kind.wire_char()
                )
            }
            Instruction::Crown { at } => format!("k{}{}", at.row(), at.col()),
        }
    }

    /// Inverse of [`Instruction::to_token`].
    pub fn from_token(token: &str) -> Result<Instruction, PlyParseError> {
        let bytes = token.as_bytes();
        let Some(&tag) = bytes.first() else {
            return Err(PlyParseError::Empty);
        };
        match tag {
            b'm' => {
                if bytes.len() != 5 {
                    return Err(PlyParseError::Length(token.to_string()));
                }
                let from = Square::new(coordinate_digit(bytes[1])?, coordinate_digit(bytes[2])?);
                let to = Square::new(coordinate_digit(bytes[3])?, coordinate_digit(bytes[4])?);
                Ok(Instruction::Move { from, to })
            }
            b'c' => {
                if bytes.len() != 5 {
                    return Err(PlyParseError::Length(token.to_string()));
                }
                let at = Square::new(coordinate_digit(bytes[1])?, coordinate_digit(bytes[2])?);
                let color = match bytes[3] {
                    b'w' => Color::White,
                    b'b' => Color::Black,
                    other => return Err(PlyParseError::Color(other as char)),
                };
                let kind = match bytes[4] {
                    b'p' => Kind::Pawn,
                    b'k' => Kind::King,
                    other => return Err(PlyParseError::Kind(other as char)),
                };
                Ok(Instruction::Capture { at, color, kind })
            }
            b'k' => {
                if bytes.len() != 3 {
                    return Err(PlyParseError::Length(token.to_string()));
                }
                let at = Square::new(coordinate_digit(bytes[1])?, coordinate_digit(bytes[2])?);
                Ok(Instruction::Crown { at })
            }
            other => Err(PlyParseError::Tag(other as char)),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Move { from, to } => write!(f, "{{move {from} to {to}}}"),
            Instruction::Capture { at, color, kind } => {
                write!(f, "{{capture {at} {color} {kind}}}")
            }
            Instruction::Crown { at } => write!(f, "{{crown {at}}}"),
        }
    }
}

impl Serialize for Instruction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_token())
    }
}

impl<'de> Deserialize<'de> for Instruction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Instruction::from_token(&s).map_err(de::Error::custom)
    }
}

/// One player's complete turn: an ordered instruction sequence.
///
/// A simple move is `[Move]` or `[Move, Crown]`; a capture chain alternates
/// `Move`/`Capture` pairs with at most one trailing `Crown`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ply {
    steps: ArrayVec<Instruction, MAX_PLY_STEPS>,
}

impl Ply {
    #[must_use]
    pub fn new() -> Self {
        Ply::default()
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.steps.push(instruction);
    }

    pub fn pop(&mut self) -> Option<Instruction> {
        self.steps.pop()
    }

    #[must_use]
    pub fn capture_count(&self) -> usize {
        self.steps.iter().filter(|i| i.is_capture()).count()
    }

    #[inline]
    #[must_use]
    pub fn is_capture(&self) -> bool {
        self.steps.iter().any(Instruction::is_capture)
    }

    #[inline]
    #[must_use]
    pub fn has_crown(&self) -> bool {
        self.steps.iter().any(Instruction::is_crown)
    }

    /// Destination of the last `Move`, i.e. where the moving piece ends up.
    #[must_use]
    pub fn final_destination(&self) -> Option<Square> {
        self.steps.iter().rev().find_map(|i| match i {
            Instruction::Move { to, .. } => Some(*to),
            _ => None,
        })
    }

    /// Wire form: comma-joined instruction tokens; the empty ply is the
    /// empty string.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        let mut sep = "";
        for instruction in &self.steps {
            let _ = write!(out, "{sep}{}", instruction.to_token());
            sep = ",";
        }
        out
    }
}

impl Deref for Ply {
    type Target = [Instruction];

    fn deref(&self) -> &[Instruction] {
        &self.steps
    }
}

impl FromIterator<Instruction> for Ply {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Ply {
            steps: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Ply {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl fmt::Display for Ply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for instruction in &self.steps {
            write!(f, "{sep}{instruction}")?;
            sep = ";";
        }
        Ok(())
    }
}

impl FromStr for Ply {
    type Err = PlyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Ply::new());
        }
        let mut ply = Ply::new();
        for token in s.split(',') {
            if ply.steps.is_full() {
                return Err(PlyParseError::TooManyInstructions);
            }
            ply.push(Instruction::from_token(token)?);
        }
        Ok(ply)
    }
}

impl Serialize for Ply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Ply {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
