// Core domain types: positions, scores, colors and move classifications.

use std::fmt;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A chess position in the single-line FEN notation used by the evaluator.
///
/// Positions are compared byte-for-byte; two FENs that describe the same
/// board with different move counters are different positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position(String);

impl Position {
    /// Build a position from raw text, trimming surrounding whitespace.
    ///
    /// Returns `None` for empty or whitespace-only input, which is how the
    /// board reports "not loaded yet".
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Position(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// White-relative evaluation in centipawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(pub i32);

impl Score {
    /// Magnitude used when the evaluator reports a forced mate.
    pub const MATE: i32 = 100_000;

    pub fn centipawns(self) -> i32 {
        self.0
    }

    /// Saturated score for a forced mate. Positive `moves` means white mates.
    pub fn from_mate(moves: i32) -> Option<Self> {
        match moves.signum() {
            1 => Some(Score(Self::MATE)),
            -1 => Some(Score(-Self::MATE)),
            _ => None,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Side to move. Deserializes from lowercase `"white"` / `"black"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Pawn glyph plus side name, used as the subject of an annotation.
    pub fn glyph(self) -> &'static str {
        match self {
            Color::White => "♙ White",
            Color::Black => "♟ Black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("white"),
            Color::Black => f.write_str("black"),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Move quality label. Variants are declared best-first, so the derived
/// ordering sorts better moves before worse ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Classification {
    Brilliant,
    VeryGood,
    Good,
    Neutral,
    Inaccurate,
    Mistake,
    Blunder,
}

impl Classification {
    /// All labels, best first.
    pub const ALL: [Classification; 7] = [
        Classification::Brilliant,
        Classification::VeryGood,
        Classification::Good,
        Classification::Neutral,
        Classification::Inaccurate,
        Classification::Mistake,
        Classification::Blunder,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Classification::Brilliant => "Brilliant",
            Classification::VeryGood => "Very Good",
            Classification::Good => "Good",
            Classification::Neutral => "Neutral",
            Classification::Inaccurate => "Inaccurate",
            Classification::Mistake => "Mistake",
            Classification::Blunder => "Blunder",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
