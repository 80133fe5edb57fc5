//! Terminal game results in PGN notation.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Result of a finished game, stated from white's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameResult {
    WhiteWin,
    BlackWin,
    Draw,
}

impl GameResult {
    /// Number of distinct results, for `[win, loss, draw]` tally arrays.
    pub const NUM: usize = 3;

    /// Index into a `[win, loss, draw]` tally (white's point of view).
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            GameResult::WhiteWin => 0,
            GameResult::BlackWin => 1,
            GameResult::Draw => 2,
        }
    }

    /// The same game scored for the other side.
    #[inline]
    pub const fn flipped(self) -> GameResult {
        match self {
            GameResult::WhiteWin => GameResult::BlackWin,
            GameResult::BlackWin => GameResult::WhiteWin,
            GameResult::Draw => GameResult::Draw,
        }
    }

    #[inline]
    pub const fn is_decisive(self) -> bool {
        !matches!(self, GameResult::Draw)
    }

    /// Score from white's point of view: win 1, draw ½.
    #[inline]
    pub const fn score(self) -> f64 {
        match self {
            GameResult::WhiteWin => 1.0,
            GameResult::BlackWin => 0.0,
            GameResult::Draw => 0.5,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            GameResult::WhiteWin => "1-0",
            GameResult::BlackWin => "0-1",
            GameResult::Draw => "1/2-1/2",
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GameResult {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1-0" => Ok(GameResult::WhiteWin),
            "0-1" => Ok(GameResult::BlackWin),
            "1/2-1/2" => Ok(GameResult::Draw),
            other => Err(Error::UnknownResult(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_labels() {
        for result in [GameResult::WhiteWin, GameResult::BlackWin, GameResult::Draw] {
            assert_eq!(result.label().parse::<GameResult>().unwrap(), result);
        }
        assert!("*".parse::<GameResult>().is_err());
    }

    #[test]
    fn test_flipped_preserves_draws() {
        assert_eq!(GameResult::WhiteWin.flipped(), GameResult::BlackWin);
        assert_eq!(GameResult::Draw.flipped(), GameResult::Draw);
        assert_eq!(GameResult::BlackWin.flipped().score(), 1.0);
    }
}
