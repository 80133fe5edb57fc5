//! Corpus records in the pipeline's EPD dialect.
//!
//! A record line is `<fen>;key value;key value;...`: the FEN comes first,
//! every later token is an annotation split on its first space. Unknown keys
//! are preserved verbatim so corpora survive round trips through the tools.

use std::fmt;

use crate::error::{Error, Result};
use crate::outcome::GameResult;

pub const OP_VARIANT: &str = "variant";
pub const OP_BEST_MOVE: &str = "bm";
pub const OP_STABLE_PLY: &str = "hmvc";
pub const OP_RESULT: &str = "result";
pub const OP_GAME_ID: &str = "game";

/// One annotated position. Immutable once parsed or built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpdRecord {
    fen: String,
    ops: Vec<(String, String)>,
}

impl EpdRecord {
    pub fn new(fen: impl Into<String>) -> Self {
        EpdRecord {
            fen: fen.into(),
            ops: Vec::new(),
        }
    }

    /// Append an annotation (builder style; later keys win in `op`).
    pub fn with_op(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.ops.push((key.to_string(), value.to_string()));
        self
    }

    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.split(';');
        let fen = tokens.next().unwrap_or_default().trim();
        if fen.is_empty() {
            return Err(Error::EmptyRecord);
        }
        let mut ops = Vec::new();
        for token in tokens {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (key, value) = token
                .split_once(' ')
                .ok_or_else(|| Error::MalformedAnnotation(token.to_string()))?;
            ops.push((key.to_string(), value.to_string()));
        }
        Ok(EpdRecord {
            fen: fen.to_string(),
            ops,
        })
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn op(&self, key: &str) -> Option<&str> {
        self.ops
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn variant(&self) -> Option<&str> {
        self.op(OP_VARIANT)
    }

    /// Annotated result; garbled values count as absent.
    pub fn result(&self) -> Option<GameResult> {
        self.op(OP_RESULT).and_then(|v| v.parse().ok())
    }

    /// Plies since the position last became unstable (`hmvc`), 0 when absent.
    pub fn stable_ply(&self) -> u32 {
        self.op(OP_STABLE_PLY)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn game_id(&self) -> Option<&str> {
        self.op(OP_GAME_ID)
    }

    pub fn best_move(&self) -> Option<&str> {
        self.op(OP_BEST_MOVE)
    }

    /// The piece-placement field of the FEN.
    pub fn board_field(&self) -> &str {
        self.fen.split_whitespace().next().unwrap_or(&self.fen)
    }

    /// `true` when white is to move; `None` when the FEN has no turn field.
    pub fn white_to_move(&self) -> Option<bool> {
        match self.fen.split_whitespace().nth(1) {
            Some("w") => Some(true),
            Some("b") => Some(false),
            _ => None,
        }
    }

    /// Fullmove number, taken from the last FEN field.
    pub fn fullmove_number(&self) -> Option<u32> {
        self.fen.split_whitespace().next_back()?.parse().ok()
    }
}

impl fmt::Display for EpdRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fen)?;
        for (key, value) in &self.ops {
            write!(f, ";{key} {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "8/8/8/8/8/4k3/8/4K2R w K - 7 61;variant chess;bm h1h8;hmvc 7;result 1-0;game 3f2a";

    #[test]
    fn test_parse_accessors() {
        let record = EpdRecord::parse(LINE).unwrap();
        assert_eq!(record.fen(), "8/8/8/8/8/4k3/8/4K2R w K - 7 61");
        assert_eq!(record.board_field(), "8/8/8/8/8/4k3/8/4K2R");
        assert_eq!(record.variant(), Some("chess"));
        assert_eq!(record.best_move(), Some("h1h8"));
        assert_eq!(record.stable_ply(), 7);
        assert_eq!(record.result(), Some(GameResult::WhiteWin));
        assert_eq!(record.game_id(), Some("3f2a"));
        assert_eq!(record.white_to_move(), Some(true));
        assert_eq!(record.fullmove_number(), Some(61));
    }

    #[test]
    fn test_display_round_trip() {
        let record = EpdRecord::parse(LINE).unwrap();
        assert_eq!(record.to_string(), LINE);
        assert_eq!(EpdRecord::parse(&record.to_string()).unwrap(), record);
    }

    #[test]
    fn test_builder_matches_parser() {
        let built = EpdRecord::new("4k3/8/8/8/8/8/8/4K3 b - - 0 40")
            .with_op(OP_VARIANT, "chess")
            .with_op(OP_STABLE_PLY, 3);
        assert_eq!(
            built.to_string(),
            "4k3/8/8/8/8/8/8/4K3 b - - 0 40;variant chess;hmvc 3"
        );
        assert_eq!(EpdRecord::parse(&built.to_string()).unwrap(), built);
    }

    #[test]
    fn test_defaults_and_errors() {
        let bare = EpdRecord::parse("4k3/8/8/8/8/8/8/4K3 b - - 0 40").unwrap();
        assert_eq!(bare.stable_ply(), 0);
        assert_eq!(bare.result(), None);
        assert!(EpdRecord::parse("   ").is_err());
        assert!(EpdRecord::parse("fen;novalue").is_err());
        // Trailing separators are tolerated.
        assert!(EpdRecord::parse("4k3/8/8/8/8/8/8/4K3 b - - 0 1;").is_ok());
    }
}
