//! Variant rules adapter over `shakmaty`.
//!
//! Everything the pipeline needs from a rules engine goes through here:
//! variant resolution (UCI identifiers and PGN header spellings), FEN
//! round trips, legal-move counts and game-end detection. The playing
//! engine itself stays an external process.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::variant::{Variant, VariantPosition};
use shakmaty::zobrist::Zobrist64;
use shakmaty::{CastlingMode, Color, EnPassantMode, KnownOutcome, Move, Outcome, Position};

use crate::error::{Error, Result};
use crate::outcome::GameResult;

/// Supported variants with their UCI identifiers, in report order.
pub const VARIANTS: &[(&str, Variant)] = &[
    ("chess", Variant::Chess),
    ("atomic", Variant::Atomic),
    ("antichess", Variant::Antichess),
    ("crazyhouse", Variant::Crazyhouse),
    ("horde", Variant::Horde),
    ("kingofthehill", Variant::KingOfTheHill),
    ("racingkings", Variant::RacingKings),
    ("3check", Variant::ThreeCheck),
];

pub fn supported_names() -> String {
    VARIANTS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn variant_uci(variant: Variant) -> &'static str {
    VARIANTS
        .iter()
        .find(|(_, v)| *v == variant)
        .map(|(name, _)| *name)
        .unwrap_or("chess")
}

/// Resolve a variant from a UCI identifier or a PGN `Variant` header value
/// ("Standard", "King of the Hill", "Three-check", ...). A `960` suffix
/// selects the base rules; Chess960 only changes the setup.
pub fn variant_from_name(name: &str) -> Result<Variant> {
    let mut key: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    if let Some(stripped) = key.strip_suffix("960") {
        key = stripped.to_string();
    }
    match key.as_str() {
        "chess" | "standard" | "fromposition" => Ok(Variant::Chess),
        "atomic" => Ok(Variant::Atomic),
        "antichess" | "giveaway" | "suicide" => Ok(Variant::Antichess),
        "crazyhouse" => Ok(Variant::Crazyhouse),
        "horde" => Ok(Variant::Horde),
        "kingofthehill" | "koth" => Ok(Variant::KingOfTheHill),
        "racingkings" | "racekings" => Ok(Variant::RacingKings),
        "threecheck" | "3check" => Ok(Variant::ThreeCheck),
        _ => Err(Error::UnsupportedVariant {
            name: name.to_string(),
            supported: supported_names(),
        }),
    }
}

pub fn start_position(variant: Variant) -> VariantPosition {
    VariantPosition::new(variant)
}

pub fn start_fen(variant: Variant) -> String {
    fen_of(&start_position(variant))
}

pub fn fen_of(pos: &VariantPosition) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

pub fn position_from_fen(variant: Variant, fen: &str) -> Result<VariantPosition> {
    let parsed: Fen = fen.parse::<Fen>().map_err(|e| Error::InvalidFen {
        fen: fen.to_string(),
        reason: e.to_string(),
    })?;
    VariantPosition::from_setup(variant, parsed.into_setup(), CastlingMode::Standard).map_err(
        |e| Error::InvalidFen {
            fen: fen.to_string(),
            reason: e.to_string(),
        },
    )
}

/// Parse an engine move in UCI notation against the current position.
pub fn parse_uci_move(pos: &VariantPosition, mv: &str) -> Result<Move> {
    let uci: UciMove = mv.parse::<UciMove>().map_err(|e| Error::BadMove {
        mv: mv.to_string(),
        reason: e.to_string(),
    })?;
    uci.to_move(pos).map_err(|e| Error::BadMove {
        mv: mv.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a SAN move (as found in PGN movetext) against the current position.
pub fn parse_san_move(pos: &VariantPosition, san: &San) -> Result<Move> {
    san.to_move(pos).map_err(|e| Error::BadMove {
        mv: san.to_string(),
        reason: e.to_string(),
    })
}

pub fn uci_of(mv: Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// Number of legal moves (the per-position branching factor).
pub fn legal_move_count(pos: &VariantPosition) -> usize {
    pos.legal_moves().len()
}

/// Repetition key for the position (castling/en-passant aware).
pub fn position_key(pos: &VariantPosition) -> Zobrist64 {
    pos.zobrist_hash(EnPassantMode::Legal)
}

/// Mandatory end by the rules of the variant (checkmate, stalemate,
/// variant-specific wins). `None` while the game can continue.
pub fn rules_outcome(pos: &VariantPosition) -> Option<GameResult> {
    match pos.outcome() {
        Outcome::Known(KnownOutcome::Decisive { winner }) => Some(if winner == Color::White {
            GameResult::WhiteWin
        } else {
            GameResult::BlackWin
        }),
        Outcome::Known(KnownOutcome::Draw) => Some(GameResult::Draw),
        Outcome::Unknown => None,
    }
}

/// Optional end a real game would be adjudicated on: 50-move rule or dead
/// material. Repetition needs history and is tracked by the game loop.
pub fn optional_draw(pos: &VariantPosition) -> bool {
    pos.halfmoves() >= 100 || pos.is_insufficient_material()
}
