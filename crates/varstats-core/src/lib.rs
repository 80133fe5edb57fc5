//! Core types for chess-variant position corpora.
//!
//! The pipeline tools exchange positions as annotated EPD lines: a generator
//! (or PGN converter) produces them once, and the statistics tools consume
//! them read-only. This crate holds the record model, material-signature
//! arithmetic, the variant rules adapter over `shakmaty`, and the small
//! numeric pieces shared by the report tools.

pub mod epd;
pub mod error;
pub mod logistic;
pub mod material;
pub mod outcome;
pub mod rules;
pub mod stats;

pub use epd::EpdRecord;
pub use error::{Error, Result};
pub use material::{MaterialSignature, PieceToken};
pub use outcome::GameResult;
