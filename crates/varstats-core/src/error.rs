//! Crate-wide error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("empty EPD record")]
    EmptyRecord,

    #[error("malformed EPD annotation `{0}` (expected `key value`)")]
    MalformedAnnotation(String),

    #[error("unknown game result `{0}`")]
    UnknownResult(String),

    #[error("unsupported variant `{name}` (supported: {supported})")]
    UnsupportedVariant { name: String, supported: String },

    #[error("invalid FEN `{fen}`: {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("bad move `{mv}`: {reason}")]
    BadMove { mv: String, reason: String },

    #[error("no samples left after filtering")]
    EmptySample,

    #[error("feature/label shape mismatch: {rows} rows vs {labels} labels")]
    ShapeMismatch { rows: usize, labels: usize },
}
