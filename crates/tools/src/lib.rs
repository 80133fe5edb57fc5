//! Tooling around chess-variant position corpora: a UCI engine driver and
//! game generator on the producing side, and the aggregation logic behind
//! the statistics CLIs on the consuming side.

pub mod analysis;
pub mod common;
pub mod generate;
