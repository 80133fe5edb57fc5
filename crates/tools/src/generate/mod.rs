pub mod book;
pub mod engine;
pub mod game;

pub use book::load_start_fens;
pub use engine::{EngineConfig, EngineProcess, EngineScore, SearchLimits, SearchOutcome};
pub use game::{run_game, GameConfig, GeneratedGame, PositionSample};
