use std::collections::HashMap;

use anyhow::{bail, Result};
use shakmaty::variant::Variant;
use shakmaty::zobrist::Zobrist64;
use shakmaty::Position;
use varstats_core::material::MaterialSignature;
use varstats_core::rules;
use varstats_core::GameResult;

use super::engine::{EngineProcess, SearchLimits};

/// Per-game settings.
pub struct GameConfig {
    pub variant: Variant,
    pub limits: SearchLimits,
    /// Safety cap; a game hitting it is adjudicated as a draw.
    pub max_plies: u32,
    pub timeout_margin_ms: u64,
}

/// One sampled position of a finished game.
pub struct PositionSample {
    /// FEN after the move leading here.
    pub fen: String,
    /// Move the engine played from this position; `None` on the last sample.
    pub played: Option<String>,
    /// Plies since the material on the board last changed.
    pub stable_ply: u32,
}

pub struct GeneratedGame {
    pub samples: Vec<PositionSample>,
    pub result: GameResult,
    pub plies: u32,
}

/// Play one engine-vs-itself game from `start_fen` and sample every position
/// along the way. Ends mandated by the rules take their real result; optional
/// ends (50-move rule, threefold repetition, dead material, the ply cap) are
/// adjudicated as draws.
pub fn run_game(
    engine: &mut EngineProcess,
    start_fen: &str,
    config: &GameConfig,
) -> Result<GeneratedGame> {
    let mut pos = rules::position_from_fen(config.variant, start_fen)?;
    engine.new_game()?;

    let mut moves: Vec<String> = Vec::new();
    let mut fens: Vec<String> = Vec::new();
    let mut stable: Vec<u32> = Vec::new();
    let mut repetitions: HashMap<Zobrist64, u32> = HashMap::new();
    repetitions.insert(rules::position_key(&pos), 1);
    let mut prev_material = MaterialSignature::from_board_field(start_board(start_fen), false);
    let mut last_change = 0usize;

    let result = loop {
        if let Some(result) = rules::rules_outcome(&pos) {
            break result;
        }
        let repeated = repetitions
            .get(&rules::position_key(&pos))
            .copied()
            .unwrap_or(0)
            >= 3;
        if repeated || rules::optional_draw(&pos) || moves.len() as u32 >= config.max_plies {
            break GameResult::Draw;
        }

        let search = engine.search(start_fen, &moves, &config.limits, config.timeout_margin_ms)?;
        let Some(bestmove) = search.bestmove else {
            bail!(
                "{}: no bestmove after {} plies{}",
                engine.label,
                moves.len(),
                if search.timed_out { " (timeout)" } else { "" }
            );
        };
        let mv = rules::parse_uci_move(&pos, &bestmove)?;
        pos.play_unchecked(mv);
        moves.push(bestmove);

        let fen = rules::fen_of(&pos);
        let material = MaterialSignature::from_board_field(start_board(&fen), false);
        if material != prev_material {
            last_change = moves.len();
            prev_material = material;
        }
        stable.push((moves.len() - last_change) as u32);
        fens.push(fen);
        *repetitions.entry(rules::position_key(&pos)).or_insert(0) += 1;
    };

    let plies = moves.len() as u32;
    let samples = fens
        .into_iter()
        .enumerate()
        .map(|(i, fen)| PositionSample {
            fen,
            played: moves.get(i + 1).cloned(),
            stable_ply: stable[i],
        })
        .collect();

    Ok(GeneratedGame {
        samples,
        result,
        plies,
    })
}

fn start_board(fen: &str) -> &str {
    fen.split_whitespace().next().unwrap_or(fen)
}
