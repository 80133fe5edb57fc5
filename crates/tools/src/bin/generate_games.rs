/// Engine-driven position generation: plays engine-vs-itself games with an
/// external UCI engine and samples every position into the annotated EPD
/// corpus format.
///
/// # Examples
///
/// - 1000 chess positions at 10ms per move, to stdout:
///   `generate_games --engine fairy-stockfish --movetime 10`
///
/// - crazyhouse at fixed depth with four workers, appended to a corpus:
///   `generate_games --engine fairy-stockfish --variant crazyhouse --depth 8 \
///      --count 100000 --workers 4 --epd-file crazyhouse.epd.gz`
///
/// With `--seed`, start-position picks and game ids are reproducible; the
/// engine's own play still varies unless it is configured deterministically.
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossbeam_channel as chan;
use indicatif::{ProgressBar, ProgressStyle};
use rand::prelude::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shakmaty::variant::Variant;

use tools::common::io::open_writer;
use tools::generate::{
    load_start_fens, run_game, EngineConfig, EngineProcess, GameConfig, GeneratedGame,
    SearchLimits,
};
use varstats_core::epd::{
    EpdRecord, OP_BEST_MOVE, OP_GAME_ID, OP_RESULT, OP_STABLE_PLY, OP_VARIANT,
};
use varstats_core::rules;

#[derive(Parser, Debug)]
#[command(about = "generate chess-variant positions with an external UCI engine")]
struct Cli {
    /// Chess variant engine path, e.g. to Fairy-Stockfish
    #[arg(short, long)]
    engine: PathBuf,

    /// Extra arguments passed to the engine process
    #[arg(long, num_args = 1..)]
    engine_args: Option<Vec<String>>,

    /// UCI option as a Name=Value pair. Repeat to add more options.
    #[arg(short = 'o', long = "uci-option")]
    uci_options: Vec<String>,

    /// Variant to generate positions for
    #[arg(short, long, default_value = "chess")]
    variant: String,

    /// Number of positions
    #[arg(short, long, default_value_t = 1000)]
    count: u64,

    /// Search depth
    #[arg(short, long)]
    depth: Option<u32>,

    /// Search movetime (ms)
    #[arg(short = 't', long)]
    movetime: Option<u64>,

    /// EPD opening book with start positions
    #[arg(short, long)]
    book: Option<PathBuf>,

    /// Write generated positions to this EPD file instead of stdout
    #[arg(long)]
    epd_file: Option<PathBuf>,

    /// Overwrite the EPD file instead of appending
    #[arg(long)]
    overwrite: bool,

    /// Number of parallel workers, each with its own engine process
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// RNG seed for reproducible start-position picks and game ids
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum plies per game before adjudicating a draw
    #[arg(long, default_value_t = 1024)]
    max_plies: u32,

    /// Safety margin used when detecting search timeouts (ms)
    #[arg(long, default_value_t = 1000)]
    timeout_margin_ms: u64,
}

/// Everything one worker needs to generate games on its own engine.
struct WorkerSettings {
    engine: PathBuf,
    engine_args: Vec<String>,
    uci_options: Vec<String>,
    variant: Variant,
    start_fens: Vec<String>,
    limits: SearchLimits,
    max_plies: u32,
    timeout_margin_ms: u64,
    seed: u64,
}

impl WorkerSettings {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            path: self.engine.clone(),
            args: self.engine_args.clone(),
            variant: Some(rules::variant_uci(self.variant).to_string()),
            uci_options: self.uci_options.clone(),
        }
    }

    fn game_config(&self) -> GameConfig {
        GameConfig {
            variant: self.variant,
            limits: self.limits,
            max_plies: self.max_plies,
            timeout_margin_ms: self.timeout_margin_ms,
        }
    }
}

enum WorkerEvent {
    Game(Vec<String>),
    Failed,
}

fn record_lines(game: &GeneratedGame, variant: Variant, game_id: &str) -> Vec<String> {
    game.samples
        .iter()
        .map(|sample| {
            EpdRecord::new(sample.fen.clone())
                .with_op(OP_VARIANT, rules::variant_uci(variant))
                .with_op(OP_BEST_MOVE, sample.played.as_deref().unwrap_or("none"))
                .with_op(OP_STABLE_PLY, sample.stable_ply)
                .with_op(OP_RESULT, game.result)
                .with_op(OP_GAME_ID, game_id)
                .to_string()
        })
        .collect()
}

fn worker_main(
    settings: WorkerSettings,
    label: String,
    tx: chan::Sender<WorkerEvent>,
    shutdown: Arc<AtomicBool>,
) {
    let mut engine = match EngineProcess::spawn(&settings.engine_config(), label.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("{label}: {e:#}");
            return;
        }
    };
    let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
    let game_config = settings.game_config();
    while !shutdown.load(Ordering::Relaxed) {
        let Some(start_fen) = settings.start_fens.choose(&mut rng) else {
            break;
        };
        let game_id = format!("{:032x}", rng.random::<u128>());
        let event = match run_game(&mut engine, start_fen, &game_config) {
            Ok(game) => WorkerEvent::Game(record_lines(&game, settings.variant, &game_id)),
            Err(e) => {
                log::warn!("{label}: game failed: {e:#}");
                WorkerEvent::Failed
            }
        };
        if tx.send(event).is_err() {
            break;
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.workers < 1 {
        bail!("number of workers must be at least 1");
    }
    let limits = SearchLimits {
        depth: cli.depth,
        movetime: cli.movetime,
    };
    if limits.is_empty() {
        bail!("at least one of --depth and --movetime is required");
    }
    let variant = rules::variant_from_name(&cli.variant)?;
    let start_fens = load_start_fens(cli.book.as_deref(), variant)?;
    let seed = cli.seed.unwrap_or_else(|| rand::rng().random());

    let mut writer = match &cli.epd_file {
        Some(path) => open_writer(path, !cli.overwrite)
            .with_context(|| format!("failed to open {}", path.display()))?,
        None => open_writer("-", false)?,
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
            .context("failed to install the Ctrl-C handler")?;
    }

    let progress = ProgressBar::new(cli.count);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} positions")
            .expect("valid template"),
    );

    let settings_for = |worker_id: usize| WorkerSettings {
        engine: cli.engine.clone(),
        engine_args: cli.engine_args.clone().unwrap_or_default(),
        uci_options: cli.uci_options.clone(),
        variant,
        start_fens: start_fens.clone(),
        limits,
        max_plies: cli.max_plies,
        timeout_margin_ms: cli.timeout_margin_ms,
        seed: seed.wrapping_add(worker_id as u64),
    };

    let mut written = 0u64;
    let mut failures = 0u64;

    if cli.workers == 1 {
        // Single-worker fast path: no threads, write as games finish.
        let settings = settings_for(0);
        let mut engine = EngineProcess::spawn(&settings.engine_config(), "engine".to_string())?;
        let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
        let game_config = settings.game_config();
        while written < cli.count && !shutdown.load(Ordering::Relaxed) {
            let Some(start_fen) = settings.start_fens.choose(&mut rng) else {
                break;
            };
            let game_id = format!("{:032x}", rng.random::<u128>());
            match run_game(&mut engine, start_fen, &game_config) {
                Ok(game) => {
                    for line in record_lines(&game, variant, &game_id) {
                        if written >= cli.count {
                            break;
                        }
                        writeln!(writer, "{line}")?;
                        written += 1;
                        progress.inc(1);
                    }
                }
                Err(e) => {
                    log::warn!("game failed: {e:#}");
                    failures += 1;
                }
            }
        }
    } else {
        // Rendezvous channel: workers block until the writer takes a game,
        // so nothing queues up past the requested count.
        let (tx, rx) = chan::bounded::<WorkerEvent>(0);
        let mut handles = Vec::new();
        for worker_id in 0..cli.workers {
            let settings = settings_for(worker_id);
            let tx = tx.clone();
            let shutdown = shutdown.clone();
            let label = format!("worker-{worker_id}");
            handles.push(thread::spawn(move || {
                worker_main(settings, label, tx, shutdown)
            }));
        }
        drop(tx);

        while written < cli.count && !shutdown.load(Ordering::Relaxed) {
            match rx.recv() {
                Ok(WorkerEvent::Game(lines)) => {
                    for line in lines {
                        if written >= cli.count {
                            break;
                        }
                        writeln!(writer, "{line}")?;
                        written += 1;
                        progress.inc(1);
                    }
                }
                Ok(WorkerEvent::Failed) => failures += 1,
                // All workers gone (e.g. the engine path is bad everywhere).
                Err(_) => break,
            }
        }
        shutdown.store(true, Ordering::Relaxed);
        drop(rx);
        for handle in handles {
            let _ = handle.join();
        }
    }

    progress.finish_and_clear();
    writer.close().context("failed to finalize output")?;
    if failures > 0 {
        log::warn!("{failures} games failed to generate");
    }
    if written == 0 && cli.count > 0 {
        bail!("no positions were generated");
    }
    if written < cli.count {
        log::warn!("wrote {written} of {} requested positions", cli.count);
    }
    Ok(())
}
