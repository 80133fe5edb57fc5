/// Converts PGN game transcripts into the annotated EPD corpus format, one
/// record per position. `hmvc` counts plies since the last capture here,
/// since recorded games carry no engine search state.
///
/// Usage:
///   pgn2epd -i lichess_games.pgn > corpus.epd
///   pgn2epd -i games.pgn -v crazyhouse -c 1000
use std::io::Write;
use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use indicatif::ProgressBar;
use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use rand::Rng;
use shakmaty::variant::{Variant, VariantPosition};
use shakmaty::Position;

use tools::common::io::{game_count, open_reader};
use varstats_core::epd::{EpdRecord, OP_GAME_ID, OP_RESULT, OP_STABLE_PLY, OP_VARIANT};
use varstats_core::rules;

#[derive(Parser)]
#[command(about = "convert PGN games to annotated EPD positions")]
struct Cli {
    /// PGN input file (stdin when omitted, `.gz` is decompressed)
    #[arg(short, long)]
    input_file: Option<PathBuf>,

    /// Only convert games of this variant
    #[arg(short, long)]
    variant: Option<String>,

    /// Maximum number of games to convert
    #[arg(short, long)]
    count: Option<u64>,
}

#[derive(Default)]
struct GameTags {
    variant_name: Option<String>,
    start_fen: Option<String>,
    result: Option<String>,
}

struct GameState {
    variant: Variant,
    pos: VariantPosition,
    result: Option<String>,
    game_id: String,
    stable_ply: u32,
    lines: Vec<String>,
    ok: bool,
}

struct EpdEmitter {
    filter: Option<Variant>,
    games_seen: u64,
}

impl Visitor for EpdEmitter {
    type Tags = GameTags;
    type Movetext = GameState;
    /// Record lines of one game; empty when the game was skipped or dropped.
    type Output = Vec<String>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(GameTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        match name {
            b"Variant" => tags.variant_name = Some(value.decode_utf8_lossy().to_string()),
            b"FEN" => tags.start_fen = Some(value.decode_utf8_lossy().to_string()),
            b"Result" => tags.result = Some(value.decode_utf8_lossy().to_string()),
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        self.games_seen += 1;
        let mut ok = true;
        let variant = match tags.variant_name.as_deref() {
            None => Variant::Chess,
            Some(name) => match rules::variant_from_name(name) {
                Ok(variant) => variant,
                Err(e) => {
                    log::warn!("skipping game {}: {e}", self.games_seen);
                    ok = false;
                    Variant::Chess
                }
            },
        };
        if self.filter.is_some_and(|filter| filter != variant) {
            ok = false;
        }
        let pos = match tags.start_fen.as_deref() {
            Some(fen) if ok => match rules::position_from_fen(variant, fen) {
                Ok(pos) => pos,
                Err(e) => {
                    log::warn!("skipping game {}: {e}", self.games_seen);
                    ok = false;
                    rules::start_position(variant)
                }
            },
            _ => rules::start_position(variant),
        };
        ControlFlow::Continue(GameState {
            variant,
            pos,
            result: tags.result,
            game_id: format!("{:032x}", rand::rng().random::<u128>()),
            stable_ply: 0,
            lines: Vec::new(),
            ok,
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        if !movetext.ok {
            return ControlFlow::Continue(());
        }
        match rules::parse_san_move(&movetext.pos, &san.san) {
            Ok(mv) => {
                movetext.stable_ply = if mv.is_capture() {
                    0
                } else {
                    movetext.stable_ply + 1
                };
                movetext.pos.play_unchecked(mv);
                let mut record = EpdRecord::new(rules::fen_of(&movetext.pos))
                    .with_op(OP_VARIANT, rules::variant_uci(movetext.variant))
                    .with_op(OP_STABLE_PLY, movetext.stable_ply);
                if let Some(result) = &movetext.result {
                    record = record.with_op(OP_RESULT, result);
                }
                movetext
                    .lines
                    .push(record.with_op(OP_GAME_ID, &movetext.game_id).to_string());
            }
            Err(e) => {
                log::warn!("dropping game {}: {e}", self.games_seen);
                movetext.ok = false;
                movetext.lines.clear();
            }
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(
        &mut self,
        _movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        if movetext.ok {
            movetext.lines
        } else {
            Vec::new()
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let filter = match &cli.variant {
        Some(name) => Some(rules::variant_from_name(name)?),
        None => None,
    };
    let (input, progress) = match &cli.input_file {
        Some(path) => (
            open_reader(path)?,
            match game_count(path) {
                Ok(total) => ProgressBar::new(total),
                Err(_) => ProgressBar::no_length(),
            },
        ),
        None => (open_reader("-")?, ProgressBar::no_length()),
    };

    let mut reader = Reader::new(input);
    let mut emitter = EpdEmitter {
        filter,
        games_seen: 0,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut converted = 0u64;
    while let Some(lines) = reader.read_game(&mut emitter)? {
        progress.inc(1);
        if lines.is_empty() {
            continue;
        }
        for line in &lines {
            writeln!(out, "{line}")?;
        }
        converted += 1;
        if cli.count.is_some_and(|max| converted >= max) {
            break;
        }
    }
    progress.finish_and_clear();
    out.flush()?;
    log::info!("converted {converted} of {} games", emitter.games_seen);
    Ok(())
}
