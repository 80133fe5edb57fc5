/// Endgame outcome statistics over an EPD corpus: per-material win/loss/draw
/// tallies, inferred piece strength, and sufficient/insufficient mating
/// material.
///
/// Usage:
///   evaluate_endgames corpus.epd
///   evaluate_endgames --max-pieces 5 --stable-ply 3 corpus.epd.gz
///   evaluate_endgames --order-by all --json corpus.epd
use anyhow::Result;
use clap::Parser;

use tools::analysis::{
    corpus_progress, effective_inputs, for_each_record, EndgamesCollector, EndgamesConfig, OrderBy,
};
use varstats_core::rules;

#[derive(Parser)]
#[command(about = "endgame outcome statistics of an EPD corpus")]
struct Cli {
    /// EPD input files (`-` or none reads stdin, `.gz` is decompressed)
    epd_files: Vec<String>,

    /// Only required if not annotated in the input
    #[arg(short, long)]
    variant: Option<String>,

    /// Maximum number of pieces in an endgame
    #[arg(short, long, default_value_t = 4)]
    max_pieces: usize,

    /// Minimum plies since the last material change
    #[arg(short, long, default_value_t = 1)]
    stable_ply: u32,

    /// Report color-specific statistics
    #[arg(short = 'c', long)]
    keep_color: bool,

    /// Ignore the promoted state of pieces
    #[arg(short = 'p', long)]
    ignore_promotion: bool,

    /// Filter trivial endgames based on entropy
    #[arg(short = 'e', long, default_value_t = -1.0)]
    min_entropy: f64,

    /// Filter based on frequency
    #[arg(short = 'f', long, default_value_t = 0.0)]
    min_frequency: f64,

    /// Filter based on relevance
    #[arg(short = 'r', long, default_value_t = -1.0)]
    min_relevance: f64,

    /// Report ordering
    #[arg(short, long, value_enum, default_value_t = OrderBy::Relevance)]
    order_by: OrderBy,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(variant) = &cli.variant {
        rules::variant_from_name(variant)?;
    }
    let mut collector = EndgamesCollector::new(EndgamesConfig {
        variant: cli.variant,
        max_pieces: cli.max_pieces,
        stable_ply: cli.stable_ply,
        keep_color: cli.keep_color,
        ignore_promotion: cli.ignore_promotion,
        min_entropy: cli.min_entropy,
        min_frequency: cli.min_frequency,
        min_relevance: cli.min_relevance,
        order_by: cli.order_by,
    });
    let files = effective_inputs(&cli.epd_files);
    let progress = corpus_progress(&files);
    for_each_record(&files, &progress, |record| collector.add(&record))?;
    progress.finish_and_clear();

    log::info!("classified {} records", collector.record_count());
    let report = collector.finish();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_text();
    }
    Ok(())
}
