/// Basic statistics over an EPD corpus: result distribution, game length
/// and, on request, the branching factor.
///
/// Usage:
///   game_stats corpus.epd
///   generate_games ... | game_stats -v crazyhouse -
///   game_stats --branching-factor --json corpus.epd.gz
use anyhow::Result;
use clap::Parser;

use tools::analysis::{
    corpus_progress, effective_inputs, for_each_record, GameStatsCollector, GameStatsConfig,
};

#[derive(Parser)]
#[command(about = "result distribution, game length and branching factor of an EPD corpus")]
struct Cli {
    /// EPD input files (`-` or none reads stdin, `.gz` is decompressed)
    epd_files: Vec<String>,

    /// Only required if not annotated in the input
    #[arg(short, long)]
    variant: Option<String>,

    /// Calculate the branching factor. Slow.
    #[arg(short, long)]
    branching_factor: bool,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let files = effective_inputs(&cli.epd_files);
    let mut collector = GameStatsCollector::new(GameStatsConfig {
        variant: cli.variant,
        branching_factor: cli.branching_factor,
    });
    let progress = corpus_progress(&files);
    for_each_record(&files, &progress, |record| collector.add(&record))?;
    progress.finish_and_clear();

    let report = collector.finish();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_text();
    }
    Ok(())
}
