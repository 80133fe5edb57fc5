/// Fits piece values from the decisive games of an EPD corpus: logistic
/// regression of the game outcome against the mover's material differences.
///
/// Usage:
///   piece_values corpus.epd
///   piece_values --elo-scale --stable-ply 3 corpus.epd.gz
///   piece_values --imbalance Qr corpus.epd
use anyhow::{bail, Result};
use clap::Parser;

use tools::analysis::{
    corpus_progress, effective_inputs, for_each_record, PieceValuesCollector, PieceValuesConfig,
    Scale,
};
use varstats_core::material::MaterialSignature;
use varstats_core::rules;

#[derive(Parser)]
#[command(about = "fit piece values from decisive results in an EPD corpus")]
struct Cli {
    /// EPD input files (`-` or none reads stdin, `.gz` is decompressed)
    epd_files: Vec<String>,

    /// Only required if not annotated in the input
    #[arg(short, long)]
    variant: Option<String>,

    /// Minimum plies since the last material change
    #[arg(short, long, default_value_t = 1)]
    stable_ply: u32,

    /// Report color-specific statistics instead of mover-relative ones
    #[arg(short = 'c', long)]
    keep_color: bool,

    /// Ignore the promoted state of pieces
    #[arg(short = 'p', long)]
    ignore_promotion: bool,

    /// Don't normalize
    #[arg(short = 'r', long, conflicts_with_all = ["elo_scale", "natural_scale"])]
    raw_scale: bool,

    /// Scale to Elo equivalents
    #[arg(short = 'e', long, conflicts_with = "natural_scale")]
    elo_scale: bool,

    /// Use natural scale. 200 Elo = 1.
    #[arg(short = 'n', long)]
    natural_scale: bool,

    /// Only fit positions with this material imbalance, e.g. Qr
    #[arg(long)]
    imbalance: Option<String>,

    /// Iteration budget for the fit
    #[arg(long, default_value_t = 1000)]
    max_iter: usize,

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
    let imbalance = match cli.imbalance.as_deref() {
        Some(spec) => {
            let signature = MaterialSignature::from_board_field(spec, false);
            if signature.is_empty() {
                bail!("empty imbalance spec `{spec}`");
            }
            Some(signature)
        }
        None => None,
    };
    let scale = if cli.raw_scale {
        Scale::Raw
    } else if cli.natural_scale {
        Scale::Natural
    } else if cli.elo_scale {
        Scale::Elo
    } else {
        Scale::Auto
    };

    let mut collector = PieceValuesCollector::new(PieceValuesConfig {
        stable_ply: cli.stable_ply,
        keep_color: cli.keep_color,
        ignore_promotion: cli.ignore_promotion,
        scale,
        imbalance,
        max_iter: cli.max_iter,
    });
    let files = effective_inputs(&cli.epd_files);
    let progress = corpus_progress(&files);
    for_each_record(&files, &progress, |record| {
        collector.add(&record);
        Ok(())
    })?;
    progress.finish_and_clear();

    log::info!("fitting {} samples", collector.sample_count());
    let report = collector.fit()?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_text();
    }
    Ok(())
}
