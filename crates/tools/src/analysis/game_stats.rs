//! Result distribution, game length and branching factor over a corpus.

use std::collections::HashMap;

use anyhow::Result;
use serde::Serialize;
use varstats_core::rules;
use varstats_core::stats::Summary;
use varstats_core::{EpdRecord, GameResult};

use super::corpus::record_variant;

pub struct GameStatsConfig {
    pub variant: Option<String>,
    /// Branching factor needs move generation per record and is slow.
    pub branching_factor: bool,
}

pub struct GameStatsCollector {
    config: GameStatsConfig,
    records: u64,
    results: [u64; GameResult::NUM],
    game_length: HashMap<String, u32>,
    branching: Vec<f64>,
}

impl GameStatsCollector {
    pub fn new(config: GameStatsConfig) -> Self {
        GameStatsCollector {
            config,
            records: 0,
            results: [0; GameResult::NUM],
            game_length: HashMap::new(),
            branching: Vec::new(),
        }
    }

    pub fn add(&mut self, record: &EpdRecord) -> Result<()> {
        let variant = record_variant(record, self.config.variant.as_deref())?;
        self.records += 1;
        if let Some(game) = record.game_id() {
            if let Some(fullmove) = record.fullmove_number() {
                let length = self.game_length.entry(game.to_string()).or_insert(0);
                *length = (*length).max(fullmove);
            }
            if let Some(result) = record.result() {
                self.results[result.index()] += 1;
            }
        }
        if self.config.branching_factor {
            let pos = rules::position_from_fen(variant, record.fen())?;
            self.branching.push(rules::legal_move_count(&pos) as f64);
        }
        Ok(())
    }

    pub fn finish(self) -> GameStatsReport {
        let annotated: u64 = self.results.iter().sum();
        let results = [
            GameResult::WhiteWin,
            GameResult::BlackWin,
            GameResult::Draw,
        ]
        .into_iter()
        .filter_map(|r| {
            let count = self.results[r.index()];
            (count > 0).then(|| ResultShare {
                result: r.label().to_string(),
                count,
                share: count as f64 / annotated as f64,
            })
        })
        .collect();
        let lengths: Vec<f64> = self.game_length.values().map(|&v| v as f64).collect();
        GameStatsReport {
            records: self.records,
            games: self.game_length.len() as u64,
            results,
            game_length: Summary::from_samples(&lengths),
            branching_factor: Summary::from_samples(&self.branching),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultShare {
    pub result: String,
    pub count: u64,
    pub share: f64,
}

#[derive(Debug, Serialize)]
pub struct GameStatsReport {
    pub records: u64,
    pub games: u64,
    pub results: Vec<ResultShare>,
    pub game_length: Option<Summary>,
    pub branching_factor: Option<Summary>,
}

impl GameStatsReport {
    pub fn print_text(&self) {
        println!("\n# Results");
        if self.results.is_empty() {
            println!("No data");
        } else {
            for share in &self.results {
                println!("{}: {:.2}%", share.result, share.share * 100.0);
            }
        }
        println!("\n# Game length");
        print_summary(&self.game_length);
        println!("\n# Branching factor");
        print_summary(&self.branching_factor);
    }
}

fn print_summary(summary: &Option<Summary>) {
    match summary {
        Some(s) => {
            println!("Median: {}", s.median);
            println!("Mean: {:.1}", s.mean);
            println!("Max: {}", s.max);
        }
        None => println!("No data"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: &str) -> EpdRecord {
        EpdRecord::parse(line).unwrap()
    }

    #[test]
    fn test_result_distribution_and_length() {
        let mut collector = GameStatsCollector::new(GameStatsConfig {
            variant: Some("chess".to_string()),
            branching_factor: false,
        });
        // Game a: 40 moves, won by white; annotated on two records.
        collector
            .add(&record("4k3/8/8/8/8/8/8/4K3 w - - 0 12;game a;result 1-0"))
            .unwrap();
        collector
            .add(&record("4k3/8/8/8/8/8/8/4K3 w - - 0 40;game a;result 1-0"))
            .unwrap();
        // Game b: 20 moves, drawn.
        collector
            .add(&record("4k3/8/8/8/8/8/8/4K3 b - - 0 20;game b;result 1/2-1/2"))
            .unwrap();
        // Loose position without a game id contributes nothing here.
        collector
            .add(&record("4k3/8/8/8/8/8/8/4K3 w - - 0 1;result 0-1"))
            .unwrap();

        let report = collector.finish();
        assert_eq!(report.records, 4);
        assert_eq!(report.games, 2);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].result, "1-0");
        assert_eq!(report.results[0].count, 2);
        assert!((report.results[0].share - 2.0 / 3.0).abs() < 1e-12);

        let length = report.game_length.unwrap();
        assert_eq!(length.median, 30.0);
        assert_eq!(length.max, 40.0);
        assert!(report.branching_factor.is_none());
    }

    #[test]
    fn test_branching_factor() {
        let mut collector = GameStatsCollector::new(GameStatsConfig {
            variant: None,
            branching_factor: true,
        });
        collector
            .add(&record(
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1;variant chess;game a",
            ))
            .unwrap();
        let report = collector.finish();
        let branching = report.branching_factor.unwrap();
        assert_eq!(branching.mean, 20.0);
        assert_eq!(branching.max, 20.0);
    }

    #[test]
    fn test_missing_variant_errors() {
        let mut collector = GameStatsCollector::new(GameStatsConfig {
            variant: None,
            branching_factor: false,
        });
        assert!(collector
            .add(&record("4k3/8/8/8/8/8/8/4K3 w - - 0 1;game a"))
            .is_err());
    }
}
