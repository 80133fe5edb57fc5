//! Piece values fitted from decisive game outcomes.
//!
//! Every qualifying record contributes one sample: the per-type material
//! difference from the mover's point of view, labelled with whether the
//! mover went on to win. A logistic fit over those samples yields one value
//! per piece type plus a move-advantage intercept.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use serde::Serialize;
use varstats_core::logistic::{self, FitConfig};
use varstats_core::material::{self, MaterialSignature, PieceToken};
use varstats_core::EpdRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    /// Normalize by the smallest coefficient above 0.1 (a pawn-like unit).
    #[default]
    Auto,
    /// Raw logistic coefficients.
    Raw,
    /// Elo equivalents per unit of material.
    Elo,
    /// Natural units: 200 Elo = 1.
    Natural,
}

pub struct PieceValuesConfig {
    pub stable_ply: u32,
    pub keep_color: bool,
    pub ignore_promotion: bool,
    pub scale: Scale,
    /// Only fit positions showing this material imbalance.
    pub imbalance: Option<MaterialSignature>,
    pub max_iter: usize,
}

pub struct PieceValuesCollector {
    config: PieceValuesConfig,
    samples: Vec<(BTreeMap<PieceToken, i32>, f64)>,
}

impl PieceValuesCollector {
    pub fn new(config: PieceValuesConfig) -> Self {
        PieceValuesCollector {
            config,
            samples: Vec::new(),
        }
    }

    pub fn add(&mut self, record: &EpdRecord) {
        let Some(result) = record.result() else {
            return;
        };
        if !result.is_decisive() || record.stable_ply() < self.config.stable_ply {
            return;
        }
        let signature = MaterialSignature::from_board_field(
            record.board_field(),
            self.config.ignore_promotion,
        );
        if let Some(imbalance) = &self.config.imbalance {
            if !material::has_imbalance(&signature, imbalance) {
                return;
            }
        }
        let black_pov = !self.config.keep_color && !record.white_to_move().unwrap_or(true);
        let pov_result = if black_pov { result.flipped() } else { result };
        let mut diffs = signature.piece_diffs();
        if black_pov {
            for diff in diffs.values_mut() {
                *diff = -*diff;
            }
        }
        self.samples.push((diffs, pov_result.score()));
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn fit(self) -> Result<PieceValuesReport> {
        let columns: Vec<PieceToken> = self
            .samples
            .iter()
            .flat_map(|(diffs, _)| diffs.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let rows: Vec<Vec<f64>> = self
            .samples
            .iter()
            .map(|(diffs, _)| {
                columns
                    .iter()
                    .map(|c| diffs.get(c).copied().unwrap_or(0) as f64)
                    .collect()
            })
            .collect();
        let labels: Vec<f64> = self.samples.iter().map(|(_, label)| *label).collect();
        let model = logistic::fit(
            &rows,
            &labels,
            &FitConfig {
                max_iter: self.config.max_iter,
                ..FitConfig::default()
            },
        )
        .context("piece value fit failed")?;

        let norm = match self.config.scale {
            Scale::Raw => 1.0,
            Scale::Natural => std::f64::consts::LN_10 / 2.0,
            Scale::Elo => std::f64::consts::LN_10 / 400.0,
            Scale::Auto => {
                let smallest = model
                    .coefficients
                    .iter()
                    .map(|v| v.abs())
                    .filter(|v| *v > 0.1)
                    .fold(f64::INFINITY, f64::min);
                if smallest.is_finite() {
                    smallest
                } else {
                    log::warn!("no coefficient above 0.1, printing raw values");
                    1.0
                }
            }
        };

        let mut values: Vec<PieceValue> = columns
            .iter()
            .zip(&model.coefficients)
            .map(|(column, &coefficient)| PieceValue {
                piece: column.to_string(),
                value: coefficient / norm,
                raw: coefficient,
            })
            .collect();
        values.sort_by(|a, b| b.raw.partial_cmp(&a.raw).unwrap_or(Ordering::Equal));

        Ok(PieceValuesReport {
            samples: labels.len(),
            values,
            intercept_label: if self.config.keep_color {
                "white"
            } else {
                "move"
            },
            intercept: model.intercept / norm,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PieceValue {
    pub piece: String,
    pub value: f64,
    #[serde(skip)]
    raw: f64,
}

#[derive(Debug, Serialize)]
pub struct PieceValuesReport {
    pub samples: usize,
    pub values: Vec<PieceValue>,
    pub intercept_label: &'static str,
    pub intercept: f64,
}

impl PieceValuesReport {
    pub fn print_text(&self) {
        for value in &self.values {
            println!("{} {:.2}", value.piece, value.value);
        }
        println!("{} {:.2}", self.intercept_label, self.intercept);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PieceValuesConfig {
        PieceValuesConfig {
            stable_ply: 1,
            keep_color: false,
            ignore_promotion: false,
            scale: Scale::Raw,
            imbalance: None,
            max_iter: 1000,
        }
    }

    fn add_n(collector: &mut PieceValuesCollector, line: &str, n: usize) {
        let record = EpdRecord::parse(line).unwrap();
        for _ in 0..n {
            collector.add(&record);
        }
    }

    #[test]
    fn test_filters() {
        let mut collector = PieceValuesCollector::new(config());
        // No result, draw, and unstable records are all skipped.
        collector.add(&EpdRecord::parse("KQkr w - - 0 1").unwrap());
        collector.add(&EpdRecord::parse("KQkr w - - 0 1;result 1/2-1/2;hmvc 5").unwrap());
        collector.add(&EpdRecord::parse("KQkr w - - 0 1;result 1-0;hmvc 0").unwrap());
        assert_eq!(collector.sample_count(), 0);
        collector.add(&EpdRecord::parse("KQkr w - - 0 1;result 1-0;hmvc 1").unwrap());
        assert_eq!(collector.sample_count(), 1);
    }

    #[test]
    fn test_imbalance_filter() {
        let mut collector = PieceValuesCollector::new(PieceValuesConfig {
            imbalance: Some(MaterialSignature::from_board_field("Qr", false)),
            ..config()
        });
        collector.add(&EpdRecord::parse("KQkr w - - 0 1;result 1-0;hmvc 1").unwrap());
        collector.add(&EpdRecord::parse("KQkq w - - 0 1;result 1-0;hmvc 1").unwrap());
        assert_eq!(collector.sample_count(), 1);
    }

    #[test]
    fn test_queen_outranks_rook() {
        let mut collector = PieceValuesCollector::new(config());
        // Queen edges always win, rook edges usually, pawn edges sometimes.
        add_n(&mut collector, "KQkr w - - 0 1;result 1-0;hmvc 2", 20);
        add_n(&mut collector, "KRkp w - - 0 1;result 1-0;hmvc 2", 16);
        add_n(&mut collector, "KRkp w - - 0 1;result 0-1;hmvc 2", 4);
        add_n(&mut collector, "KPk w - - 0 1;result 1-0;hmvc 2", 11);
        add_n(&mut collector, "KPk w - - 0 1;result 0-1;hmvc 2", 9);
        let report = collector.fit().unwrap();

        assert_eq!(report.samples, 60);
        assert_eq!(report.intercept_label, "move");
        let order: Vec<&str> = report.values.iter().map(|v| v.piece.as_str()).collect();
        let q = order.iter().position(|p| *p == "q").unwrap();
        let r = order.iter().position(|p| *p == "r").unwrap();
        let p = order.iter().position(|p| *p == "p").unwrap();
        assert!(q < r && r < p);
    }

    #[test]
    fn test_black_point_of_view_flips() {
        // The same imbalance seen from black's side must produce the same fit.
        let mut white_pov = PieceValuesCollector::new(config());
        add_n(&mut white_pov, "KQk w - - 0 1;result 1-0;hmvc 2", 10);
        add_n(&mut white_pov, "KQk w - - 0 1;result 0-1;hmvc 2", 2);
        let mut black_pov = PieceValuesCollector::new(config());
        add_n(&mut black_pov, "Kkq b - - 0 1;result 0-1;hmvc 2", 10);
        add_n(&mut black_pov, "Kkq b - - 0 1;result 1-0;hmvc 2", 2);

        let white_report = white_pov.fit().unwrap();
        let black_report = black_pov.fit().unwrap();
        let wq = white_report.values.iter().find(|v| v.piece == "q").unwrap();
        let bq = black_report.values.iter().find(|v| v.piece == "q").unwrap();
        assert!((wq.value - bq.value).abs() < 1e-9);
        assert!(wq.value > 0.0);
    }
}
