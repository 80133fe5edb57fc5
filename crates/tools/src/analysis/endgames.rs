//! Endgame material statistics: frequency, outcome tallies, sufficiency.
//!
//! Signatures are color-normalized by default so that mirrored positions
//! land in the same bucket, royal pieces are inferred as the material every
//! position shares, and each signature's win/loss/draw tally feeds the
//! entropy- and relevance-ordered reports.

use std::cmp::Ordering;

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use varstats_core::material::{MaterialSignature, PieceToken};
use varstats_core::stats::entropy;
use varstats_core::{EpdRecord, GameResult};

use super::corpus::record_variant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OrderBy {
    /// Fewest pieces first.
    Material,
    Frequency,
    Entropy,
    /// Entropy weighted by frequency.
    #[default]
    Relevance,
    All,
}

impl OrderBy {
    fn selects(self, order: OrderBy) -> bool {
        self == OrderBy::All || self == order
    }

    const fn label(self) -> &'static str {
        match self {
            OrderBy::Material => "material",
            OrderBy::Frequency => "frequency",
            OrderBy::Entropy => "entropy",
            OrderBy::Relevance => "relevance",
            OrderBy::All => "all",
        }
    }
}

pub struct EndgamesConfig {
    pub variant: Option<String>,
    pub max_pieces: usize,
    pub stable_ply: u32,
    pub keep_color: bool,
    pub ignore_promotion: bool,
    pub min_entropy: f64,
    pub min_frequency: f64,
    pub min_relevance: f64,
    pub order_by: OrderBy,
}

/// Win rate a signature needs to count as mating material.
const SUFFICIENT_RATE: f64 = 0.9;

pub struct EndgamesCollector {
    config: EndgamesConfig,
    records: u64,
    endgames: BTreeMap<MaterialSignature, u64>,
    results: BTreeMap<MaterialSignature, [u64; GameResult::NUM]>,
    piece_score: BTreeMap<PieceToken, [f64; GameResult::NUM]>,
    royal: Option<MaterialSignature>,
}

impl EndgamesCollector {
    pub fn new(config: EndgamesConfig) -> Self {
        EndgamesCollector {
            config,
            records: 0,
            endgames: BTreeMap::new(),
            results: BTreeMap::new(),
            piece_score: BTreeMap::new(),
            royal: None,
        }
    }

    pub fn add(&mut self, record: &EpdRecord) -> Result<()> {
        record_variant(record, self.config.variant.as_deref())?;
        self.records += 1;

        let mut signature = MaterialSignature::from_board_field(
            record.board_field(),
            self.config.ignore_promotion,
        );
        let mut result = record.result();
        if !self.config.keep_color && signature.should_swap() {
            signature = signature.swapped();
            result = result.map(GameResult::flipped);
        }

        // Royal material is whatever every single position still has.
        self.royal = Some(match self.royal.take() {
            Some(royal) => royal.intersect(&signature),
            None => signature.clone(),
        });

        if record.stable_ply() < self.config.stable_ply {
            return Ok(());
        }
        if signature.len() <= self.config.max_pieces {
            *self.endgames.entry(signature.clone()).or_insert(0) += 1;
            if let Some(result) = result {
                self.results.entry(signature.clone()).or_insert([0; 3])[result.index()] += 1;
            }
        }
        if let Some(result) = result {
            let diffs = signature.piece_diffs();
            let total_imbalance: i64 = diffs.values().map(|v| v.abs() as i64).sum();
            // Positions with several imbalances at once say little about any
            // single piece; damp them hard.
            let damping = 1.0 + (total_imbalance as f64).powi(10);
            for (piece, diff) in diffs {
                let pov = if diff < 0 { result.flipped() } else { result };
                self.piece_score.entry(piece).or_insert([0.0; 3])[pov.index()] +=
                    diff.abs() as f64 / damping;
            }
        }
        Ok(())
    }

    pub fn record_count(&self) -> u64 {
        self.records
    }

    /// Loss rate of the piece's type, uppercase ranking before lowercase.
    /// Lower keys sort earlier, so the strongest pieces come first.
    fn strength_key(&self, piece: PieceToken) -> f64 {
        let score = self
            .piece_score
            .get(&piece.to_lower())
            .copied()
            .unwrap_or([0.0; 3]);
        let decisive = (score[0] + score[1]).max(1.0);
        score[1] / decisive - if piece.is_white() { 1.0 } else { 0.0 }
    }

    fn stringify(&self, signature: &MaterialSignature) -> String {
        let mut tokens: Vec<PieceToken> = signature.tokens().to_vec();
        tokens.sort_by(|a, b| {
            self.strength_key(*a)
                .partial_cmp(&self.strength_key(*b))
                .unwrap_or(Ordering::Equal)
        });
        tokens.iter().map(|t| t.to_string()).collect()
    }

    pub fn finish(self) -> EndgamesReport {
        let mut types: Vec<PieceToken> = self.piece_score.keys().copied().collect();
        types.sort_by(|a, b| {
            self.strength_key(*a)
                .partial_cmp(&self.strength_key(*b))
                .unwrap_or(Ordering::Equal)
        });
        let piece_strength: Vec<String> =
            types.iter().map(|t| t.to_upper().to_string()).collect();

        // Sufficient mating material: decisive results dominate. Insufficient:
        // nothing decisive ever, and all non-royal material on one side.
        let zero = [0u64; 3];
        let royal = self.royal.clone().unwrap_or_default();
        let mut sufficient: Vec<&MaterialSignature> = Vec::new();
        let mut insufficient: Vec<&MaterialSignature> = Vec::new();
        for signature in self.endgames.keys() {
            let tally = self.results.get(signature).unwrap_or(&zero);
            let decisive = tally[0] + tally[1];
            let total: u64 = tally.iter().sum();
            if decisive > 0 && tally[0].max(tally[1]) as f64 >= SUFFICIENT_RATE * total as f64 {
                sufficient.push(signature);
            } else if decisive == 0 {
                let loose = signature.minus(&royal);
                let black = loose.tokens().iter().filter(|t| !t.is_white()).count();
                if black == 0 || black == loose.len() {
                    insufficient.push(signature);
                }
            }
        }
        let minimal_sufficient: Vec<String> = sufficient
            .iter()
            .filter(|&signature| {
                !sufficient.iter().any(|&other| {
                    *other != **signature
                        && (signature.contains(other) || signature.contains(&other.swapped()))
                })
            })
            .map(|signature| self.stringify(signature))
            .collect();
        let insufficient: Vec<String> = insufficient
            .iter()
            .map(|signature| self.stringify(signature))
            .collect();

        let denominator = self.records.max(1) as f64;
        let mut tables = Vec::new();
        for order in [
            OrderBy::Material,
            OrderBy::Frequency,
            OrderBy::Entropy,
            OrderBy::Relevance,
        ] {
            if !self.config.order_by.selects(order) {
                continue;
            }
            let row_entropy = |signature: &MaterialSignature| {
                entropy(self.results.get(signature).unwrap_or(&zero))
            };
            let mut rows: Vec<(&MaterialSignature, u64)> =
                self.endgames.iter().map(|(s, c)| (s, *c)).collect();
            match order {
                OrderBy::Material => rows.sort_by(|a, b| {
                    a.0.len().cmp(&b.0.len()).then_with(|| b.0.cmp(a.0))
                }),
                OrderBy::Frequency => rows.sort_by(|a, b| b.1.cmp(&a.1)),
                OrderBy::Entropy => rows.sort_by(|a, b| {
                    row_entropy(b.0)
                        .partial_cmp(&row_entropy(a.0))
                        .unwrap_or(Ordering::Equal)
                }),
                OrderBy::Relevance | OrderBy::All => rows.sort_by(|a, b| {
                    (row_entropy(b.0) * b.1 as f64)
                        .partial_cmp(&(row_entropy(a.0) * a.1 as f64))
                        .unwrap_or(Ordering::Equal)
                }),
            }
            let rows: Vec<EndgameRow> = rows
                .into_iter()
                .filter_map(|(signature, count)| {
                    let tally = self.results.get(signature).copied().unwrap_or(zero);
                    let row_entropy = entropy(&tally);
                    let frequency = count as f64 / denominator;
                    let keep = frequency >= self.config.min_frequency
                        && row_entropy >= self.config.min_entropy
                        && row_entropy * frequency >= self.config.min_relevance;
                    keep.then(|| EndgameRow {
                        pieces: self.stringify(signature),
                        count,
                        frequency,
                        wins: tally[0],
                        losses: tally[1],
                        draws: tally[2],
                        entropy: row_entropy,
                    })
                })
                .collect();
            tables.push(EndgameTable {
                order_by: order.label(),
                rows,
            });
        }

        EndgamesReport {
            records: self.records,
            piece_strength,
            sufficient_material: minimal_sufficient,
            insufficient_material: insufficient,
            tables,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EndgameRow {
    pub pieces: String,
    pub count: u64,
    pub frequency: f64,
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
    pub entropy: f64,
}

#[derive(Debug, Serialize)]
pub struct EndgameTable {
    pub order_by: &'static str,
    pub rows: Vec<EndgameRow>,
}

#[derive(Debug, Serialize)]
pub struct EndgamesReport {
    pub records: u64,
    pub piece_strength: Vec<String>,
    pub sufficient_material: Vec<String>,
    pub insufficient_material: Vec<String>,
    pub tables: Vec<EndgameTable>,
}

impl EndgamesReport {
    pub fn print_text(&self) {
        println!("Pieces sorted by strength");
        println!("{}", self.piece_strength.join(" > "));
        println!();
        println!("Sufficient material: {}", self.sufficient_material.join(", "));
        println!(
            "Insufficient material: {}",
            self.insufficient_material.join(", ")
        );
        for table in &self.tables {
            println!();
            println!("Endgames sorted by {}", table.order_by);
            println!("Pieces\tFreq.\tWin\tLoss\tDraw");
            for row in &table.rows {
                let total = (row.wins + row.losses + row.draws).max(1) as f64;
                println!(
                    "{}\t{:.2}%\t{:.2}%\t{:.2}%\t{:.2}%",
                    row.pieces,
                    row.frequency * 100.0,
                    row.wins as f64 / total * 100.0,
                    row.losses as f64 / total * 100.0,
                    row.draws as f64 / total * 100.0,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EndgamesConfig {
        EndgamesConfig {
            variant: Some("chess".to_string()),
            max_pieces: 4,
            stable_ply: 1,
            keep_color: false,
            ignore_promotion: false,
            min_entropy: -1.0,
            min_frequency: 0.0,
            min_relevance: -1.0,
            order_by: OrderBy::All,
        }
    }

    fn feed(collector: &mut EndgamesCollector, board: &str, result: &str, n: usize) {
        let line = format!("{board} w - - 0 1;hmvc 3;result {result}");
        let record = EpdRecord::parse(&line).unwrap();
        for _ in 0..n {
            collector.add(&record).unwrap();
        }
    }

    #[test]
    fn test_color_normalization_is_symmetric() {
        let mut plain = EndgamesCollector::new(config());
        feed(&mut plain, "KQk", "1-0", 5);
        let mut mirrored = EndgamesCollector::new(config());
        feed(&mut mirrored, "Kkq", "0-1", 5);

        let a = plain.finish();
        let b = mirrored.finish();
        assert_eq!(a.tables[0].rows[0].pieces, b.tables[0].rows[0].pieces);
        assert_eq!(a.tables[0].rows[0].wins, b.tables[0].rows[0].wins);
        assert_eq!(a.tables[0].rows[0].wins, 5);
    }

    #[test]
    fn test_keep_color_disables_normalization() {
        let mut collector = EndgamesCollector::new(EndgamesConfig {
            keep_color: true,
            ..config()
        });
        feed(&mut collector, "Kkq", "0-1", 5);
        let report = collector.finish();
        // Black keeps the queen and the losses stay losses.
        assert_eq!(report.tables[0].rows[0].losses, 5);
    }

    #[test]
    fn test_sufficiency_classification() {
        let mut collector = EndgamesCollector::new(config());
        feed(&mut collector, "KQk", "1-0", 19);
        feed(&mut collector, "KQk", "1/2-1/2", 1);
        feed(&mut collector, "KQQk", "1-0", 10);
        feed(&mut collector, "KNk", "1/2-1/2", 10);
        feed(&mut collector, "Kk", "1/2-1/2", 10);
        feed(&mut collector, "KRkr", "1/2-1/2", 10);

        let report = collector.finish();
        // KQQk contains KQk, so only KQk is minimal sufficient material.
        assert_eq!(report.sufficient_material, vec!["KQk".to_string()]);
        // Drawn-only endgames qualify only when one side has all the loose
        // material: KRkr does not.
        assert_eq!(report.insufficient_material.len(), 2);
        assert!(report.insufficient_material.contains(&"Kk".to_string()));
        assert!(report.insufficient_material.contains(&"KNk".to_string()));
    }

    #[test]
    fn test_piece_strength_ordering() {
        let mut collector = EndgamesCollector::new(config());
        feed(&mut collector, "KQk", "1-0", 10);
        feed(&mut collector, "KRk", "1-0", 6);
        feed(&mut collector, "KRk", "0-1", 4);
        let report = collector.finish();
        let q = report.piece_strength.iter().position(|p| p == "Q").unwrap();
        let r = report.piece_strength.iter().position(|p| p == "R").unwrap();
        assert!(q < r);
    }

    #[test]
    fn test_frequency_and_filters() {
        let mut collector = EndgamesCollector::new(EndgamesConfig {
            min_frequency: 0.5,
            order_by: OrderBy::Frequency,
            ..config()
        });
        feed(&mut collector, "KQk", "1-0", 9);
        feed(&mut collector, "KRk", "1-0", 1);
        let report = collector.finish();
        assert_eq!(report.records, 10);
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].rows.len(), 1);
        assert!((report.tables[0].rows[0].frequency - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_max_pieces_cutoff() {
        let mut collector = EndgamesCollector::new(EndgamesConfig {
            max_pieces: 3,
            ..config()
        });
        feed(&mut collector, "KQRk", "1-0", 5);
        feed(&mut collector, "KQk", "1-0", 5);
        let report = collector.finish();
        assert_eq!(report.tables[0].rows.len(), 1);
    }
}
