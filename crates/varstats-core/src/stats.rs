//! Small numeric summaries shared by the report tools.

use serde::Serialize;

/// Information-theoretic entropy (bits) of a tally. An empty or all-zero
/// tally has no uncertainty left and scores 0.
pub fn entropy(counts: &[u64]) -> f64 {
    let norm: u64 = counts.iter().sum();
    if norm == 0 {
        return 0.0;
    }
    let norm = norm as f64;
    -counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / norm;
            p.log2() * p
        })
        .sum::<f64>()
}

/// Median / mean / max of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub median: f64,
    pub mean: f64,
    pub max: f64,
}

impl Summary {
    /// `None` on an empty sample.
    pub fn from_samples(values: &[f64]) -> Option<Summary> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let max = sorted[n - 1];
        Some(Summary { median, mean, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy_bounds() {
        assert_eq!(entropy(&[0, 0, 0]), 0.0);
        assert_eq!(entropy(&[10, 0, 0]), 0.0);
        assert!((entropy(&[1, 1]) - 1.0).abs() < 1e-12);
        assert!((entropy(&[1, 1, 1, 1]) - 2.0).abs() < 1e-12);
        // Skewed tallies sit strictly between the extremes.
        let skewed = entropy(&[90, 5, 5]);
        assert!(skewed > 0.0 && skewed < entropy(&[1, 1, 1]));
    }

    #[test]
    fn test_summary_even_and_odd() {
        let odd = Summary::from_samples(&[3.0, 1.0, 2.0]).unwrap();
        assert_eq!(odd.median, 2.0);
        assert_eq!(odd.mean, 2.0);
        assert_eq!(odd.max, 3.0);

        let even = Summary::from_samples(&[4.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(even.median, 2.5);
        assert_eq!(even.max, 4.0);

        assert!(Summary::from_samples(&[]).is_none());
    }
}
