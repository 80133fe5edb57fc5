//! Streaming access to EPD corpora for the report tools.

use std::io::BufRead;

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use shakmaty::variant::Variant;
use varstats_core::rules;
use varstats_core::EpdRecord;

use crate::common::io::{open_reader, total_lines};

/// CLI input list: no files means stdin.
pub fn effective_inputs(files: &[String]) -> Vec<String> {
    if files.is_empty() {
        vec!["-".to_string()]
    } else {
        files.to_vec()
    }
}

/// Progress bar sized by the combined line count (length-less on stdin).
pub fn corpus_progress(files: &[String]) -> ProgressBar {
    let progress = match total_lines(files) {
        Some(total) => ProgressBar::new(total),
        None => ProgressBar::no_length(),
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("valid template"),
    );
    progress
}

/// Stream records from the inputs, skipping blank lines and warning on
/// garbled ones. Returns the number of records passed to `f`.
pub fn for_each_record<F>(files: &[String], progress: &ProgressBar, mut f: F) -> Result<u64>
where
    F: FnMut(EpdRecord) -> Result<()>,
{
    let mut parsed = 0u64;
    for path in files {
        let reader = open_reader(path).with_context(|| format!("failed to open {path}"))?;
        for line in reader.lines() {
            let line = line.with_context(|| format!("read error in {path}"))?;
            progress.inc(1);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match EpdRecord::parse(trimmed) {
                Ok(record) => {
                    parsed += 1;
                    f(record)?;
                }
                Err(e) => log::warn!("{path}: skipping record: {e}"),
            }
        }
    }
    Ok(parsed)
}

/// Per-record variant: the annotation wins, then the CLI default.
pub fn record_variant(record: &EpdRecord, default: Option<&str>) -> Result<Variant> {
    let name = record
        .variant()
        .or(default)
        .ok_or_else(|| anyhow!("variant neither annotated in the input nor given with --variant"))?;
    Ok(rules::variant_from_name(name)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_effective_inputs_default_to_stdin() {
        assert_eq!(effective_inputs(&[]), vec!["-".to_string()]);
        let files = vec!["a.epd".to_string(), "b.epd".to_string()];
        assert_eq!(effective_inputs(&files), files);
    }

    #[test]
    fn test_record_variant_precedence() {
        let annotated =
            EpdRecord::parse("4k3/8/8/8/8/8/8/4K3 w - - 0 1;variant atomic").unwrap();
        let bare = EpdRecord::parse("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(
            record_variant(&annotated, Some("chess")).unwrap(),
            Variant::Atomic
        );
        assert_eq!(record_variant(&bare, Some("chess")).unwrap(), Variant::Chess);
        assert!(record_variant(&bare, None).is_err());
        assert!(record_variant(&bare, Some("shogi")).is_err());
    }

    #[test]
    fn test_for_each_record_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.epd");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "4k3/8/8/8/8/8/8/4K3 w - - 0 1;variant chess").unwrap();
        writeln!(f).unwrap();
        writeln!(f, ";broken line").unwrap();
        writeln!(f, "4k3/8/8/8/8/8/8/4K3 b - - 0 2").unwrap();
        drop(f);

        let progress = ProgressBar::hidden();
        let mut seen = Vec::new();
        let parsed = for_each_record(&[path.display().to_string()], &progress, |record| {
            seen.push(record.fen().to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(parsed, 2);
        assert_eq!(seen.len(), 2);
    }
}
