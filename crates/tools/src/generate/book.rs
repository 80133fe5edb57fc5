use std::io::BufRead;
use std::path::Path;

use anyhow::{bail, Context, Result};
use shakmaty::variant::Variant;
use varstats_core::rules;

use crate::common::io::open_reader;

/// Load start positions from an opening book, or fall back to the variant's
/// start position. Book lines may be bare FENs or EPD records (annotations
/// after the first `;` are ignored); `#` comments and blank lines are
/// skipped. Every position must be legal for the variant.
pub fn load_start_fens(book: Option<&Path>, variant: Variant) -> Result<Vec<String>> {
    let Some(path) = book else {
        return Ok(vec![rules::start_fen(variant)]);
    };
    let reader = open_reader(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut fens = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fen = trimmed.split(';').next().unwrap_or(trimmed).trim();
        rules::position_from_fen(variant, fen)
            .with_context(|| format!("bad start position on line {}: {}", idx + 1, fen))?;
        fens.push(fen.to_string());
    }
    if fens.is_empty() {
        bail!("no usable positions found in {}", path.display());
    }
    Ok(fens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_default_is_start_position() {
        let fens = load_start_fens(None, Variant::Chess).unwrap();
        assert_eq!(fens, vec![rules::start_fen(Variant::Chess)]);
    }

    #[test]
    fn test_book_lines_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epd");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "# opening book").unwrap();
        writeln!(f).unwrap();
        writeln!(
            f,
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1;bm e7e5"
        )
        .unwrap();
        writeln!(
            f,
            "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1"
        )
        .unwrap();
        drop(f);

        let fens = load_start_fens(Some(&path), Variant::Chess).unwrap();
        assert_eq!(fens.len(), 2);
        assert!(fens[0].starts_with("rnbqkbnr/pppppppp/8/8/4P3"));
    }

    #[test]
    fn test_bad_position_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epd");
        std::fs::write(&path, "definitely not a fen\n").unwrap();
        assert!(load_start_fens(Some(&path), Variant::Chess).is_err());
    }

    #[test]
    fn test_empty_book_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epd");
        std::fs::write(&path, "# nothing here\n").unwrap();
        assert!(load_start_fens(Some(&path), Variant::Chess).is_err());
    }
}
