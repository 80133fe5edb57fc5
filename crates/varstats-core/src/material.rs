//! Material signatures extracted from FEN board fields.
//!
//! A signature is the sorted multiset of piece letters on the board (and in
//! crazyhouse pockets), with promoted pieces kept distinct. Signatures are
//! the key for endgame classification and the feature source for the
//! piece-value fit.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// One piece occurrence: FEN letter (case = color) plus promotion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceToken {
    pub letter: char,
    pub promoted: bool,
}

impl PieceToken {
    pub fn new(letter: char, promoted: bool) -> Self {
        PieceToken { letter, promoted }
    }

    #[inline]
    pub fn is_white(self) -> bool {
        self.letter.is_ascii_uppercase()
    }

    /// The same piece for the other side.
    pub fn swapped(self) -> Self {
        PieceToken {
            letter: if self.is_white() {
                self.letter.to_ascii_lowercase()
            } else {
                self.letter.to_ascii_uppercase()
            },
            promoted: self.promoted,
        }
    }

    /// Canonical per-type key: the lowercase token (`+n`, `q`).
    pub fn to_lower(self) -> Self {
        PieceToken {
            letter: self.letter.to_ascii_lowercase(),
            promoted: self.promoted,
        }
    }

    pub fn to_upper(self) -> Self {
        PieceToken {
            letter: self.letter.to_ascii_uppercase(),
            promoted: self.promoted,
        }
    }
}

// Tokens order like their rendered text: the `+` marker sorts before any
// letter, uppercase before lowercase.
impl Ord for PieceToken {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.promoted, other.promoted) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.letter.cmp(&other.letter),
        }
    }
}

impl PartialOrd for PieceToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PieceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.promoted {
            f.write_str("+")?;
        }
        write!(f, "{}", self.letter)
    }
}

/// Extract piece tokens from a FEN board field.
///
/// Fairy-style `+X` prefixes and Lichess-style `X~` suffixes both mark
/// promoted pieces. Digits, rank separators and pocket brackets carry no
/// material of their own; letters inside crazyhouse pockets count.
pub fn board_pieces(board: &str, ignore_promotion: bool) -> Vec<PieceToken> {
    let mut tokens: Vec<PieceToken> = Vec::new();
    let mut promoted = false;
    for c in board.chars() {
        if c == '+' {
            promoted = true;
        } else if c == '~' {
            if let Some(last) = tokens.last_mut() {
                last.promoted = !ignore_promotion;
            }
        } else if c.is_ascii_alphabetic() {
            tokens.push(PieceToken::new(c, promoted && !ignore_promotion));
            promoted = false;
        } else {
            promoted = false;
        }
    }
    tokens
}

/// Sorted multiset of piece tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MaterialSignature(Vec<PieceToken>);

impl MaterialSignature {
    pub fn from_board_field(board: &str, ignore_promotion: bool) -> Self {
        Self::from_tokens(board_pieces(board, ignore_promotion))
    }

    pub fn from_tokens(mut tokens: Vec<PieceToken>) -> Self {
        tokens.sort();
        MaterialSignature(tokens)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> &[PieceToken] {
        &self.0
    }

    pub fn counts(&self) -> BTreeMap<PieceToken, u32> {
        let mut counts = BTreeMap::new();
        for t in &self.0 {
            *counts.entry(*t).or_insert(0) += 1;
        }
        counts
    }

    /// Color-normalization test: swap when black holds more pieces, or the
    /// same number and the black half sorts after the case-folded white half.
    pub fn should_swap(&self) -> bool {
        let black = self.0.iter().filter(|t| !t.is_white()).count();
        let white = self.0.len() - black;
        match black.cmp(&white) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => {
                let black_str: String = self
                    .0
                    .iter()
                    .filter(|t| !t.is_white())
                    .map(|t| t.to_string())
                    .collect();
                let white_str: String = self
                    .0
                    .iter()
                    .filter(|t| t.is_white())
                    .map(|t| t.to_lower().to_string())
                    .collect();
                black_str > white_str
            }
        }
    }

    /// The mirrored signature with every piece changing sides.
    pub fn swapped(&self) -> Self {
        Self::from_tokens(self.0.iter().map(|t| t.swapped()).collect())
    }

    /// Per-type white-minus-black counts, keyed by lowercase token. Types
    /// present on both sides in equal number still get an entry (of 0).
    pub fn piece_diffs(&self) -> BTreeMap<PieceToken, i32> {
        let mut diffs = BTreeMap::new();
        for t in &self.0 {
            *diffs.entry(t.to_lower()).or_insert(0) += if t.is_white() { 1 } else { -1 };
        }
        diffs
    }

    /// `other ⊆ self` as multisets.
    pub fn contains(&self, other: &Self) -> bool {
        let counts = self.counts();
        other
            .counts()
            .iter()
            .all(|(t, &n)| counts.get(t).copied().unwrap_or(0) >= n)
    }

    /// Multiset intersection, used to infer royal pieces across a corpus.
    pub fn intersect(&self, other: &Self) -> Self {
        let other_counts = other.counts();
        let mut out = Vec::new();
        for (t, n) in self.counts() {
            let m = other_counts.get(&t).copied().unwrap_or(0).min(n);
            for _ in 0..m {
                out.push(t);
            }
        }
        Self::from_tokens(out)
    }

    /// Multiset difference, dropping non-positive counts.
    pub fn minus(&self, other: &Self) -> Self {
        let other_counts = other.counts();
        let mut out = Vec::new();
        for (t, n) in self.counts() {
            let m = n.saturating_sub(other_counts.get(&t).copied().unwrap_or(0));
            for _ in 0..m {
                out.push(t);
            }
        }
        Self::from_tokens(out)
    }
}

impl fmt::Display for MaterialSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in &self.0 {
            write!(f, "{t}")?;
        }
        Ok(())
    }
}

/// Whether the signature's per-type differences cover a requested imbalance,
/// e.g. `Qr` for "white is up a queen against a rook". Balanced surplus
/// beyond the request is allowed; a shortfall or wrong sign is not.
pub fn has_imbalance(signature: &MaterialSignature, imbalance: &MaterialSignature) -> bool {
    let diffs = signature.piece_diffs();
    let mut required: BTreeMap<PieceToken, i32> = BTreeMap::new();
    for t in imbalance.tokens() {
        *required.entry(t.to_lower()).or_insert(0) += if t.is_white() { 1 } else { -1 };
    }
    required.iter().all(|(t, &need)| {
        let have = diffs.get(t).copied().unwrap_or(0);
        match need.cmp(&0) {
            Ordering::Greater => have >= need,
            Ordering::Less => have <= need,
            Ordering::Equal => true,
        }
    })
}

/// Game-phase index in `0..phases`; later phases mean less material left.
pub fn game_phase(phases: u32, start_pieces: u32, pieces: u32) -> u32 {
    if phases == 0 || start_pieces == 0 {
        return 0;
    }
    let removed = start_pieces.saturating_sub(pieces);
    ((removed * phases) / start_pieces).min(phases - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(s: &str) -> MaterialSignature {
        MaterialSignature::from_board_field(s, false)
    }

    #[test]
    fn test_board_pieces_skips_layout() {
        let tokens = board_pieces("r1bk3r/p2pBpNp/n4n2/1p1NP2P/6P1/3P4/P1P1K3/q5b1", false);
        assert_eq!(tokens.len(), 23);
        assert!(tokens.iter().all(|t| !t.promoted));
    }

    #[test]
    fn test_promotion_markers() {
        // Fairy prefix style and Lichess suffix style mark the same thing.
        let prefix = board_pieces("+N3k3/8/8/8/8/8/8/4K3", false);
        let suffix = board_pieces("N~3k3/8/8/8/8/8/8/4K3", false);
        assert_eq!(prefix, suffix);
        assert!(prefix[0].promoted);
        assert_eq!(prefix[0].to_string(), "+N");

        let folded = board_pieces("+N3k3/8/8/8/8/8/8/4K3", true);
        assert!(!folded[0].promoted);
    }

    #[test]
    fn test_pocket_letters_count() {
        // Crazyhouse FEN keeps captured pieces in brackets.
        let tokens = board_pieces("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR[QPq]", false);
        assert_eq!(tokens.len(), 35);
    }

    #[test]
    fn test_signature_sorted_like_text() {
        let s = sig("kQ+nB");
        let rendered: Vec<String> = s.tokens().iter().map(|t| t.to_string()).collect();
        assert_eq!(rendered, vec!["+n", "B", "Q", "k"]);
    }

    #[test]
    fn test_should_swap_on_count() {
        assert!(sig("Kkq").should_swap());
        assert!(!sig("KQk").should_swap());
    }

    #[test]
    fn test_should_swap_tie_break() {
        // Equal counts: the lexicographically later black half forces a swap.
        assert!(sig("KQkr").should_swap());
        assert!(!sig("KRkq").should_swap());
        assert_eq!(sig("KQkr").swapped(), sig("KRkq"));
    }

    #[test]
    fn test_piece_diffs_keep_balanced_types() {
        let diffs = sig("KQRkrr").piece_diffs();
        assert_eq!(diffs.get(&PieceToken::new('q', false)), Some(&1));
        assert_eq!(diffs.get(&PieceToken::new('r', false)), Some(&-1));
        assert_eq!(diffs.get(&PieceToken::new('k', false)), Some(&0));
    }

    #[test]
    fn test_has_imbalance_single_piece() {
        assert!(has_imbalance(&sig("KQkr"), &sig("Qr")));
        assert!(has_imbalance(&sig("KQRkrr"), &sig("Qr")));
        assert!(has_imbalance(&sig("KQQkrr"), &sig("Qr")));
        assert!(!has_imbalance(&sig("KQk"), &sig("Qr")));
        assert!(!has_imbalance(&sig("KQkr"), &sig("Rq")));
        assert!(!has_imbalance(&sig("KQRkr"), &sig("Qr")));
    }

    #[test]
    fn test_has_imbalance_multi_piece() {
        assert!(has_imbalance(&sig("KQkrr"), &sig("Qrr")));
        assert!(!has_imbalance(&sig("KQRkrr"), &sig("Qrr")));
    }

    #[test]
    fn test_game_phase() {
        assert_eq!(game_phase(2, 32, 17), 0);
        assert_eq!(game_phase(2, 32, 16), 1);
        // Clamped at the last phase even with everything captured.
        assert_eq!(game_phase(2, 32, 2), 1);
    }

    #[test]
    fn test_multiset_ops() {
        assert!(sig("KQRk").contains(&sig("KQ")));
        assert!(!sig("KQRk").contains(&sig("QQ")));
        assert_eq!(sig("KQRk").intersect(&sig("KRRkq")), sig("KRk"));
        assert_eq!(sig("KQRk").minus(&sig("Kk")), sig("QR"));
    }
}
