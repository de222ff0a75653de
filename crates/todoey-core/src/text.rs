//! # Text Folding
//!
//! Case- and diacritic-insensitive comparison for the search box.
//!
//! ## How Search Matching Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Folded Substring Match                               │
//! │                                                                         │
//! │  Stored title: "Crème Brûlée"   ──fold──►  "creme brulee"              │
//! │  Search text:  "BRULE"          ──fold──►  "brule"                     │
//! │                                                                         │
//! │  "creme brulee".contains("brule")  →  MATCH                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store keeps a folded copy of every title and name next to the
//! original, so the filter runs inside SQLite with `instr()`.
//!
//! Text is decomposed to NFKD and combining marks are dropped, so any
//! precomposed letter folds to its base letter ("Phở" to "pho"). Letters
//! with no decomposition, such as "ł" and "ø", are mapped by hand.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Folds text for comparison: lower-case, accents removed.
///
/// ## Example
/// ```rust
/// use todoey_core::text::fold;
///
/// assert_eq!(fold("Café"), "cafe");
/// assert_eq!(fold("EGGO run"), "eggo run");
/// ```
pub fn fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.nfkd() {
        for lower in ch.to_lowercase() {
            if is_combining_mark(lower) {
                continue;
            }
            push_base(&mut out, lower);
        }
    }
    out
}

/// Returns true if `haystack` contains `needle` under folded comparison.
///
/// An empty needle matches everything.
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    fold(haystack).contains(&fold(needle))
}

/// Pushes the unaccented base form of a lower-case character.
fn push_base(out: &mut String, ch: char) {
    let base = match ch {
        '\u{0111}' | '\u{00F0}' => 'd',
        '\u{0127}' => 'h',
        '\u{0131}' => 'i',
        '\u{0142}' => 'l',
        '\u{00F8}' => 'o',
        '\u{0167}' => 't',
        // Ligatures expand to two letters
        '\u{00E6}' => {
            out.push_str("ae");
            return;
        }
        '\u{0153}' => {
            out.push_str("oe");
            return;
        }
        '\u{00DF}' => {
            out.push_str("ss");
            return;
        }
        '\u{00FE}' => {
            out.push_str("th");
            return;
        }
        other => other,
    };
    out.push(base);
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_lowercases() {
        assert_eq!(fold("Buy Eggos"), "buy eggos");
        assert_eq!(fold("EGGO run"), "eggo run");
    }

    #[test]
    fn test_fold_strips_precomposed_accents() {
        assert_eq!(fold("Café"), "cafe");
        assert_eq!(fold("Crème Brûlée"), "creme brulee");
        assert_eq!(fold("Łódź"), "lodz");
        assert_eq!(fold("Øresund"), "oresund");
    }

    #[test]
    fn test_fold_beyond_latin_1() {
        assert_eq!(fold("Phở"), "pho");
        assert_eq!(fold("Nguyễn"), "nguyen");
        assert_eq!(fold("Ǆemal"), "dzemal");
        assert!(contains_folded("Bún chả Hà Nội", "NOI"));
    }

    #[test]
    fn test_fold_strips_combining_marks() {
        // "e" followed by COMBINING ACUTE ACCENT
        assert_eq!(fold("Cafe\u{0301}"), "cafe");
    }

    #[test]
    fn test_fold_expands_ligatures() {
        assert_eq!(fold("Straße"), "strasse");
        assert_eq!(fold("Æsop"), "aesop");
    }

    #[test]
    fn test_contains_folded() {
        assert!(contains_folded("Buy Eggos", "eggo"));
        assert!(contains_folded("EGGO run", "eggo"));
        assert!(!contains_folded("find mike", "eggo"));
        assert!(contains_folded("Crème brûlée", "BRULEE"));
    }

    #[test]
    fn test_empty_needle_matches() {
        assert!(contains_folded("anything", ""));
        assert!(contains_folded("", ""));
    }

    #[test]
    fn test_non_latin_passes_through() {
        assert_eq!(fold("ПРИВЕТ"), "привет");
        assert_eq!(fold("日本"), "日本");
    }
}
