//! Text normalization for extracted manifest text.
//!
//! Provides [`normalize`] for turning raw fragment text into the canonical
//! form every downstream matcher works on, and [`unify_glyphs`] for the
//! lighter glyph-only pass the line parser applies to its input.

use unicode_normalization::UnicodeNormalization;

/// Glyph variants that all mean "hyphen" in a manifest row.
const DASH_VARIANTS: &[char] = &[
    '\u{2015}', // ― horizontal bar
    '\u{30FC}', // ー katakana prolonged sound mark
    '\u{2212}', // − minus sign
    '\u{2010}', // ‐ hyphen
    '\u{2011}', // non-breaking hyphen
    '\u{2013}', // – en dash
    '\u{2014}', // — em dash
    '\u{FF0D}', // － fullwidth hyphen-minus
    '\u{FF5E}', // ～ fullwidth tilde
    '\u{301C}', // 〜 wave dash
    '~',
];

/// Glyph variants that all mean "from → to" in a route column.
const ARROW_VARIANTS: &[char] = &[
    '\u{21D2}', // ⇒
    '\u{27A1}', // ➡
    '\u{21E8}', // ⇨
    '\u{2794}', // ➔
    '\u{FFEB}', // ￫ halfwidth rightwards arrow
];

/// Canonical arrow separating pickup and dropoff (and before/after values).
pub const ARROW: char = '→';

/// Normalize fragment text so matching is independent of encoding quirks.
///
/// Applies NFKC (full-width digits, letters and punctuation become
/// half-width; half-width katakana become full-width), unifies dash and
/// arrow variants, folds the traditional `號車` into `号車`, and strips all
/// whitespace. Empty input yields an empty string.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let composed: String = text.nfkc().collect();
    unify_glyphs(&composed).replace("號車", "号車")
}

/// Unify dash and arrow glyph variants and drop whitespace, without NFKC.
pub fn unify_glyphs(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            if DASH_VARIANTS.contains(&c) {
                '-'
            } else if ARROW_VARIANTS.contains(&c) {
                ARROW
            } else {
                c
            }
        })
        .collect()
}
