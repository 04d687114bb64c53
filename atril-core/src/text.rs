//! Text normalization shared by search, dedup and classification.
//!
//! Every comparison of free text in Atril (headers, student names, condition
//! descriptions, search terms) goes through [`normalize`], so two strings that
//! differ only in case, accents or punctuation are treated as equal.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9 ]").expect("static pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static pattern"));

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

/// Lower-case, strip accents, drop punctuation, collapse whitespace.
///
/// `normalize("Ñandú  Violín") == "nandu violin"`. The result is trimmed, so
/// `normalize(normalize(x)) == normalize(x)` for every input.
pub fn normalize(value: impl AsRef<str>) -> String {
    let lower = value.as_ref().to_lowercase();
    let stripped: String = lower.trim().nfd().filter(|c| !is_combining_mark(*c)).collect();
    let spaced = NON_ALNUM.replace_all(&stripped, " ");
    WHITESPACE.replace_all(&spaced, " ").trim().to_string()
}

/// [`normalize`] for optional cells; missing values become the empty string.
pub fn normalize_opt(value: Option<&str>) -> String {
    value.map(normalize).unwrap_or_default()
}

/// Case and accent folding without touching punctuation (collation key).
fn fold(s: &str) -> String {
    s.to_lowercase().nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Locale-style ordering: accents and case only break ties.
///
/// "Viola 4/4" sorts before "Violín 1/2", and "árbol" sorts next to "arbol"
/// instead of after "zeta".
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    fold(a).cmp(&fold(b)).then_with(|| a.cmp(b))
}

/// Upper-case the first character of every space-separated word.
pub fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when the cell is missing or only whitespace.
pub fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
