//! Instrument family inference from the instrument name.

use crate::text::normalize;

pub const FAMILY_OTHER: &str = "OTROS";

const FAMILY_RULES: &[(&str, &[&str])] = &[
    ("VIOLINES Y VIOLAS", &["violin", "viola"]),
    ("CELLOS Y CONTRABAJOS", &["cello", "contrabajo", "violoncell"]),
    ("VIENTOS BRONCE", &["corno", "trompeta", "trombon", "tuba", "eufonio"]),
    ("VIENTOS MADERA", &["clarinete", "flauta", "oboe", "fagot", "piccolo"]),
    (
        "PERCUSIÓN",
        &["percusion", "timpani", "bateria", "bombo", "tambor", "xilofono"],
    ),
];

/// Best-effort family for an instrument name; first matching rule wins.
pub fn infer_family(instrument: &str) -> &'static str {
    let s = normalize(instrument);
    FAMILY_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| s.contains(k)))
        .map(|(family, _)| *family)
        .unwrap_or(FAMILY_OTHER)
}
