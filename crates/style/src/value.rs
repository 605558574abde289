//! Property value helpers: inherited defaults, named colors, and the
//! small numeric parsers the cascade needs (percent font-size, px
//! lengths). Values are kept as plain strings end-to-end, matching
//! `original_source/css.py`'s representation — typed CSS values are a
//! standards-grade concern this engine does not take on (spec.md §1).

use std::collections::HashMap;

/// Properties every node inherits from its parent unless a rule
/// overrides them (`original_source/constants.py`'s `INHERITED_PROPERTIES`).
#[must_use]
pub fn inherited_defaults() -> HashMap<String, String> {
    [
        ("font-size", "16px"),
        ("font-style", "normal"),
        ("font-weight", "normal"),
        ("color", "black"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect()
}

/// Named colors the engine resolves without a full CSS color grammar.
#[must_use]
pub fn named_color(name: &str) -> Option<&'static str> {
    Some(match name {
        "black" => "#000000",
        "gray" => "#808080",
        "white" => "#ffffff",
        "red" => "#ff0000",
        "green" => "#00ff00",
        "blue" => "#0000ff",
        "lightblue" => "#add8e6",
        "lightgreen" => "#90ee90",
        "orange" => "#ffa500",
        "orangered" => "#ff4500",
        _ => return None,
    })
}

/// Parses a `"NNpx"` length, returning `None` if the unit doesn't match.
#[must_use]
pub fn parse_px(value: &str) -> Option<f32> {
    value.strip_suffix("px")?.parse::<f32>().ok()
}

/// Resolves a `font-size` value that may be a percentage against the
/// parent's already-resolved px value, per spec.md §4.2. Non-percent
/// values pass through unchanged.
#[must_use]
pub fn resolve_font_size(value: &str, parent_px: f32) -> String {
    let Some(pct_str) = value.strip_suffix('%') else {
        return value.to_owned();
    };
    let Ok(pct) = pct_str.parse::<f32>() else {
        return value.to_owned();
    };
    format!("{}px", (pct / 100.0) * parent_px)
}
