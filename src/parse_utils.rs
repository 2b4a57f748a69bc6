use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "g1, g2;g3 g4" -> g1 | g2 | g3 | g4
    static ref GENE_SEP: Regex = Regex::new(r"[,;]\s*|\s+").unwrap();
}

pub fn trim_ascii_whitespace(s: &str) -> Option<&str> {
    let t = s.trim_matches(|c: char| c.is_ascii_whitespace());
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

/// Textual missing-value markers produced by upstream table writers.
pub fn is_missing(s: &str) -> bool {
    match trim_ascii_whitespace(s) {
        None => true,
        Some(t) => t.eq_ignore_ascii_case("nan"),
    }
}

/// Coerce a cell to a number. Anything unparseable (including `nan`) is missing.
pub fn parse_number(s: &str) -> Option<f64> {
    let t = trim_ascii_whitespace(s)?;
    t.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Split a delimited gene list cell, dropping empty tokens and `nan`.
pub fn split_genes(cell: &str) -> Vec<&str> {
    let Some(cell) = trim_ascii_whitespace(cell) else {
        return Vec::new();
    };

    GENE_SEP
        .split(cell)
        .filter(|g| !g.is_empty() && !g.eq_ignore_ascii_case("nan"))
        .collect()
}

/// Render a number the way the change tables do: integers without a fraction.
pub fn fmt_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
