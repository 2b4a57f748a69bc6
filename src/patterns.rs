use log::warn;

use crate::errors::*;
use crate::parse_utils::contains_ignore_case;
use crate::table::Table;

/// How to react when several columns match a taxon name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnMatch {
    /// First matching column wins, the other candidates are logged.
    #[default]
    Lenient,
    /// More than one candidate is an error.
    Strict,
}

/// One way of locating a column in a table header.
#[derive(Debug, Clone)]
pub enum ColumnPattern {
    /// A header equal to this name.
    Exact(String),
    /// A header containing the taxon name, ignoring case; spaces are retried as underscores.
    Taxon(String),
    /// The first column, whatever its name.
    First,
}

impl ColumnPattern {
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    pub fn taxon(name: impl Into<String>) -> Self {
        Self::Taxon(name.into())
    }

    /// Every header index this pattern matches, in header order.
    pub fn candidates(&self, headers: &[String]) -> Vec<usize> {
        use ColumnPattern::*;
        match self {
            Exact(name) => headers
                .iter()
                .position(|h| h == name)
                .into_iter()
                .collect(),
            Taxon(taxon) => {
                let found = substring_matches(headers, taxon);
                if found.is_empty() && taxon.contains(' ') {
                    substring_matches(headers, &taxon.replace(' ', "_"))
                } else {
                    found
                }
            }
            First => {
                if headers.is_empty() {
                    Vec::new()
                } else {
                    vec![0]
                }
            }
        }
    }

    fn describe(&self) -> String {
        use ColumnPattern::*;
        match self {
            Exact(name) => name.clone(),
            Taxon(taxon) => format!("*{taxon}*"),
            First => "<first column>".to_owned(),
        }
    }
}

fn substring_matches(headers: &[String], needle: &str) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| contains_ignore_case(h, needle))
        .map(|(i, _)| i)
        .collect()
}

/// An ordered list of column patterns; the first pattern that resolves wins.
#[derive(Debug, Clone)]
pub struct ColumnResolver {
    patterns: Vec<ColumnPattern>,
    mode: ColumnMatch,
}

impl ColumnResolver {
    pub fn new(patterns: impl IntoIterator<Item = ColumnPattern>, mode: ColumnMatch) -> Self {
        Self {
            patterns: patterns.into_iter().collect(),
            mode,
        }
    }

    /// The column holding the given taxon.
    pub fn taxon(taxon: &str, mode: ColumnMatch) -> Self {
        Self::new([ColumnPattern::taxon(taxon)], mode)
    }

    /// `FamilyID`, else `Orthogroup`, else the first column.
    pub fn family_id() -> Self {
        Self::new(
            [
                ColumnPattern::exact("FamilyID"),
                ColumnPattern::exact("Orthogroup"),
                ColumnPattern::First,
            ],
            ColumnMatch::Lenient,
        )
    }

    /// `Orthogroup`, else `FamilyID`, else the first column.
    pub fn orthogroup_id() -> Self {
        Self::new(
            [
                ColumnPattern::exact("Orthogroup"),
                ColumnPattern::exact("FamilyID"),
                ColumnPattern::First,
            ],
            ColumnMatch::Lenient,
        )
    }

    /// Resolve against a table, returning the column index.
    pub fn resolve(&self, table: &Table) -> Result<usize> {
        let headers = table.headers();

        for pattern in &self.patterns {
            let found = pattern.candidates(headers);
            match found.as_slice() {
                [] => continue,
                [idx] => return Ok(*idx),
                [idx, ..] => {
                    let candidates = found.iter().map(|&i| headers[i].clone()).collect::<Vec<_>>();
                    if self.mode == ColumnMatch::Strict {
                        return Err(Error::AmbiguousColumn {
                            table: table.name().to_owned(),
                            wanted: pattern.describe(),
                            candidates,
                        });
                    }
                    warn!(
                        "Several columns match {} in {}: {}; using \"{}\"",
                        pattern.describe(),
                        table.name(),
                        candidates.join(", "),
                        headers[*idx]
                    );
                    return Ok(*idx);
                }
            }
        }

        Err(Error::ColumnResolution {
            table: table.name().to_owned(),
            wanted: self
                .patterns
                .iter()
                .map(|p| p.describe())
                .collect::<Vec<_>>()
                .join(" | "),
            available: headers.iter().take(20).cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str]) -> Table {
        Table::new("test", headers.iter().map(|h| h.to_string()).collect(), vec![])
    }

    #[test]
    fn taxon_is_case_insensitive_substring() {
        let t = table(&["FamilyID", "Other<1>", "siler_cupreus<2>"]);
        let idx = ColumnResolver::taxon("Siler_cupreus", ColumnMatch::Lenient).resolve(&t).unwrap();
        assert_eq!(idx, 2);
    }

    #[test]
    fn taxon_retries_with_underscores() {
        let t = table(&["Orthogroup", "Siler_cupreus.faa"]);
        let idx = ColumnResolver::taxon("Siler cupreus", ColumnMatch::Lenient).resolve(&t).unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn missing_taxon_lists_headers() {
        let t = table(&["FamilyID", "A"]);
        let err = ColumnResolver::taxon("B", ColumnMatch::Lenient).resolve(&t).unwrap_err();
        match err {
            Error::ColumnResolution { available, .. } => assert_eq!(available, vec!["FamilyID", "A"]),
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn ambiguity_first_wins_unless_strict() {
        let t = table(&["FamilyID", "Siler_a", "Siler_b"]);
        assert_eq!(ColumnResolver::taxon("siler", ColumnMatch::Lenient).resolve(&t).unwrap(), 1);

        let err = ColumnResolver::taxon("siler", ColumnMatch::Strict).resolve(&t).unwrap_err();
        match err {
            Error::AmbiguousColumn { candidates, .. } => assert_eq!(candidates, vec!["Siler_a", "Siler_b"]),
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn id_fallback_chain() {
        assert_eq!(ColumnResolver::family_id().resolve(&table(&["X", "Orthogroup", "FamilyID"])).unwrap(), 2);
        assert_eq!(ColumnResolver::family_id().resolve(&table(&["X", "Orthogroup"])).unwrap(), 1);
        assert_eq!(ColumnResolver::family_id().resolve(&table(&["X", "Y"])).unwrap(), 0);
        assert_eq!(ColumnResolver::orthogroup_id().resolve(&table(&["FamilyID", "Orthogroup"])).unwrap(), 1);
    }
}
