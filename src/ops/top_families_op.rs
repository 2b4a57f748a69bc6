use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::*;
use crate::ops::Op;
use crate::patterns::*;
use crate::table::Table;

/// Which side of the change distribution to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Expand,
    Contract,
    #[default]
    Both,
}

impl Mode {
    pub fn expands(self) -> bool {
        matches!(self, Mode::Expand | Mode::Both)
    }

    pub fn contracts(self) -> bool {
        matches!(self, Mode::Contract | Mode::Both)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "expand" => Ok(Mode::Expand),
            "contract" => Ok(Mode::Contract),
            "both" => Ok(Mode::Both),
            _ => Err(format!("unknown mode \"{s}\" (expected expand, contract or both)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Expanded,
    Contracted,
    Stable,
}

impl Direction {
    pub fn of(change: Option<f64>) -> Self {
        match change {
            Some(v) if v > 0.0 => Direction::Expanded,
            Some(v) if v < 0.0 => Direction::Contracted,
            _ => Direction::Stable,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Expanded => "Expanded",
            Direction::Contracted => "Contracted",
            Direction::Stable => "Stable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub family_id: String,
    pub change: Option<f64>,
    pub direction: Direction,
}

pub struct TopFamiliesOp<'t> {
    table: &'t Table,
    taxon: String,
    topn: usize,
    mode: Mode,
    column_match: ColumnMatch,
}

impl<'t> TopFamiliesOp<'t> {
    const NAME: &'static str = "TopFamiliesOp";

    /// Select the `topn` most expanded and/or contracted families of a taxon from a
    /// change matrix.
    ///
    /// Expansions come first, largest change first; contractions follow, most negative
    /// first. Families with a zero or missing change are never selected. Ties keep
    /// their order in the table.
    pub fn new(table: &'t Table, taxon: impl Into<String>, topn: usize, mode: Mode) -> Self {
        Self {
            table,
            taxon: taxon.into(),
            topn,
            mode,
            column_match: ColumnMatch::default(),
        }
    }

    pub fn with_column_match(mut self, column_match: ColumnMatch) -> Self {
        self.column_match = column_match;
        self
    }
}

impl<'t> Op for TopFamiliesOp<'t> {
    type Output = Vec<ChangeRecord>;

    fn run(&self) -> Result<Self::Output> {
        let taxon_col = ColumnResolver::taxon(&self.taxon, self.column_match).resolve(self.table)?;
        let id_col = ColumnResolver::family_id().resolve(self.table)?;

        let values = self
            .table
            .numeric_column(taxon_col)
            .enumerate()
            .filter_map(|(row, v)| v.map(|v| (row, v)))
            .collect::<Vec<_>>();

        // sort_by is stable, so equal changes keep table order
        let mut desc = values.clone();
        desc.sort_by(|a, b| b.1.total_cmp(&a.1));
        let mut asc = values;
        asc.sort_by(|a, b| a.1.total_cmp(&b.1));

        let expanded = desc.into_iter().filter(|&(_, v)| v > 0.0).take(self.topn);
        let contracted = asc.into_iter().filter(|&(_, v)| v < 0.0).take(self.topn);

        let selected: Vec<(usize, f64)> = match self.mode {
            Mode::Expand => expanded.collect(),
            Mode::Contract => contracted.collect(),
            Mode::Both => expanded.chain(contracted).collect(),
        };

        Ok(selected
            .into_iter()
            .map(|(row, v)| ChangeRecord {
                family_id: self.table.rows()[row][id_col].clone(),
                change: Some(v),
                direction: Direction::of(Some(v)),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}
