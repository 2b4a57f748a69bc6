use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use rustc_hash::FxHashSet;

use crate::errors::*;
use crate::ops::Op;
use crate::patterns::*;
use crate::table::{open_reader, Table};

/// Families flagged significant in a CAFE family results file.
///
/// The file is whitespace-delimited with one header line; the first field is the
/// family and the third field is `y` for significant families.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignificantFamilies {
    families: FxHashSet<String>,
}

impl SignificantFamilies {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        check_file(path, "family results")?;
        Self::from_reader(open_reader(path)?).map_err(|e| Error::file_io(path, e))
    }

    pub fn from_reader(reader: impl Read) -> std::io::Result<Self> {
        let mut families = FxHashSet::default();

        for line in BufReader::new(reader).lines().skip(1) {
            let line = line?;
            let fields = line.split_whitespace().collect::<Vec<_>>();
            if fields.len() >= 3 && fields[2].eq_ignore_ascii_case("y") {
                families.insert(fields[0].to_owned());
            }
        }

        Ok(Self { families })
    }

    pub fn contains(&self, family: &str) -> bool {
        self.families.contains(family)
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SignificantFamilies {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            families: iter.into_iter().map(Into::into).collect(),
        }
    }
}

pub struct SignificanceFilterOp<'t> {
    table: &'t Table,
    significant: &'t SignificantFamilies,
}

impl<'t> SignificanceFilterOp<'t> {
    const NAME: &'static str = "SignificanceFilterOp";

    /// Keep the rows of a family × node change matrix whose `FamilyID` is significant.
    pub fn new(table: &'t Table, significant: &'t SignificantFamilies) -> Self {
        Self { table, significant }
    }
}

impl<'t> Op for SignificanceFilterOp<'t> {
    type Output = Table;

    fn run(&self) -> Result<Self::Output> {
        let id_col = family_id_column(self.table)?;
        Ok(self
            .table
            .retain_rows(|row| self.significant.contains(&row[id_col])))
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

/// Change matrices from CAFE always carry a literal `FamilyID` column.
pub(crate) fn family_id_column(table: &Table) -> Result<usize> {
    ColumnResolver::new([ColumnPattern::exact("FamilyID")], ColumnMatch::Strict).resolve(table)
}
