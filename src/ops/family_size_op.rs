use crate::errors::*;
use crate::ops::Op;
use crate::patterns::*;
use crate::table::Table;

#[derive(Debug, Clone, PartialEq)]
pub struct FamilySize {
    pub family_id: String,
    pub copy_number: Option<f64>,
}

pub struct FamilySizeOp<'t> {
    table: &'t Table,
    taxon: String,
    column_match: ColumnMatch,
}

impl<'t> FamilySizeOp<'t> {
    const NAME: &'static str = "FamilySizeOp";

    /// Read the copy number of every family for one taxon from a gene-count matrix.
    pub fn new(table: &'t Table, taxon: impl Into<String>) -> Self {
        Self {
            table,
            taxon: taxon.into(),
            column_match: ColumnMatch::default(),
        }
    }

    pub fn with_column_match(mut self, column_match: ColumnMatch) -> Self {
        self.column_match = column_match;
        self
    }
}

impl<'t> Op for FamilySizeOp<'t> {
    type Output = Vec<FamilySize>;

    fn run(&self) -> Result<Self::Output> {
        let taxon_col = ColumnResolver::taxon(&self.taxon, self.column_match).resolve(self.table)?;
        let id_col = ColumnResolver::family_id().resolve(self.table)?;

        Ok(self
            .table
            .column(id_col)
            .zip(self.table.numeric_column(taxon_col))
            .map(|(id, copy_number)| FamilySize {
                family_id: id.to_owned(),
                copy_number,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_size_per_row() {
        let table = Table::new(
            "Orthogroups.GeneCount.tsv",
            vec!["Orthogroup".into(), "Siler_cupreus".into(), "Total".into()],
            vec![
                vec!["OG1".into(), "4".into(), "9".into()],
                vec!["OG2".into(), "".into(), "1".into()],
            ],
        );

        let sizes = FamilySizeOp::new(&table, "SILER").run().unwrap();
        assert_eq!(
            sizes,
            vec![
                FamilySize { family_id: "OG1".into(), copy_number: Some(4.0) },
                FamilySize { family_id: "OG2".into(), copy_number: None },
            ]
        );
    }

    #[test]
    fn unknown_taxon_fails() {
        let table = Table::new("m", vec!["Orthogroup".into(), "A".into()], vec![]);
        assert!(matches!(
            FamilySizeOp::new(&table, "B").run(),
            Err(Error::ColumnResolution { .. })
        ));
    }
}
