use rustc_hash::FxHashSet;

use crate::errors::*;
use crate::ops::Op;
use crate::parse_utils::split_genes;
use crate::patterns::*;
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneMembership {
    pub family_id: String,
    pub gene_id: String,
}

pub struct OrthogroupGenesOp<'t> {
    table: &'t Table,
    families: FxHashSet<String>,
    taxon: String,
    column_match: ColumnMatch,
}

impl<'t> OrthogroupGenesOp<'t> {
    const NAME: &'static str = "OrthogroupGenesOp";

    /// Extract the genes of one taxon for the given families from an orthogroup table.
    ///
    /// A gene cell may list several genes separated by commas, semicolons or whitespace.
    pub fn new<S: AsRef<str>>(
        table: &'t Table,
        families: impl IntoIterator<Item = S>,
        taxon: impl Into<String>,
    ) -> Self {
        Self {
            table,
            families: families.into_iter().map(|f| f.as_ref().to_owned()).collect(),
            taxon: taxon.into(),
            column_match: ColumnMatch::default(),
        }
    }

    pub fn with_column_match(mut self, column_match: ColumnMatch) -> Self {
        self.column_match = column_match;
        self
    }
}

impl<'t> Op for OrthogroupGenesOp<'t> {
    type Output = Vec<GeneMembership>;

    fn run(&self) -> Result<Self::Output> {
        let id_col = ColumnResolver::orthogroup_id().resolve(self.table)?;
        let taxon_col = ColumnResolver::taxon(&self.taxon, self.column_match).resolve(self.table)?;

        let mut genes = Vec::new();
        for row in self.table.rows() {
            let family = &row[id_col];
            if !self.families.contains(family) {
                continue;
            }

            genes.extend(split_genes(&row[taxon_col]).into_iter().map(|g| GeneMembership {
                family_id: family.clone(),
                gene_id: g.to_owned(),
            }));
        }

        Ok(genes)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orthogroups() -> Table {
        Table::new(
            "Orthogroups.tsv",
            vec!["Orthogroup".into(), "Other".into(), "Siler_cupreus".into()],
            vec![
                vec!["OG001".into(), "x1".into(), "g1, g2;g3".into()],
                vec!["OG002".into(), "x2".into(), "g4".into()],
                vec!["OG003".into(), "x3".into(), "".into()],
                vec!["OG004".into(), "x4".into(), "nan".into()],
            ],
        )
    }

    #[test]
    fn splits_gene_lists() {
        let table = orthogroups();
        let genes = OrthogroupGenesOp::new(&table, ["OG001"], "Siler_cupreus").run().unwrap();
        let pairs = genes
            .iter()
            .map(|g| (g.family_id.as_str(), g.gene_id.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(pairs, vec![("OG001", "g1"), ("OG001", "g2"), ("OG001", "g3")]);
    }

    #[test]
    fn empty_cells_yield_no_genes() {
        let table = orthogroups();
        let genes = OrthogroupGenesOp::new(&table, ["OG003", "OG004", "OG999"], "siler").run().unwrap();
        assert!(genes.is_empty());
    }
}
