//! Table and sequence operations.
//!
//! Each operation is configured up front and then executed once with [`Op::run`].

use crate::errors::Result;

pub trait Op {
    type Output;

    fn run(&self) -> Result<Self::Output>;

    fn name(&self) -> &'static str;
}

mod top_families_op;
pub use top_families_op::*;

mod family_size_op;
pub use family_size_op::*;

mod orthogroup_genes_op;
pub use orthogroup_genes_op::*;

mod annotation_op;
pub use annotation_op::*;

mod significance_op;
pub use significance_op::*;

mod tree_label_op;
pub use tree_label_op::*;

mod remove_taxa_op;
pub use remove_taxa_op::*;

mod output_tsv_op;
pub use output_tsv_op::*;
