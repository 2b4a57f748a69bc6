//! Post-processing for gene family evolution analyses.
//!
//! # Overview
//! cafekit turns the tables written by CAFE and OrthoFinder into summaries for one
//! lineage, and prepares locus alignments for phylogenomics.
//!
//! This is useful for:
//! * Finding the most expanded and contracted gene families of a species
//! * Attaching gene lists and functional annotations to those families
//! * Restricting a CAFE change matrix to its significant families
//! * Drawing significant expansion/contraction counts onto a species tree
//! * Dropping taxa from a batch of UCE locus files
//!
//! ## Tables
//! All inputs are tab-separated [`Table`]s kept as text. Columns are found with
//! [`ColumnResolver`]s: a taxon column is any header containing the taxon name (ignoring
//! case), and identifier columns fall back through an ordered list, e.g.
//! `FamilyID`, then `Orthogroup`, then the first column.
//!
//! ## Operations
//! Each step is an [`Op`](ops::Op) that is configured and then run once:
//! ```text
//! Base_change.tab ──TopFamiliesOp──┐
//! GeneCount.tsv ───FamilySizeOp────┼─> <taxon>_top<N>_{expanded,contracted}_families.tsv
//! Orthogroups.tsv ─OrthogroupGenesOp┐
//! annotation ──────AnnotationOp─────┴─> <taxon>_top<N>_merged_genes.tsv
//! ```
//! [`pipeline`] wires the ops into complete runs.
//!
//! ## Tree labels
//! Nodes are labelled `<node>+<expanded>-<contracted>`, counting significant families
//! only. A node without changes keeps its label.

pub mod config;
pub mod errors;
pub mod logging;
pub mod ops;
pub mod pipeline;
pub mod table;

mod parse_utils;
mod patterns;

// commonly used functions and types

pub use crate::ops::*;
pub use crate::patterns::*;
pub use crate::table::Table;
