//! End-to-end runs wiring the ops together.
//!
//! [`extract_top_families`] produces the expanded/contracted family summaries and the
//! per-gene annotation table for one taxon. [`label_tree`] and [`filter_significant`]
//! post-process a CAFE run restricted to its significant families.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Serialize, Serializer};

use crate::errors::*;
use crate::ops::*;
use crate::parse_utils::fmt_number;
use crate::patterns::ColumnMatch;
use crate::table::{create_writer, open_reader, Table};

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub base_change: PathBuf,
    pub matrix: PathBuf,
    pub orthogroups: PathBuf,
    pub annotation: Option<PathBuf>,
    pub gffdir: Option<PathBuf>,
    pub taxon: String,
    pub topn: usize,
    pub mode: Mode,
    pub outdir: PathBuf,
    pub column_match: ColumnMatch,
}

impl ExtractConfig {
    pub fn output_path(&self, kind: &str) -> PathBuf {
        self.outdir
            .join(format!("{}_top{}_{kind}.tsv", self.taxon, self.topn))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilySummary {
    #[serde(rename = "FamilyID")]
    pub family_id: String,
    #[serde(rename = "DeltaCopy", serialize_with = "number")]
    pub delta_copy: Option<f64>,
    #[serde(rename = "Direction")]
    pub direction: Direction,
    #[serde(rename = "CopyNumber", serialize_with = "number")]
    pub copy_number: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedGeneRecord {
    #[serde(rename = "FamilyID")]
    pub family_id: String,
    #[serde(rename = "GeneID")]
    pub gene_id: String,
    #[serde(rename = "DeltaCopy", serialize_with = "number")]
    pub delta_copy: Option<f64>,
    #[serde(rename = "CopyNumber", serialize_with = "number")]
    pub copy_number: Option<f64>,
    #[serde(rename = "Direction")]
    pub direction: Option<Direction>,
    #[serde(rename = "Annotation")]
    pub annotation: String,
}

fn number<S: Serializer>(v: &Option<f64>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match v {
        Some(v) => s.serialize_str(&fmt_number(*v)),
        None => s.serialize_str(""),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractReport {
    pub families_selected: usize,
    pub genes: usize,
    pub annotations: usize,
    pub written: Vec<PathBuf>,
}

/// Left-join the selected families with their copy numbers.
///
/// Returns the expanded summaries (largest change first) and the contracted summaries
/// (most negative first).
pub fn summarize_families(
    selected: &[ChangeRecord],
    sizes: &[FamilySize],
) -> (Vec<FamilySummary>, Vec<FamilySummary>) {
    let mut size_of = FxHashMap::default();
    for size in sizes {
        size_of.entry(size.family_id.as_str()).or_insert(size.copy_number);
    }

    let summaries = selected.iter().map(|r| FamilySummary {
        family_id: r.family_id.clone(),
        delta_copy: r.change,
        direction: r.direction,
        copy_number: size_of.get(r.family_id.as_str()).copied().flatten(),
    });

    let (mut expanded, rest): (Vec<_>, Vec<_>) =
        summaries.partition(|s| s.direction == Direction::Expanded);
    let mut contracted = rest
        .into_iter()
        .filter(|s| s.direction == Direction::Contracted)
        .collect::<Vec<_>>();

    let key = |s: &FamilySummary| s.delta_copy.unwrap_or(0.0);
    expanded.sort_by(|a, b| key(b).total_cmp(&key(a)));
    contracted.sort_by(|a, b| key(a).total_cmp(&key(b)));

    (expanded, contracted)
}

/// One row per gene and matching annotation; genes without annotation get an empty one.
pub fn merge_genes(
    genes: &[GeneMembership],
    summaries: &[FamilySummary],
    annotations: &[Annotation],
) -> Vec<MergedGeneRecord> {
    let mut summary_of = FxHashMap::default();
    for s in summaries {
        summary_of.entry(s.family_id.as_str()).or_insert(s);
    }

    let mut annotations_of: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for a in annotations {
        annotations_of
            .entry(a.gene_id.as_str())
            .or_default()
            .push(a.annotation.as_str());
    }

    let mut merged = Vec::with_capacity(genes.len());
    for gene in genes {
        let summary = summary_of.get(gene.family_id.as_str());
        let record = |annotation: &str| MergedGeneRecord {
            family_id: gene.family_id.clone(),
            gene_id: gene.gene_id.clone(),
            delta_copy: summary.and_then(|s| s.delta_copy),
            copy_number: summary.and_then(|s| s.copy_number),
            direction: summary.map(|s| s.direction),
            annotation: annotation.to_owned(),
        };

        match annotations_of.get(gene.gene_id.as_str()) {
            Some(found) => merged.extend(found.iter().map(|&a| record(a))),
            None => merged.push(record("")),
        }
    }

    merged
}

fn run_op<O: Op>(op: O) -> Result<O::Output> {
    debug!("Running {}", op.name());
    op.run()
}

/// Annotation from the file if it yields anything, otherwise from the directory.
///
/// Failures are logged and give an empty set; the two sources are never combined.
fn annotate(config: &ExtractConfig, genes: &FxHashSet<String>) -> Vec<Annotation> {
    let mut annotations = Vec::new();

    if let Some(path) = &config.annotation {
        match AnnotationOp::from_file(path, genes).run() {
            Ok(found) => {
                info!("Extracted {} annotations from {}", found.len(), path.display());
                annotations = found;
            }
            Err(e) => warn!("Failed to extract annotations from {}: {e}", path.display()),
        }
    }

    if annotations.is_empty() {
        if let Some(dir) = &config.gffdir {
            match AnnotationDirOp::new(dir, &config.taxon, genes).run() {
                Ok(found) => {
                    info!("Extracted {} annotations from directory {}", found.len(), dir.display());
                    annotations = found;
                }
                Err(e) => warn!("Failed to extract annotations from directory {}: {e}", dir.display()),
            }
        }
    }

    annotations
}

pub fn extract_top_families(config: &ExtractConfig) -> Result<ExtractReport> {
    check_file(&config.base_change, "base change table")?;
    check_file(&config.matrix, "gene count matrix")?;
    check_file(&config.orthogroups, "orthogroups table")?;

    std::fs::create_dir_all(&config.outdir).map_err(|e| Error::file_io(&config.outdir, e))?;

    let change = Table::from_file(&config.base_change)?;
    let selected = run_op(
        TopFamiliesOp::new(&change, &config.taxon, config.topn, config.mode)
            .with_column_match(config.column_match),
    )?;
    info!(
        "Selected {} families (mode {:?}, top {})",
        selected.len(),
        config.mode,
        config.topn
    );

    let matrix = Table::from_file(&config.matrix)?;
    let sizes = run_op(
        FamilySizeOp::new(&matrix, &config.taxon).with_column_match(config.column_match),
    )?;

    let orthogroups = Table::from_file(&config.orthogroups)?;
    let genes = run_op(
        OrthogroupGenesOp::new(
            &orthogroups,
            selected.iter().map(|r| r.family_id.as_str()),
            &config.taxon,
        )
        .with_column_match(config.column_match),
    )?;
    if genes.is_empty() {
        warn!("No genes extracted from {} (names may not match)", config.orthogroups.display());
    } else {
        info!("Extracted {} gene records from {}", genes.len(), config.orthogroups.display());
    }

    let gene_ids = genes.iter().map(|g| g.gene_id.clone()).collect::<FxHashSet<_>>();
    let annotations = annotate(config, &gene_ids);

    let (expanded, contracted) = summarize_families(&selected, &sizes);

    let mut report = ExtractReport {
        families_selected: selected.len(),
        genes: genes.len(),
        annotations: annotations.len(),
        written: Vec::new(),
    };

    if config.mode.expands() && !expanded.is_empty() {
        let path = config.output_path("expanded_families");
        run_op(OutputTsvOp::new(&path, &expanded))?;
        info!("Wrote expanded family summary to {}", path.display());
        report.written.push(path);
    }
    if config.mode.contracts() && !contracted.is_empty() {
        let path = config.output_path("contracted_families");
        run_op(OutputTsvOp::new(&path, &contracted))?;
        info!("Wrote contracted family summary to {}", path.display());
        report.written.push(path);
    }

    if genes.is_empty() {
        info!("No gene-level table written (no genes extracted)");
    } else {
        let summaries = expanded.iter().chain(&contracted).cloned().collect::<Vec<_>>();
        let merged = merge_genes(&genes, &summaries, &annotations);
        let path = config.output_path("merged_genes");
        run_op(OutputTsvOp::new(&path, &merged))?;
        info!("Wrote merged gene table to {}", path.display());
        report.written.push(path);
    }

    Ok(report)
}

#[derive(Debug, Clone)]
pub struct SignificanceConfig {
    pub results: PathBuf,
    pub change: PathBuf,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            results: PathBuf::from("Gamma_family_results.txt"),
            change: PathBuf::from("Gamma_change.tab"),
        }
    }
}

fn significant_change(config: &SignificanceConfig) -> Result<Table> {
    let significant = SignificantFamilies::from_file(&config.results)?;
    info!("{} significant families", significant.len());

    check_file(&config.change, "change table")?;
    let change = Table::from_file(&config.change)?;
    let filtered = run_op(SignificanceFilterOp::new(&change, &significant))?;
    info!(
        "Significant change matrix: {} rows x {} columns",
        filtered.len(),
        filtered.width()
    );
    Ok(filtered)
}

/// Write the change matrix restricted to significant families.
pub fn filter_significant(config: &SignificanceConfig, output: impl AsRef<Path>) -> Result<Table> {
    let filtered = significant_change(config)?;
    filtered.to_file(output.as_ref())?;
    info!("Wrote {}", output.as_ref().display());
    Ok(filtered)
}

/// Append significant expansion/contraction counts to the node labels of a tree file.
pub fn label_tree(
    config: &SignificanceConfig,
    tree: impl AsRef<Path>,
    output: impl AsRef<Path>,
    label_match: LabelMatch,
) -> Result<Vec<NodeChangeCount>> {
    let (tree, output) = (tree.as_ref(), output.as_ref());

    let filtered = significant_change(config)?;
    let counts = run_op(NodeCountOp::new(&filtered))?;
    info!("Counted significant changes for {} nodes", counts.len());

    check_file(tree, "tree")?;
    let mut text = String::new();
    open_reader(tree)?
        .read_to_string(&mut text)
        .map_err(|e| Error::file_io(tree, e))?;

    let labeled = run_op(TreeLabelOp::new(&text, &counts).with_label_match(label_match))?;

    let mut writer = create_writer(output)?;
    writer
        .write_all(labeled.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| Error::file_io(output, e))?;
    info!("Wrote {}", output.display());

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, v: f64) -> ChangeRecord {
        ChangeRecord {
            family_id: id.into(),
            change: Some(v),
            direction: Direction::of(Some(v)),
        }
    }

    #[test]
    fn summaries_split_and_sort() {
        let selected = [record("OG1", 2.0), record("OG2", 7.0), record("OG3", -1.0), record("OG4", -6.0)];
        let sizes = [
            FamilySize { family_id: "OG2".into(), copy_number: Some(12.0) },
            FamilySize { family_id: "OG2".into(), copy_number: Some(99.0) },
        ];
        let (expanded, contracted) = summarize_families(&selected, &sizes);

        assert_eq!(expanded.iter().map(|s| s.family_id.as_str()).collect::<Vec<_>>(), vec!["OG2", "OG1"]);
        assert_eq!(expanded[0].copy_number, Some(12.0));
        assert_eq!(expanded[1].copy_number, None);
        assert_eq!(contracted.iter().map(|s| s.family_id.as_str()).collect::<Vec<_>>(), vec!["OG4", "OG3"]);
    }

    #[test]
    fn merge_fans_out_annotations() {
        let genes = [
            GeneMembership { family_id: "OG1".into(), gene_id: "g1".into() },
            GeneMembership { family_id: "OG1".into(), gene_id: "g2".into() },
        ];
        let (summaries, _) = summarize_families(&[record("OG1", 3.0)], &[]);
        let annotations = [Annotation::new("g1", "kinase"), Annotation::new("g1", "kinase domain")];

        let merged = merge_genes(&genes, &summaries, &annotations);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].annotation, "kinase");
        assert_eq!(merged[1].annotation, "kinase domain");
        assert_eq!(merged[2].gene_id, "g2");
        assert_eq!(merged[2].annotation, "");
        assert_eq!(merged[2].direction, Some(Direction::Expanded));
    }
}
