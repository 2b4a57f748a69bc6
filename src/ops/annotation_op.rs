use std::io::BufRead;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::debug;
use memchr::memchr_iter;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::errors::*;
use crate::ops::Op;
use crate::parse_utils::*;
use crate::table::{is_gz, open_reader, read_fasta, Table};

lazy_static! {
    // ID plus the first product/Name/Note/gene value that follows it
    static ref GFF_ATTRS: Regex =
        Regex::new(r"(?i)ID=([^;]+).*?(?:product|Name|Note|gene)=([^;]+)").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    pub gene_id: String,
    pub annotation: String,
}

impl Annotation {
    pub fn new(gene_id: impl Into<String>, annotation: impl Into<String>) -> Self {
        Self {
            gene_id: gene_id.into(),
            annotation: annotation.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationFormat {
    /// `FamilyID GeneID Annotation` or `GeneID Annotation`, tab-separated, no header.
    Table,
    /// Protein FASTA; the header text after the ID is the annotation.
    Fasta,
    /// GFF3 features; the annotation comes from the attribute column.
    Gff,
}

impl AnnotationFormat {
    /// Pick the format from the file suffix, looking through a trailing `.gz`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = if is_gz(path) {
            Path::new(path.file_stem().unwrap_or_default())
        } else {
            path
        };

        let ext = inner
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "tsv" | "txt" | "csv" => Ok(Self::Table),
            "faa" | "fa" | "fasta" => Ok(Self::Fasta),
            "gff3" | "gff" => Ok(Self::Gff),
            _ => Err(Error::UnsupportedFormat(display(path))),
        }
    }
}

pub struct AnnotationOp<'g> {
    path: Option<PathBuf>,
    genes: &'g FxHashSet<String>,
}

impl<'g> AnnotationOp<'g> {
    const NAME: &'static str = "AnnotationOp";

    /// Collect annotations for the given genes from an annotation table, a protein FASTA
    /// or a GFF3 file. Without a path the result is empty.
    pub fn new(path: Option<impl AsRef<Path>>, genes: &'g FxHashSet<String>) -> Self {
        Self {
            path: path.map(|p| p.as_ref().to_owned()),
            genes,
        }
    }

    pub fn from_file(path: impl AsRef<Path>, genes: &'g FxHashSet<String>) -> Self {
        Self::new(Some(path), genes)
    }

    fn read_table(&self, path: &Path) -> Result<Vec<Annotation>> {
        let table = Table::from_file_headerless(path)?;
        let (gene_col, ann_col) = match table.width() {
            0 | 1 => return Ok(Vec::new()),
            2 => (0, 1),
            _ => (1, 2),
        };

        Ok(table
            .rows()
            .iter()
            .filter(|r| !is_missing(&r[gene_col]) && !is_missing(&r[ann_col]))
            .filter(|r| self.genes.contains(&r[gene_col]))
            .map(|r| Annotation::new(r[gene_col].as_str(), r[ann_col].as_str()))
            .collect())
    }

    fn read_fasta(&self, path: &Path) -> Result<Vec<Annotation>> {
        let mut annotations = Vec::new();
        for record in read_fasta(path)? {
            let header = String::from_utf8_lossy(&record.header);
            let header = header.trim();
            let (gene, desc) = match header.split_once(|c: char| c.is_whitespace()) {
                Some((gene, desc)) => (gene, desc.trim()),
                None => (header, ""),
            };

            if self.genes.contains(gene) {
                annotations.push(Annotation::new(gene, desc));
            }
        }

        Ok(annotations)
    }

    fn read_gff(&self, path: &Path) -> Result<Vec<Annotation>> {
        let reader = BufReader::new(open_reader(path)?);

        let mut annotations = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| Error::file_io(path, e))?;
            if line.starts_with('#') {
                continue;
            }
            let Some(line) = trim_ascii_whitespace(&line) else {
                continue;
            };
            let Some(attrs) = gff_attributes(line) else {
                continue;
            };

            if let Some(caps) = GFF_ATTRS.captures(attrs) {
                let gene = &caps[1];
                if self.genes.contains(gene) {
                    annotations.push(Annotation::new(gene, &caps[2]));
                }
            }
        }

        Ok(annotations)
    }
}

impl<'g> Op for AnnotationOp<'g> {
    type Output = Vec<Annotation>;

    fn run(&self) -> Result<Self::Output> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        check_file(path, "annotation file")?;

        let annotations = match AnnotationFormat::from_path(path)? {
            AnnotationFormat::Table => self.read_table(path)?,
            AnnotationFormat::Fasta => self.read_fasta(path)?,
            AnnotationFormat::Gff => self.read_gff(path)?,
        };

        Ok(dedup(annotations))
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

pub struct AnnotationDirOp<'g> {
    dir: PathBuf,
    taxon: String,
    genes: &'g FxHashSet<String>,
}

impl<'g> AnnotationDirOp<'g> {
    const NAME: &'static str = "AnnotationDirOp";

    /// Collect annotations from every file in a directory whose name contains the taxon.
    ///
    /// Files that fail to parse are skipped.
    pub fn new(dir: impl AsRef<Path>, taxon: impl Into<String>, genes: &'g FxHashSet<String>) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
            taxon: taxon.into(),
            genes,
        }
    }
}

impl<'g> Op for AnnotationDirOp<'g> {
    type Output = Vec<Annotation>;

    fn run(&self) -> Result<Self::Output> {
        if !self.dir.is_dir() {
            return Err(Error::DirectoryNotFound(display(&self.dir)));
        }

        let mut candidates = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(|e| Error::file_io(&self.dir, e))? {
            let path = entry.map_err(|e| Error::file_io(&self.dir, e))?.path();
            let matches = path
                .file_name()
                .map(|n| contains_ignore_case(&n.to_string_lossy(), &self.taxon))
                .unwrap_or(false);
            if matches && path.is_file() {
                candidates.push(path);
            }
        }
        candidates.sort();

        let mut annotations = Vec::new();
        for path in candidates {
            match AnnotationOp::from_file(&path, self.genes).run() {
                Ok(found) => {
                    debug!("{}: {} annotations from {}", Self::NAME, found.len(), path.display());
                    annotations.extend(found);
                }
                Err(e) => debug!("{}: skipping {}: {e}", Self::NAME, path.display()),
            }
        }

        Ok(dedup(annotations))
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

/// Drop repeated (gene, annotation) pairs, keeping the first occurrence.
pub fn dedup(annotations: Vec<Annotation>) -> Vec<Annotation> {
    let mut seen = FxHashSet::default();
    annotations
        .into_iter()
        .filter(|a| seen.insert(a.clone()))
        .collect()
}

/// The 9th tab-separated field of a GFF line, if the line has at least 9 fields.
fn gff_attributes(line: &str) -> Option<&str> {
    let start = memchr_iter(b'\t', line.as_bytes()).nth(7)? + 1;
    let rest = &line[start..];
    match rest.find('\t') {
        Some(end) => Some(&rest[..end]),
        None => Some(rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genes(ids: &[&str]) -> FxHashSet<String> {
        ids.iter().map(|g| g.to_string()).collect()
    }

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn write_gz(path: &Path, contents: &str) {
        use std::io::Write;

        let file = std::fs::File::create(path).unwrap();
        let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        enc.write_all(contents.as_bytes()).unwrap();
        enc.finish().unwrap();
    }

    #[test]
    fn formats_by_suffix() {
        assert_eq!(AnnotationFormat::from_path("a.TSV").unwrap(), AnnotationFormat::Table);
        assert_eq!(AnnotationFormat::from_path("a.faa.gz").unwrap(), AnnotationFormat::Fasta);
        assert_eq!(AnnotationFormat::from_path("dir/a.gff3").unwrap(), AnnotationFormat::Gff);
        assert!(matches!(
            AnnotationFormat::from_path("a.bed"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn three_column_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "ann.tsv",
            "OG1\tg1\tkinase\nOG1\tg1\tkinase\nOG2\tg2\t\nOG3\tg9\tporin\n",
        );
        let wanted = genes(&["g1", "g2"]);
        let found = AnnotationOp::from_file(&path, &wanted).run().unwrap();
        assert_eq!(found, vec![Annotation::new("g1", "kinase")]);
    }

    #[test]
    fn two_column_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "ann.txt", "g1\tkinase\ng2\tporin\n");
        let wanted = genes(&["g2"]);
        let found = AnnotationOp::from_file(&path, &wanted).run().unwrap();
        assert_eq!(found, vec![Annotation::new("g2", "porin")]);
    }

    #[test]
    fn one_column_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "ids.tsv", "g1\ng2\n");
        let wanted = genes(&["g1", "g2"]);
        assert!(AnnotationOp::from_file(&path, &wanted).run().unwrap().is_empty());
    }

    #[test]
    fn fasta_with_leading_blank_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "prot.faa", "\n>g1 kinase\nMKV\n");
        let wanted = genes(&["g1"]);
        let found = AnnotationOp::from_file(&path, &wanted).run().unwrap();
        assert_eq!(found, vec![Annotation::new("g1", "kinase")]);
    }

    #[test]
    fn gzipped_fasta_and_gff() {
        let dir = tempfile::tempdir().unwrap();
        let wanted = genes(&["g1", "g2"]);

        let faa = dir.path().join("prot.faa.gz");
        write_gz(&faa, ">g1 serine protease\nMKV\n");
        let found = AnnotationOp::from_file(&faa, &wanted).run().unwrap();
        assert_eq!(found, vec![Annotation::new("g1", "serine protease")]);

        let gff = dir.path().join("genome.gff3.gz");
        write_gz(&gff, "chr1\ts\tmRNA\t1\t9\t.\t+\t.\tID=g2;product=lipase\n");
        let found = AnnotationOp::from_file(&gff, &wanted).run().unwrap();
        assert_eq!(found, vec![Annotation::new("g2", "lipase")]);
    }

    #[test]
    fn fasta_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "prot.faa",
            ">g1 serine protease 3\nMKV\nLLA\n>g2\nMAA\n>g3 other\nMCC\n",
        );
        let wanted = genes(&["g1", "g2"]);
        let found = AnnotationOp::from_file(&path, &wanted).run().unwrap();
        assert_eq!(
            found,
            vec![Annotation::new("g1", "serine protease 3"), Annotation::new("g2", "")]
        );
    }

    #[test]
    fn gff_attributes_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "genome.gff3",
            "##gff-version 3\n\
             chr1\tsrc\tgene\t1\t100\t.\t+\t.\tID=g1;Name=abcA;product=ignored\n\
             chr1\tsrc\tmRNA\t1\t100\t.\t+\t.\tID=g2;Parent=g1;product=transporter\n\
             chr1\tsrc\tgene\t1\t100\t.\t+\t.\tID=g3\n\
             short\tline\n\
             \n",
        );
        let wanted = genes(&["g1", "g2", "g3"]);
        let found = AnnotationOp::from_file(&path, &wanted).run().unwrap();
        assert_eq!(
            found,
            vec![Annotation::new("g1", "abcA"), Annotation::new("g2", "transporter")]
        );
    }

    #[test]
    fn missing_and_absent_paths() {
        let wanted = genes(&["g1"]);
        assert!(AnnotationOp::new(None::<&Path>, &wanted).run().unwrap().is_empty());
        assert!(matches!(
            AnnotationOp::from_file("/nonexistent/ann.tsv", &wanted).run(),
            Err(Error::MissingFile { .. })
        ));
    }

    #[test]
    fn directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "Siler_cupreus.gff3",
            "chr1\ts\tgene\t1\t9\t.\t+\t.\tID=g1;Note=toxin\n",
        );
        write(dir.path(), "siler_cupreus.bed", "whatever\n");
        write(dir.path(), "Other.gff3", "chr1\ts\tgene\t1\t9\t.\t+\t.\tID=g2;Note=x\n");

        let wanted = genes(&["g1", "g2"]);
        let found = AnnotationDirOp::new(dir.path(), "SILER_CUPREUS", &wanted).run().unwrap();
        assert_eq!(found, vec![Annotation::new("g1", "toxin")]);

        assert!(matches!(
            AnnotationDirOp::new(dir.path().join("nope"), "x", &wanted).run(),
            Err(Error::DirectoryNotFound(_))
        ));
    }
}
