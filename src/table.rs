//! Tab-separated tables held in memory.
//!
//! Every table in the pipeline is small enough (thousands of families) to be read whole.
//! Cells are kept as text and coerced on demand, so a table can be written back out
//! exactly as it was read.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use flate2::{read::MultiGzDecoder, write::GzEncoder, Compression};

use crate::errors::*;
use crate::parse_utils::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows.into_iter().map(|r| pad(r, width)).collect();
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Read a tab-separated table whose first line is a header.
    ///
    /// Header names are trimmed. Rows shorter than the header are padded with empty cells.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(open_reader(path)?);

        let headers = rdr
            .headers()
            .map_err(|e| Error::csv(path, e))?
            .iter()
            .map(|h| h.trim().to_owned())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| Error::csv(path, e))?;
            rows.push(record.iter().map(|c| c.to_owned()).collect());
        }

        Ok(Self::new(display(path), headers, rows))
    }

    /// Read a table without a header line. The width is that of the widest row.
    pub fn from_file_headerless(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(open_reader(path)?);

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| Error::csv(path, e))?;
            rows.push(record.iter().map(|c| c.to_owned()).collect());
        }

        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let headers = (0..width).map(|i| i.to_string()).collect();
        Ok(Self::new(display(path), headers, rows))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text of one column for every row.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |r| r[idx].as_str())
    }

    /// Cells of one column coerced to numbers.
    pub fn numeric_column(&self, idx: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.column(idx).map(parse_number)
    }

    /// Keep only rows for which `keep` returns true, preserving order.
    pub fn retain_rows(&self, mut keep: impl FnMut(&[String]) -> bool) -> Self {
        Self {
            name: self.name.clone(),
            headers: self.headers.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(create_writer(path)?);

        wtr.write_record(&self.headers)
            .map_err(|e| Error::csv(path, e))?;
        for row in &self.rows {
            wtr.write_record(row).map_err(|e| Error::csv(path, e))?;
        }
        wtr.flush().map_err(|e| Error::file_io(path, e))
    }
}

fn pad(mut row: Vec<String>, width: usize) -> Vec<String> {
    if row.len() < width {
        row.resize(width, String::new());
    }
    row
}

/// Open a file for reading, decompressing it if the name ends with `.gz`.
pub fn open_reader(path: impl AsRef<Path>) -> Result<Box<dyn Read>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::file_io(path, e))?;

    if is_gz(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Create (or truncate) a file for writing, compressing it if the name ends with `.gz`.
pub fn create_writer(path: impl AsRef<Path>) -> Result<Box<dyn Write>> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| Error::file_io(parent, e))?;
        }
    }

    let file = File::create(path).map_err(|e| Error::file_io(path, e))?;

    if is_gz(path) {
        Ok(Box::new(BufWriter::new(GzEncoder::new(
            file,
            Compression::default(),
        ))))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// A FASTA record: the full header line without `>`, and the unwrapped sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub header: Vec<u8>,
    pub seq: Vec<u8>,
}

/// Read every record of a FASTA file into memory.
///
/// Leading blank lines are ignored and a file without any record gives an empty list.
pub fn read_fasta(path: impl AsRef<Path>) -> Result<Vec<FastaRecord>> {
    let path = path.as_ref();
    let mut data = Vec::new();
    open_reader(path)?
        .read_to_end(&mut data)
        .map_err(|e| Error::file_io(path, e))?;

    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    if start == data.len() {
        return Ok(Vec::new());
    }
    data.drain(..start);

    let parse_error = |e: needletail::errors::ParseError| Error::ParseRecord {
        file: display(path),
        source: Box::new(e),
    };
    let mut reader = needletail::parse_fastx_reader(Cursor::new(data)).map_err(parse_error)?;

    let mut records = Vec::new();
    while let Some(record) = reader.next() {
        let record = record.map_err(parse_error)?;
        records.push(FastaRecord {
            header: record.id().to_vec(),
            seq: record.seq().into_owned(),
        });
    }
    Ok(records)
}

pub fn is_gz(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_trims_headers_and_pads_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tsv");
        std::fs::write(&path, " FamilyID \tA\tB\nOG1\t1\nOG2\t2\t3\n").unwrap();

        let table = Table::from_file(&path).unwrap();
        assert_eq!(table.headers(), &["FamilyID", "A", "B"]);
        assert_eq!(table.rows()[0], vec!["OG1", "1", ""]);
        assert_eq!(table.numeric_column(2).collect::<Vec<_>>(), vec![None, Some(3.0)]);
    }

    #[test]
    fn headerless_width_is_widest_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ann.tsv");
        std::fs::write(&path, "g1\tkinase\nOG1\tg2\tporin\n").unwrap();

        let table = Table::from_file_headerless(&path).unwrap();
        assert_eq!(table.width(), 3);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn fasta_skips_leading_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let blank = dir.path().join("blank.fasta");
        std::fs::write(&blank, "\n  \n").unwrap();
        assert!(read_fasta(&blank).unwrap().is_empty());

        let padded = dir.path().join("padded.faa");
        std::fs::write(&padded, "\n>g1 kinase\nMKV\nLL\n").unwrap();
        assert_eq!(
            read_fasta(&padded).unwrap(),
            vec![FastaRecord {
                header: b"g1 kinase".to_vec(),
                seq: b"MKVLL".to_vec(),
            }]
        );
    }

    #[test]
    fn gz_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.tsv.gz");
        let table = Table::new(
            "mem",
            vec!["FamilyID".into(), "N1".into()],
            vec![vec!["OG1".into(), "-2".into()]],
        );
        table.to_file(&path).unwrap();

        let back = Table::from_file(&path).unwrap();
        assert_eq!(back.headers(), table.headers());
        assert_eq!(back.rows(), table.rows());
    }
}
