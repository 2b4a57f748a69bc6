use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::errors::*;
use crate::ops::Op;
use crate::table::{create_writer, read_fasta};

const LOCUS_EXTENSIONS: [&str; 4] = ["fasta", "fa", "fas", "fna"];
const LINE_WIDTH: usize = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    pub files_written: usize,
    pub files_skipped: usize,
    pub records_kept: usize,
    pub records_removed: usize,
}

pub struct RemoveTaxaOp {
    input_dir: PathBuf,
    output_dir: PathBuf,
    taxa: Vec<String>,
}

impl RemoveTaxaOp {
    const NAME: &'static str = "RemoveTaxaOp";

    /// Copy every locus FASTA file from `input_dir` to `output_dir`, dropping the records
    /// whose header mentions any of the taxa (ignoring case).
    pub fn new<S: AsRef<str>>(
        input_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        taxa: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_owned(),
            output_dir: output_dir.as_ref().to_owned(),
            taxa: taxa.into_iter().map(|t| t.as_ref().to_lowercase()).collect(),
        }
    }

    fn is_removed(&self, header: &str) -> bool {
        let header = header.to_lowercase();
        self.taxa.iter().any(|t| header.contains(t.as_str()))
    }

    /// Filter one file, returning the number of records kept and removed.
    ///
    /// The input is read completely before the output is created, so the output may
    /// replace the input.
    fn filter_file(&self, input: &Path, output: &Path) -> Result<(usize, usize)> {
        let records = read_fasta(input)?;
        let total = records.len();
        let kept = records
            .into_iter()
            .filter(|r| !self.is_removed(&String::from_utf8_lossy(&r.header)))
            .collect::<Vec<_>>();

        let mut writer = create_writer(output)?;
        for record in &kept {
            write_fasta_record(&mut writer, &record.header, &record.seq)
                .map_err(|e| Error::file_io(output, e))?;
        }
        writer.flush().map_err(|e| Error::file_io(output, e))?;

        Ok((kept.len(), total - kept.len()))
    }
}

impl Op for RemoveTaxaOp {
    type Output = RemovalReport;

    fn run(&self) -> Result<Self::Output> {
        if !self.input_dir.is_dir() {
            return Err(Error::DirectoryNotFound(display(&self.input_dir)));
        }
        std::fs::create_dir_all(&self.output_dir).map_err(|e| Error::file_io(&self.output_dir, e))?;

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.input_dir).map_err(|e| Error::file_io(&self.input_dir, e))? {
            files.push(entry.map_err(|e| Error::file_io(&self.input_dir, e))?.path());
        }
        files.sort();

        let mut report = RemovalReport::default();
        for input in files {
            let Some(file_name) = input.file_name() else {
                continue;
            };
            if !input.is_file() || !is_locus_file(&input) {
                debug!("{}: skipping {}", Self::NAME, input.display());
                report.files_skipped += 1;
                continue;
            }

            let output = self.output_dir.join(file_name);
            let (kept, removed) = self.filter_file(&input, &output)?;
            debug!(
                "{}: {} kept {kept}, removed {removed}",
                Self::NAME,
                input.display()
            );

            report.files_written += 1;
            report.records_kept += kept;
            report.records_removed += removed;
        }

        info!(
            "Filtered {} locus files: {} records kept, {} removed",
            report.files_written, report.records_kept, report.records_removed
        );
        Ok(report)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

pub fn is_locus_file(path: &Path) -> bool {
    path.extension()
        .map(|e| {
            let e = e.to_string_lossy();
            LOCUS_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x))
        })
        .unwrap_or(false)
}

pub fn write_fasta_record(writer: &mut dyn Write, header: &[u8], seq: &[u8]) -> std::io::Result<()> {
    writer.write_all(b">")?;
    writer.write_all(header)?;
    writer.write_all(b"\n")?;
    for line in seq.chunks(LINE_WIDTH) {
        writer.write_all(line)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locus_extensions() {
        assert!(is_locus_file(Path::new("uce-1.fasta")));
        assert!(is_locus_file(Path::new("uce-1.FAS")));
        assert!(is_locus_file(Path::new("uce-1.fna")));
        assert!(!is_locus_file(Path::new("uce-1.nex")));
        assert!(!is_locus_file(Path::new("README")));
    }

    #[test]
    fn wraps_sequences() {
        let mut out = Vec::new();
        let seq = vec![b'A'; 130];
        write_fasta_record(&mut out, b"x desc", &seq).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], ">x desc");
        assert_eq!(lines[1].len(), 60);
        assert_eq!(lines[3].len(), 10);
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn removes_by_header_substring() {
        let op = RemoveTaxaOp::new("in", "out", ["Tasa_davidi_JXZ1096"]);
        assert!(op.is_removed("g123 Tasa_davidi_JXZ1096 putative protein"));
        assert!(op.is_removed("tasa_davidi_jxz1096_uce-5"));
        assert!(!op.is_removed("g124 Siler_cupreus"));
    }
}
