use std::path::Path;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Cannot find {name}: \"{path}\"")]
    MissingFile { name: &'static str, path: String },
    #[error("Directory does not exist or is not a directory: \"{0}\"")]
    DirectoryNotFound(String),
    #[error("No column matching \"{wanted}\" in {table} (available: {})", .available.join(", "))]
    ColumnResolution {
        table: String,
        wanted: String,
        available: Vec<String>,
    },
    #[error("Column \"{wanted}\" is ambiguous in {table}, candidates: {}", .candidates.join(", "))]
    AmbiguousColumn {
        table: String,
        wanted: String,
        candidates: Vec<String>,
    },
    #[error("Unsupported annotation file type for \"{0}\" (expected .tsv/.txt/.csv/.faa/.fa/.fasta/.gff3/.gff)")]
    UnsupportedFormat(String),
    #[error("Error reading or writing \"{file}\"")]
    FileIo {
        file: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Error parsing table \"{file}\"")]
    Csv { file: String, source: csv::Error },
    #[error("Error parsing sequence record in \"{file}\"")]
    ParseRecord {
        file: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Invalid config \"{file}\"")]
    Config {
        file: String,
        source: serde_yaml::Error,
    },
}

impl Error {
    pub fn file_io(path: impl AsRef<Path>, e: std::io::Error) -> Self {
        Error::FileIo {
            file: display(path),
            source: Box::new(e),
        }
    }

    pub fn csv(path: impl AsRef<Path>, e: csv::Error) -> Self {
        Error::Csv {
            file: display(path),
            source: e,
        }
    }
}

/// Check that a required input exists before any work is done.
pub fn check_file(path: impl AsRef<Path>, name: &'static str) -> Result<()> {
    if path.as_ref().exists() {
        Ok(())
    } else {
        Err(Error::MissingFile {
            name,
            path: display(path),
        })
    }
}

pub fn display(path: impl AsRef<Path>) -> String {
    path.as_ref().display().to_string()
}
