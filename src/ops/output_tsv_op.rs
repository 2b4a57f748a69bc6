use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::*;
use crate::ops::Op;
use crate::table::create_writer;

pub struct OutputTsvOp<'r, T: Serialize> {
    path: PathBuf,
    rows: &'r [T],
}

impl<'r, T: Serialize> OutputTsvOp<'r, T> {
    const NAME: &'static str = "OutputTsvOp";

    /// Write rows as a tab-separated table with a header row taken from the field names.
    ///
    /// The file is compressed if its name ends with `.gz`.
    pub fn new(path: impl AsRef<Path>, rows: &'r [T]) -> Self {
        Self {
            path: path.as_ref().to_owned(),
            rows,
        }
    }
}

impl<'r, T: Serialize> Op for OutputTsvOp<'r, T> {
    type Output = usize;

    fn run(&self) -> Result<Self::Output> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(create_writer(&self.path)?);

        for row in self.rows {
            wtr.serialize(row).map_err(|e| Error::csv(&self.path, e))?;
        }
        wtr.flush().map_err(|e| Error::file_io(&self.path, e))?;

        Ok(self.rows.len())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}
