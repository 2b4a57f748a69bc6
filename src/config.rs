use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::*;
use crate::table::open_reader;

/// Settings for removing taxa from a directory of locus alignments.
///
/// ```yaml
/// input_dir: loci/raw
/// output_dir: loci/no-1096-1370
/// remove_taxa:
///   - Tasa_davidi_JXZ1096
///   - Orienticius_chikunii_JXZ1370
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveTaxaConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub remove_taxa: Vec<String>,
}

impl Default for RemoveTaxaConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("raw"),
            output_dir: PathBuf::from("no-1096-1370"),
            remove_taxa: vec![
                "Tasa_davidi_JXZ1096".to_owned(),
                "Orienticius_chikunii_JXZ1370".to_owned(),
            ],
        }
    }
}

impl RemoveTaxaConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        check_file(path, "config")?;
        serde_yaml::from_reader(open_reader(path)?).map_err(|e| Error::Config {
            file: display(path),
            source: e,
        })
    }
}
