use crate::error::{CliError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSamplingConfig {
    pub nsamp: Option<usize>,
    pub njobs: Option<usize>,
    pub smin: Option<f64>,
    pub smax: Option<f64>,
    pub potential: Option<String>,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileTheoryConfig {
    pub method: Option<String>,
    pub basis: Option<String>,
    pub energy_command: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FilePathsConfig {
    pub save_prefix: Option<PathBuf>,
    pub run_prefix: Option<PathBuf>,
    pub geometry_dir: Option<PathBuf>,
    pub executable: Option<PathBuf>,
}

/// Electronic state of one species; species without an entry are neutral singlets.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSpeciesConfig {
    #[serde(default)]
    pub charge: i32,
    #[serde(default = "singlet")]
    pub multiplicity: u32,
}

fn singlet() -> u32 {
    1
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub sampling: Option<FileSamplingConfig>,
    pub theory: Option<FileTheoryConfig>,
    pub paths: Option<FilePathsConfig>,
    #[serde(default)]
    pub species: BTreeMap<String, FileSpeciesConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
