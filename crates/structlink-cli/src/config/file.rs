use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileViewerConfig {
    pub paths: Option<Vec<PathBuf>>,
    #[serde(rename = "launch-args")]
    pub launch_args: Option<Vec<String>>,
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: Option<u64>,
}

/// Thresholds of a contact or clash search. A present table enables the
/// search unless `enabled = false`.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileContactConfig {
    pub enabled: Option<bool>,
    #[serde(rename = "overlap-cutoff")]
    pub overlap_cutoff: Option<f64>,
    #[serde(rename = "hbond-allowance")]
    pub hbond_allowance: Option<f64>,
    #[serde(rename = "bond-separation")]
    pub bond_separation: Option<u32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileHBondConfig {
    pub enabled: Option<bool>,
    #[serde(rename = "remove-redundant")]
    pub remove_redundant: Option<bool>,
    pub relax: Option<bool>,
    #[serde(rename = "distance-slop")]
    pub distance_slop: Option<f64>,
    #[serde(rename = "angle-slop")]
    pub angle_slop: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileDistanceConfig {
    pub enabled: Option<bool>,
    pub cutoff: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileNetworkConfig {
    pub name: Option<String>,
    /// `within`, `between` or `all`.
    pub scope: Option<String>,
    #[serde(rename = "add-hydrogens")]
    pub add_hydrogens: Option<bool>,
    #[serde(rename = "ignore-water")]
    pub ignore_water: Option<bool>,
    pub contacts: Option<FileContactConfig>,
    pub clashes: Option<FileContactConfig>,
    pub hbonds: Option<FileHBondConfig>,
    pub connectivity: Option<bool>,
    pub distances: Option<FileDistanceConfig>,
    #[serde(rename = "combined-edges")]
    pub combined_edges: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileColumnConfig {
    pub structure: Option<Vec<String>>,
    pub chemical: Option<Vec<String>>,
    pub residue: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub viewer: Option<FileViewerConfig>,
    pub network: Option<FileNetworkConfig>,
    pub columns: Option<FileColumnConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::parse_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn parse_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
