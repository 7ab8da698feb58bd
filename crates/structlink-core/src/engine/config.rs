use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub use crate::core::io::commands::InteractionScope;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub const DEFAULT_LAUNCH_ARGS: [&str; 2] = ["--start", "ReadStdin"];
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(120);

/// Where the viewer executable is usually installed on this platform.
pub fn default_candidate_paths() -> Vec<PathBuf> {
    let paths: &[&str] = if cfg!(target_os = "windows") {
        &[
            "\\Program Files\\Chimera\\bin\\chimera",
            "C:\\Program Files\\Chimera\\bin\\chimera.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &["/Applications/Chimera.app/Contents/MacOS/chimera"]
    } else {
        &[
            "/usr/local/chimera/bin/chimera",
            "/usr/local/bin/chimera",
            "/usr/bin/chimera",
        ]
    };
    paths.iter().map(PathBuf::from).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub candidate_paths: Vec<PathBuf>,
    pub launch_args: Vec<String>,
    pub reply_timeout: Duration,
}

#[derive(Default)]
pub struct GatewayConfigBuilder {
    candidate_paths: Option<Vec<PathBuf>>,
    launch_args: Option<Vec<String>>,
    reply_timeout: Option<Duration>,
}

impl GatewayConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidate_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.candidate_paths = Some(paths);
        self
    }
    pub fn launch_args(mut self, args: Vec<String>) -> Self {
        self.launch_args = Some(args);
        self
    }
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<GatewayConfig, ConfigError> {
        let candidate_paths = self
            .candidate_paths
            .ok_or(ConfigError::MissingParameter("candidate_paths"))?;
        if candidate_paths.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "candidate_paths",
                reason: "at least one path is required".to_string(),
            });
        }
        let reply_timeout = self.reply_timeout.unwrap_or(DEFAULT_REPLY_TIMEOUT);
        if reply_timeout.is_zero() {
            return Err(ConfigError::InvalidParameter {
                name: "reply_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(GatewayConfig {
            candidate_paths,
            launch_args: self
                .launch_args
                .unwrap_or_else(|| DEFAULT_LAUNCH_ARGS.iter().map(|s| s.to_string()).collect()),
            reply_timeout,
        })
    }
}

/// Thresholds of a contact or clash search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSettings {
    pub overlap_cutoff: f64,
    pub hbond_allowance: f64,
    pub bond_separation: u32,
}

impl ContactSettings {
    pub const CONTACTS: ContactSettings = ContactSettings {
        overlap_cutoff: -0.4,
        hbond_allowance: 0.0,
        bond_separation: 4,
    };
    pub const CLASHES: ContactSettings = ContactSettings {
        overlap_cutoff: 0.6,
        hbond_allowance: 0.4,
        bond_separation: 4,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HBondSettings {
    /// Fold a hydrogen bond into an existing contact between the same atoms.
    pub remove_redundant: bool,
    pub relax: bool,
    pub distance_slop: f64,
    pub angle_slop: f64,
}

impl Default for HBondSettings {
    fn default() -> Self {
        Self {
            remove_redundant: true,
            relax: false,
            distance_slop: 0.4,
            angle_slop: 20.0,
        }
    }
}

pub const DEFAULT_DISTANCE_CUTOFF: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub name: Option<String>,
    pub scope: InteractionScope,
    pub add_hydrogens: bool,
    pub ignore_water: bool,
    pub contacts: Option<ContactSettings>,
    pub clashes: Option<ContactSettings>,
    pub hbonds: Option<HBondSettings>,
    pub connectivity: bool,
    pub distance_cutoff: Option<f64>,
    pub combined_edges: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: None,
            scope: InteractionScope::WithinSelection,
            add_hydrogens: false,
            ignore_water: true,
            contacts: Some(ContactSettings::CONTACTS),
            clashes: None,
            hbonds: None,
            connectivity: false,
            distance_cutoff: None,
            combined_edges: false,
        }
    }
}

/// Starts from [`NetworkConfig::default`]; every setter overrides one field.
#[derive(Default)]
pub struct NetworkConfigBuilder {
    config: NetworkConfig,
}

impl NetworkConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }
    pub fn scope(mut self, scope: InteractionScope) -> Self {
        self.config.scope = scope;
        self
    }
    pub fn add_hydrogens(mut self, enable: bool) -> Self {
        self.config.add_hydrogens = enable;
        self
    }
    pub fn ignore_water(mut self, enable: bool) -> Self {
        self.config.ignore_water = enable;
        self
    }
    pub fn contacts(mut self, settings: Option<ContactSettings>) -> Self {
        self.config.contacts = settings;
        self
    }
    pub fn clashes(mut self, settings: Option<ContactSettings>) -> Self {
        self.config.clashes = settings;
        self
    }
    pub fn hbonds(mut self, settings: Option<HBondSettings>) -> Self {
        self.config.hbonds = settings;
        self
    }
    pub fn connectivity(mut self, enable: bool) -> Self {
        self.config.connectivity = enable;
        self
    }
    pub fn distance_cutoff(mut self, cutoff: Option<f64>) -> Self {
        self.config.distance_cutoff = cutoff;
        self
    }
    pub fn combined_edges(mut self, enable: bool) -> Self {
        self.config.combined_edges = enable;
        self
    }

    pub fn build(self) -> Result<NetworkConfig, ConfigError> {
        if let Some(cutoff) = self.config.distance_cutoff {
            if !cutoff.is_finite() || cutoff < 0.0 {
                return Err(ConfigError::InvalidParameter {
                    name: "distance_cutoff",
                    reason: format!("{cutoff} is not a non-negative distance"),
                });
            }
        }
        if let Some(hbonds) = self.config.hbonds {
            if hbonds.distance_slop < 0.0 || hbonds.angle_slop < 0.0 {
                return Err(ConfigError::InvalidParameter {
                    name: "hbonds",
                    reason: "tolerances must be non-negative".to_string(),
                });
            }
        }
        Ok(self.config)
    }
}

/// Host attribute columns consulted when opening structures for host objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConfig {
    pub structure_columns: Vec<String>,
    pub chemical_columns: Vec<String>,
    pub residue_columns: Vec<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            structure_columns: owned(&[
                "Structure",
                "pdb",
                "pdbFileName",
                "PDB ID",
                "structure",
                "biopax.xref.PDB",
                "pdb_ids",
            ]),
            chemical_columns: owned(&["Smiles", "smiles", "SMILES"]),
            residue_columns: owned(&["FunctionalResidues", "ResidueList", "Residues"]),
        }
    }
}
