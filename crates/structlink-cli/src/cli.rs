use clap::{Args, Parser, Subcommand, ValueEnum};
use structlink::core::models::structure::ModelKind;
use structlink::engine::config::InteractionScope;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "structlink CLI - Drive an external molecular viewer and derive residue interaction networks from its structural analyses.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open structures in the viewer and print their composition.
    Models(ModelsArgs),
    /// Derive a residue interaction network and write it as CSV tables.
    Network(NetworkArgs),
    /// List the viewer's depiction presets.
    Presets(PresetsArgs),
}

/// How the viewer is located and configured; shared by every subcommand.
#[derive(Args, Debug, Default, Clone)]
pub struct ViewerArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Viewer executable to try. Can be used multiple times; tried in order.
    #[arg(long = "viewer", value_name = "PATH")]
    pub viewer_paths: Vec<PathBuf>,

    /// Seconds to wait for each reply from the viewer.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S network.distances.cutoff=6.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `models` subcommand.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Structure to open (file path, identifier, or SMILES string).
    #[arg(short, long = "structure", required = true, value_name = "NAME")]
    pub structures: Vec<String>,

    /// How the structures are to be interpreted.
    #[arg(short, long, value_enum, default_value_t = KindArg::File)]
    pub kind: KindArg,

    #[command(flatten)]
    pub viewer: ViewerArgs,
}

/// Arguments for the `network` subcommand.
#[derive(Args, Debug)]
pub struct NetworkArgs {
    /// Structure to open (file path, identifier, or SMILES string).
    #[arg(short, long = "structure", required = true, value_name = "NAME")]
    pub structures: Vec<String>,

    /// How the structures are to be interpreted.
    #[arg(short, long, value_enum, default_value_t = KindArg::File)]
    pub kind: KindArg,

    /// Viewer selection expression for the seed residues.
    /// Defaults to every opened model.
    #[arg(long, value_name = "SPEC")]
    pub select: Option<String>,

    /// Output prefix; writes PREFIX.nodes.csv and PREFIX.edges.csv.
    #[arg(short, long, required = true, value_name = "PREFIX")]
    pub output: PathBuf,

    #[command(flatten)]
    pub overrides: NetworkOverrides,

    #[command(flatten)]
    pub viewer: ViewerArgs,
}

/// Command-line overrides of the `[network]` section.
#[derive(Args, Debug, Default, Clone)]
pub struct NetworkOverrides {
    /// Name of the derived network.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Which atoms the analyses consider relative to the selection.
    #[arg(long, value_enum)]
    pub scope: Option<ScopeArg>,

    /// Add hydrogens before searching for hydrogen bonds.
    #[arg(long)]
    pub add_hydrogens: bool,

    /// Keep water residues as network nodes.
    #[arg(long)]
    pub keep_water: bool,

    /// Do not derive contact edges.
    #[arg(long)]
    pub no_contacts: bool,

    /// Derive clash edges.
    #[arg(long)]
    pub clashes: bool,

    /// Derive hydrogen-bond edges.
    #[arg(long)]
    pub hbonds: bool,

    /// Derive backbone edges between sequence neighbors.
    #[arg(long)]
    pub connectivity: bool,

    /// Derive C-alpha distance edges.
    #[arg(long)]
    pub distances: bool,

    /// Distance cutoff in angstroms (0 keeps every pair). Implies --distances.
    #[arg(long, value_name = "ANGSTROM")]
    pub distance_cutoff: Option<f64>,

    /// Add one summary edge per connected residue pair.
    #[arg(long)]
    pub combined_edges: bool,
}

/// Arguments for the `presets` subcommand.
#[derive(Args, Debug)]
pub struct PresetsArgs {
    #[command(flatten)]
    pub viewer: ViewerArgs,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    /// A structure file or identifier the viewer fetches itself.
    File,
    /// A model from the comparative-modelling database.
    Database,
    /// A small molecule given as a SMILES string.
    Smiles,
}

impl From<KindArg> for ModelKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::File => ModelKind::FileStructure,
            KindArg::Database => ModelKind::DatabaseStructure,
            KindArg::Smiles => ModelKind::SmallMolecule,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeArg {
    /// Interactions among selected atoms only.
    Within,
    /// Interactions between selected atoms and all other atoms.
    Between,
    /// Interactions of selected atoms with all atoms.
    All,
}

impl From<ScopeArg> for InteractionScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Within => InteractionScope::WithinSelection,
            ScopeArg::Between => InteractionScope::BetweenSelectionAndOther,
            ScopeArg::All => InteractionScope::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn network_command_parses_flags_and_repeated_values() {
        let cli = Cli::try_parse_from([
            "structlink",
            "-vv",
            "network",
            "-s",
            "1tkk",
            "-s",
            "2xyz",
            "--hbonds",
            "--distance-cutoff",
            "6.5",
            "--scope",
            "between",
            "-S",
            "network.connectivity=true",
            "-o",
            "out/rin",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Network(args) = cli.command else {
            panic!("expected the network command");
        };
        assert_eq!(args.structures, vec!["1tkk", "2xyz"]);
        assert_eq!(args.kind, KindArg::File);
        assert!(args.overrides.hbonds);
        assert_eq!(args.overrides.distance_cutoff, Some(6.5));
        assert_eq!(args.overrides.scope, Some(ScopeArg::Between));
        assert_eq!(args.viewer.set_values, vec!["network.connectivity=true"]);
        assert_eq!(args.output, PathBuf::from("out/rin"));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["structlink", "-q", "-v", "presets"]);
        assert!(result.is_err());
    }

    #[test]
    fn network_requires_an_output_prefix() {
        let result = Cli::try_parse_from(["structlink", "network", "-s", "1tkk"]);
        assert!(result.is_err());
    }
}
