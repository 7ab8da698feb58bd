//! Builders for the command lines understood by the viewer's stdin reader.
//!
//! Every function returns a single command line without its trailing
//! newline; the gateway adds framing.

use crate::core::models::ids::ModelKey;
use crate::core::models::structure::ModelKind;

pub const STOP: &str = "stop really";
pub const FOCUS: &str = "focus";
pub const CLEAR_SELECTION: &str = "~sel";
pub const LIST_MODELS: &str = "listm type molecule";
pub const LIST_SELECTED_MODELS: &str = "lists level molecule";
pub const LIST_SELECTED_RESIDUES: &str = "lists level residue";
pub const LIST_PRESETS: &str = "preset list";
pub const ADD_HYDROGENS: &str = "addh hbond true";
pub const LIST_PHYSICAL_CHAINS: &str = "list physicalchains";

pub const LISTEN_START: &str = "listen start models; listen start select";
pub const LISTEN_STOP: &str = "listen stop models; listen stop select";

/// Which atoms an analysis step considers relative to the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionScope {
    /// Only interactions among selected atoms.
    #[default]
    WithinSelection,
    /// Interactions between selected atoms and everything else.
    BetweenSelectionAndOther,
    /// Interactions of selected atoms with all atoms.
    All,
}

pub fn listen(enable: bool) -> &'static str {
    if enable { LISTEN_START } else { LISTEN_STOP }
}

pub fn open(name: &str, kind: ModelKind) -> String {
    match kind {
        ModelKind::FileStructure => format!("open {name}"),
        ModelKind::DatabaseStructure => format!("open modbase:{name}"),
        ModelKind::SmallMolecule => format!("open smiles:{name}"),
    }
}

pub fn close(model: ModelKey) -> String {
    format!("close {model}")
}

pub fn model_color(model: ModelKey) -> String {
    format!("listm type molecule attr color spec {model}")
}

pub fn list_residues(model: ModelKey) -> String {
    format!("listr spec {model}")
}

/// Replaces the viewer's selection without echoing a selection notification
/// back. An empty expression clears the selection.
pub fn select(expression: &str) -> String {
    if expression.is_empty() {
        format!("listen stop select; {CLEAR_SELECTION}; listen start select")
    } else {
        format!("listen stop select; sel {expression}; listen start select")
    }
}

pub fn find_clashes(
    scope: InteractionScope,
    overlap_cutoff: f64,
    hbond_allowance: f64,
    bond_separation: u32,
) -> String {
    let test = match scope {
        InteractionScope::WithinSelection => "self",
        InteractionScope::BetweenSelectionAndOther => "other",
        InteractionScope::All => "model",
    };
    format!(
        "findclash sel makePseudobonds false log true namingStyle command \
         overlapCutoff {overlap_cutoff} hbondAllowance {hbond_allowance} \
         bondSeparation {bond_separation} test {test}"
    )
}

/// `relax` carries the distance and angle tolerances when enabled.
pub fn find_hbonds(scope: InteractionScope, relax: Option<(f64, f64)>) -> String {
    let (restrict, intramodel) = match scope {
        InteractionScope::WithinSelection => ("both", true),
        InteractionScope::BetweenSelectionAndOther => ("any", false),
        InteractionScope::All => ("any", true),
    };
    let mut command = format!(
        "findhbond selRestrict {restrict} intramodel {intramodel} intermodel true \
         makePseudobonds false log true namingStyle command"
    );
    if let Some((dist_slop, angle_slop)) = relax {
        command.push_str(&format!(
            " relax true distSlop {dist_slop} angleSlop {angle_slop}"
        ));
    }
    command
}

pub fn distance_matrix(scope: InteractionScope) -> &'static str {
    match scope {
        InteractionScope::WithinSelection => "list distmat @CA&sel",
        InteractionScope::BetweenSelectionAndOther => "list distmat @CA&sel|@CA",
        InteractionScope::All => "list distmat @CA",
    }
}
