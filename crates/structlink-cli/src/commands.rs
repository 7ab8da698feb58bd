pub mod models;
pub mod network;
pub mod presets;

use crate::config::AppConfig;
use crate::error::{CliError, Result};
use structlink::core::models::ids::ModelKey;
use structlink::core::models::structure::ModelKind;
use structlink::engine::session::Session;
use tracing::{info, warn};

/// Launches the viewer described by `config` in a fresh session.
fn launch(config: &AppConfig) -> Result<Session> {
    let mut session = Session::new(config.columns.clone());
    info!(
        candidates = config.gateway.candidate_paths.len(),
        "Launching the viewer..."
    );
    session.launch(&config.gateway)?;
    Ok(session)
}

/// Opens every named structure. A name that yields no model is only a
/// warning, unless none of them does.
fn open_all(session: &mut Session, names: &[String], kind: ModelKind) -> Result<Vec<ModelKey>> {
    let mut opened = Vec::new();
    for name in names {
        let keys = session.open_structure(name, kind)?;
        if keys.is_empty() {
            warn!(name = name.as_str(), "Viewer opened no new model");
        } else {
            info!(name = name.as_str(), models = keys.len(), "Opened structure");
            opened.extend(keys);
        }
    }
    require_models(opened, names)
}

fn require_models(opened: Vec<ModelKey>, names: &[String]) -> Result<Vec<ModelKey>> {
    if opened.is_empty() {
        return Err(CliError::NothingOpened {
            names: names.join(", "),
        });
    }
    Ok(opened)
}
