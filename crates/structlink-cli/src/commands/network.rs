use super::{launch, open_all};
use crate::cli::NetworkArgs;
use crate::config::{AppConfig, build_config};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use std::path::Path;
use structlink::core::io::export::write_network;
use structlink::core::models::ids::ModelKey;
use structlink::core::network::InteractionNetwork;
use structlink::engine::error::EngineError;
use structlink::engine::host::MemoryHost;
use structlink::engine::progress::ProgressReporter;
use structlink::engine::session::Session;
use structlink::workflows;
use tracing::{info, warn};

pub fn run(args: NetworkArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = build_config(&args.viewer, &args.overrides)?;
    let mut session = launch(&config)?;

    let result = derive(&mut session, &args, &config);
    session.shutdown();
    let network = result?;

    if network.node_count() == 0 {
        warn!("Workflow completed but the selection produced no residues.");
        println!("Warning: the selection contained no residues; the network is empty.");
    }

    info!(prefix = ?args.output, "Writing network tables...");
    write_network(&network, &args.output)?;
    println!(
        "✓ Network '{}' ({} nodes, {} edges) written to: {}",
        network.name(),
        network.node_count(),
        network.edge_count(),
        tables_label(&args.output)
    );
    Ok(())
}

fn derive(session: &mut Session, args: &NetworkArgs, config: &AppConfig) -> Result<InteractionNetwork> {
    let opened = open_all(session, &args.structures, args.kind.into())?;

    let expression = args
        .select
        .clone()
        .unwrap_or_else(|| selection_of(&opened));
    info!(expression = expression.as_str(), "Selecting seed residues");
    session
        .gateway()?
        .select(&expression)
        .map_err(EngineError::from)?;

    let mut host = MemoryHost::new();
    session.reconcile_external_selection(&mut host)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Deriving residue interaction network...");
    let network = workflows::network::run(session, &config.network, &reporter)?;

    let registered = session.register_network(&mut host, &network);
    session.reconcile_external_selection(&mut host)?;
    info!(
        network = %registered.id,
        selected_nodes = host.selected_objects().len(),
        "Network registered with the host graph."
    );

    if network.edge_count() == 0 && network.node_count() > 0 {
        warn!("No interactions were found between the selected residues.");
    }
    Ok(network)
}

/// A selection expression covering every opened model.
fn selection_of(models: &[ModelKey]) -> String {
    models
        .iter()
        .map(ModelKey::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

fn tables_label(prefix: &Path) -> String {
    let prefix = prefix.display();
    format!("{prefix}.nodes.csv, {prefix}.edges.csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_selection_covers_every_model() {
        let models = [ModelKey::new(0, 0), ModelKey::new(1, 2)];
        assert_eq!(selection_of(&models), "#0 | #1.2");
        assert_eq!(selection_of(&models[..1]), "#0");
    }

    #[test]
    fn tables_label_names_both_files() {
        assert_eq!(
            tables_label(&PathBuf::from("out/rin")),
            "out/rin.nodes.csv, out/rin.edges.csv"
        );
    }
}
