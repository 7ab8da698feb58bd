//! Tabular export of interaction networks: one CSV file of nodes and one of
//! edges, keyed by node name.

use crate::core::network::InteractionNetwork;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct NodeRow<'a> {
    name: &'a str,
    structure: &'a str,
    chain: &'a str,
    residue_type: &'a str,
    residue: &'a str,
    rinalyzer_id: &'a str,
    seed: bool,
    smiles: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct EdgeRow<'a> {
    name: String,
    source: &'a str,
    target: &'a str,
    interaction: &'static str,
    subtype: &'a str,
    distance: Option<f64>,
    overlap: Option<f64>,
    interacting_atoms: Option<&'a str>,
    interaction_count: Option<usize>,
}

pub fn write_nodes<W: Write>(network: &InteractionNetwork, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for node in network.nodes() {
        csv_writer.serialize(NodeRow {
            name: &node.name,
            structure: &node.structure,
            chain: &node.chain,
            residue_type: &node.residue_type,
            residue: &node.residue_attr,
            rinalyzer_id: &node.rinalyzer_id,
            seed: node.seed,
            smiles: node.smiles.as_deref(),
        })?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_edges<W: Write>(network: &InteractionNetwork, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for edge in network.edges() {
        let endpoint = |i: usize| network.node(i).map_or("", |n| n.name.as_str());
        csv_writer.serialize(EdgeRow {
            name: network.edge_name(edge),
            source: endpoint(edge.source),
            target: endpoint(edge.target),
            interaction: edge.interaction.as_str(),
            subtype: &edge.subtype,
            distance: edge.distance,
            overlap: edge.overlap,
            interacting_atoms: edge.interacting_atoms.as_deref(),
            interaction_count: edge.interaction_count,
        })?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes `<prefix>.nodes.csv` and `<prefix>.edges.csv`.
pub fn write_network(network: &InteractionNetwork, prefix: &Path) -> Result<(), ExportError> {
    let with_suffix = |suffix: &str| {
        let mut name = prefix.as_os_str().to_os_string();
        name.push(suffix);
        std::path::PathBuf::from(name)
    };
    let create = |path: &Path| {
        std::fs::File::create(path).map_err(|e| ExportError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    };

    let nodes_path = with_suffix(".nodes.csv");
    write_nodes(network, create(&nodes_path)?)?;
    let edges_path = with_suffix(".edges.csv");
    write_edges(network, create(&edges_path)?)?;
    Ok(())
}
