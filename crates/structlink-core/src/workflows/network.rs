use crate::core::io::analysis::{
    parse_chain_ranges, parse_contacts, parse_distances, parse_hbonds,
};
use crate::core::io::commands;
use crate::core::io::records::{parse_atom_spec, parse_residue_line};
use crate::core::models::object::{ResidueRef, Structural};
use crate::core::models::residue::Residue;
use crate::core::network::{InteractionNetwork, InteractionType};
use crate::engine::config::{ContactSettings, HBondSettings, NetworkConfig};
use crate::engine::error::EngineError;
use crate::engine::gateway::Gateway;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::registry::Registry;
use crate::engine::session::Session;
use tracing::{debug, info, instrument, warn};

/// Derives a residue interaction network from the viewer's current selection.
///
/// Every enabled analysis runs as its own phase. A phase whose reply is
/// unusable (no header, or no reply in time) is reported as skipped and
/// contributes nothing; the remaining phases still run. Loss of the viewer
/// aborts the whole workflow.
#[instrument(skip_all, name = "network_workflow")]
pub fn run(
    session: &Session,
    config: &NetworkConfig,
    reporter: &ProgressReporter,
) -> Result<InteractionNetwork, EngineError> {
    let gateway = session.gateway()?;
    let registry = session.registry();
    let _guard = gateway.listen_guard()?;

    // === Phase 0: Seed nodes from the selected residues ===
    reporter.report(Progress::PhaseStart { name: "Seeding" });
    let resolver = NodeResolver {
        registry,
        ignore_water: config.ignore_water,
    };
    let seeds = selected_residues(gateway, registry)?;
    let name = config
        .name
        .clone()
        .unwrap_or_else(|| default_name(registry, &seeds));
    let mut network = InteractionNetwork::new(name);
    reporter.report(Progress::ResiduesStart {
        total: seeds.len() as u64,
    });
    for reference in &seeds {
        resolver.add(&mut network, reference, true);
        reporter.report(Progress::ResidueResolved);
    }
    reporter.report(Progress::ResiduesFinish);
    info!(
        seeds = network.node_count(),
        "Seeded network from the current selection."
    );
    reporter.phase_done(0);

    if config.add_hydrogens {
        reporter.report(Progress::PhaseStart {
            name: "Adding Hydrogens",
        });
        gateway.send_command(commands::ADD_HYDROGENS, false)?;
        reporter.phase_done(0);
    }

    // === Phase 1: Atom-level interactions ===
    if let Some(settings) = config.contacts {
        run_phase(reporter, "Contacts", &mut network, |network| {
            add_contacts(gateway, &resolver, network, config, settings, InteractionType::Contact)
        })?;
    }
    if let Some(settings) = config.clashes {
        run_phase(reporter, "Clashes", &mut network, |network| {
            add_contacts(gateway, &resolver, network, config, settings, InteractionType::Clash)
        })?;
    }
    if let Some(settings) = config.hbonds {
        run_phase(reporter, "Hydrogen Bonds", &mut network, |network| {
            add_hbonds(gateway, &resolver, network, config, settings)
        })?;
    }

    // === Phase 2: Residue-level relations ===
    if config.connectivity {
        run_phase(reporter, "Connectivity", &mut network, |network| {
            add_connectivity(gateway, network)
        })?;
    }
    if let Some(cutoff) = config.distance_cutoff {
        run_phase(reporter, "Distances", &mut network, |network| {
            add_distances(gateway, &resolver, network, config, cutoff)
        })?;
    }

    // === Phase 3: Summary edges ===
    if config.combined_edges {
        reporter.report(Progress::PhaseStart {
            name: "Combined Edges",
        });
        let before = network.edge_count();
        network.add_combined_edges();
        reporter.phase_done(network.edge_count() - before);
    }

    info!(
        nodes = network.node_count(),
        edges = network.edge_count(),
        "Workflow complete. Network '{}' derived.",
        network.name()
    );
    Ok(network)
}

fn run_phase(
    reporter: &ProgressReporter,
    name: &'static str,
    network: &mut InteractionNetwork,
    phase: impl FnOnce(&mut InteractionNetwork) -> Result<(), EngineError>,
) -> Result<(), EngineError> {
    reporter.report(Progress::PhaseStart { name });
    let before = network.edge_count();
    match phase(network) {
        Ok(()) => {
            let edges = network.edge_count() - before;
            info!(phase = name, edges, "Phase finished.");
            reporter.phase_done(edges);
            Ok(())
        }
        Err(EngineError::Parse(e)) => {
            warn!(phase = name, error = %e, "Skipping phase with unusable reply");
            reporter.report(Progress::PhaseSkipped {
                name,
                reason: e.to_string(),
            });
            Ok(())
        }
        Err(EngineError::Gateway(e)) if !e.is_fatal() => {
            warn!(phase = name, error = %e, "Skipping phase without reply");
            reporter.report(Progress::PhaseSkipped {
                name,
                reason: e.to_string(),
            });
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Turns atom specs from analysis replies into network nodes, using the
/// registry for residue types and structure names.
struct NodeResolver<'a> {
    registry: &'a Registry,
    ignore_water: bool,
}

impl NodeResolver<'_> {
    fn residue(&self, reference: &ResidueRef) -> Option<(&Residue, &str)> {
        let model = self.registry.get(reference.model)?;
        let residue = model.residue_by_ref(reference)?;
        Some((residue, model.name.as_str()))
    }

    fn add(&self, network: &mut InteractionNetwork, reference: &ResidueRef, seed: bool) -> Option<usize> {
        let Some((residue, structure)) = self.residue(reference) else {
            debug!(residue = %reference.spec(), "Residue is not in the registry");
            return None;
        };
        if self.ignore_water && residue.is_water() {
            return None;
        }
        Some(network.add_node(residue, structure, seed || residue.is_selected()))
    }

    fn node(&self, network: &mut InteractionNetwork, atom: &str) -> Option<usize> {
        let spec = match parse_atom_spec(atom) {
            Ok(spec) => spec,
            Err(e) => {
                debug!(atom, error = %e, "Skipping unreadable atom spec");
                return None;
            }
        };
        let model = spec.model.or_else(|| self.registry.default_model())?;
        self.add(network, &spec.residue_ref(model), false)
    }

    fn pair(&self, network: &mut InteractionNetwork, a: &str, b: &str) -> Option<(usize, usize)> {
        let source = self.node(network, a)?;
        let target = self.node(network, b)?;
        Some((source, target))
    }
}

fn selected_residues(gateway: &Gateway, registry: &Registry) -> Result<Vec<ResidueRef>, EngineError> {
    let reply = gateway.send_command(commands::LIST_SELECTED_RESIDUES, true)?;
    let mut seeds = Vec::new();
    for line in reply.iter().filter(|l| l.trim_start().starts_with("residue id")) {
        match parse_residue_line(line) {
            Ok(record) => {
                if let Some(model) = record.spec.model.or_else(|| registry.default_model()) {
                    seeds.push(record.reference(model));
                }
            }
            Err(e) => warn!(error = %e, "Skipping selected residue record"),
        }
    }
    Ok(seeds)
}

/// `RIN` followed by the names of the structures the selection touches.
fn default_name(registry: &Registry, seeds: &[ResidueRef]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for reference in seeds {
        if let Some(model) = registry.get(reference.model) {
            if !names.contains(&model.name.as_str()) {
                names.push(model.name.as_str());
            }
        }
    }
    if names.is_empty() {
        "RIN".to_string()
    } else {
        format!("RIN {}", names.join(" "))
    }
}

fn add_contacts(
    gateway: &Gateway,
    resolver: &NodeResolver,
    network: &mut InteractionNetwork,
    config: &NetworkConfig,
    settings: ContactSettings,
    interaction: InteractionType,
) -> Result<(), EngineError> {
    let command = commands::find_clashes(
        config.scope,
        settings.overlap_cutoff,
        settings.hbond_allowance,
        settings.bond_separation,
    );
    let reply = gateway.send_command(&command, true)?;
    for record in parse_contacts(&reply)? {
        let Some((a, b)) = resolver.pair(network, &record.atom1, &record.atom2) else {
            continue;
        };
        network.record_interaction(
            a,
            b,
            interaction,
            (&record.atom1, &record.atom2),
            record.distance,
            Some(record.overlap),
        );
    }
    Ok(())
}

fn add_hbonds(
    gateway: &Gateway,
    resolver: &NodeResolver,
    network: &mut InteractionNetwork,
    config: &NetworkConfig,
    settings: HBondSettings,
) -> Result<(), EngineError> {
    let relax = settings
        .relax
        .then_some((settings.distance_slop, settings.angle_slop));
    let reply = gateway.send_command(&commands::find_hbonds(config.scope, relax), true)?;
    for record in parse_hbonds(&reply, config.add_hydrogens)? {
        let Some((a, b)) = resolver.pair(network, &record.donor, &record.acceptor) else {
            continue;
        };
        let atoms = (record.donor.as_str(), record.acceptor.as_str());
        if settings.remove_redundant && network.merge_hbond_into_contact(a, b, atoms, record.distance) {
            continue;
        }
        network.record_interaction(a, b, InteractionType::HBond, atoms, record.distance, None);
    }
    Ok(())
}

/// Backbone edges join residues already in the network that are sequence
/// neighbors within one physically connected stretch.
fn add_connectivity(gateway: &Gateway, network: &mut InteractionNetwork) -> Result<(), EngineError> {
    let reply = gateway.send_command(commands::LIST_PHYSICAL_CHAINS, true)?;
    let ranges = parse_chain_ranges(&reply)?;
    let residues: Vec<ResidueRef> = network.nodes().iter().map(|n| n.residue.clone()).collect();
    for (i, a) in residues.iter().enumerate() {
        for (j, b) in residues.iter().enumerate().skip(i + 1) {
            if ranges.iter().any(|range| range.links(a, b)) {
                network.add_backbone_edge(i, j);
            }
        }
    }
    Ok(())
}

fn add_distances(
    gateway: &Gateway,
    resolver: &NodeResolver,
    network: &mut InteractionNetwork,
    config: &NetworkConfig,
    cutoff: f64,
) -> Result<(), EngineError> {
    let reply = gateway.send_command(commands::distance_matrix(config.scope), true)?;
    for record in parse_distances(&reply, cutoff)? {
        let Some((a, b)) = resolver.pair(network, &record.atom1, &record.atom2) else {
            continue;
        };
        network.record_interaction(
            a,
            b,
            InteractionType::Distance,
            (&record.atom1, &record.atom2),
            record.distance,
            None,
        );
    }
    Ok(())
}
