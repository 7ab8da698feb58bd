//! The derived residue interaction network: residue nodes joined by typed,
//! attributed edges.

use crate::core::models::object::ResidueRef;
use crate::core::models::residue::Residue;
use crate::core::utils::identifiers::interaction_part;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InteractionType {
    Contact,
    Clash,
    HBond,
    Distance,
    Backbone,
    Combi,
}

impl InteractionType {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionType::Contact => "contact",
            InteractionType::Clash => "clash",
            InteractionType::HBond => "hbond",
            InteractionType::Distance => "distance",
            InteractionType::Backbone => "backbone",
            InteractionType::Combi => "combi",
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResidueNode {
    pub name: String,         // "<structure>#<TYPE> <index>.<chain>"
    pub residue: ResidueRef,
    pub residue_attr: String, // "<structure>#<index>.<chain>"
    pub rinalyzer_id: String, // "<structure>:<chain>:<index>:_:<TYPE>"
    pub residue_type: String,
    pub chain: String,
    pub structure: String,
    pub smiles: Option<String>,
    pub seed: bool,
}

impl ResidueNode {
    fn new(residue: &Residue, structure: &str, seed: bool) -> Self {
        let located = if residue.chain.is_empty() {
            residue.index.clone()
        } else {
            format!("{}.{}", residue.index, residue.chain)
        };
        let chain_field = if residue.chain.is_empty() {
            "_"
        } else {
            residue.chain.as_str()
        };
        Self {
            name: format!("{structure}#{} {located}", residue.residue_type),
            residue: residue.reference(),
            residue_attr: format!("{structure}#{located}"),
            rinalyzer_id: format!(
                "{structure}:{chain_field}:{}:_:{}",
                residue.index, residue.residue_type
            ),
            residue_type: residue.residue_type.clone(),
            chain: residue.chain.clone(),
            structure: structure.to_string(),
            smiles: residue.small_molecule_code().map(str::to_string),
            seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionEdge {
    pub source: usize,
    pub target: usize,
    pub interaction: InteractionType,
    pub subtype: String,
    pub distance: Option<f64>,
    pub overlap: Option<f64>,
    pub interacting_atoms: Option<String>,
    pub interaction_count: Option<usize>,
}

/// Unordered node pair plus interaction type.
type EdgeKey = (usize, usize, InteractionType);

fn edge_key(a: usize, b: usize, interaction: InteractionType) -> EdgeKey {
    if a <= b {
        (a, b, interaction)
    } else {
        (b, a, interaction)
    }
}

/// `atom1`/`atom2` may be bare atom names or full atom specs (`:12.A@CA`).
fn subtype(interaction: InteractionType, atom1: &str, atom2: &str) -> String {
    let name = |atom: &str| atom.rsplit('@').next().unwrap_or(atom).to_string();
    format!(
        "{interaction} {}_{}",
        interaction_part(&name(atom1)),
        interaction_part(&name(atom2))
    )
}

#[derive(Debug, Clone, Default)]
pub struct InteractionNetwork {
    name: String,
    nodes: Vec<ResidueNode>,
    node_index: HashMap<String, usize>,
    edges: Vec<InteractionEdge>,
    edge_index: HashMap<EdgeKey, usize>,
}

impl InteractionNetwork {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[ResidueNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[InteractionEdge] {
        &self.edges
    }

    pub fn node(&self, index: usize) -> Option<&ResidueNode> {
        self.nodes.get(index)
    }

    /// Looks a node up by its name, e.g. `1tkk#MET 1.A`.
    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.node_index.get(name).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn find_edge(&self, a: usize, b: usize, interaction: InteractionType) -> Option<&InteractionEdge> {
        self.edge_index
            .get(&edge_key(a, b, interaction))
            .map(|&i| &self.edges[i])
    }

    /// Display name of an edge: `<source> (<type>) <target>`.
    pub fn edge_name(&self, edge: &InteractionEdge) -> String {
        let source = self.nodes.get(edge.source).map_or("", |n| n.name.as_str());
        let target = self.nodes.get(edge.target).map_or("", |n| n.name.as_str());
        format!("{source} ({}) {target}", edge.interaction)
    }

    /// Returns the node for `residue`, creating it on first use. Marking an
    /// existing node as a seed is sticky.
    ///
    /// Nodes are keyed by name, so the same residue of same-named sub-models
    /// (NMR ensembles opened from one file) is a single node; it keeps the
    /// reference of the first residue that created it.
    pub fn add_node(&mut self, residue: &Residue, structure: &str, seed: bool) -> usize {
        let node = ResidueNode::new(residue, structure, seed);
        if let Some(&index) = self.node_index.get(&node.name) {
            if seed {
                self.nodes[index].seed = true;
            }
            return index;
        }
        let index = self.nodes.len();
        self.node_index.insert(node.name.clone(), index);
        self.nodes.push(node);
        index
    }

    /// Records one atom-level interaction between two nodes, aggregating with
    /// any existing edge of the same type: the minimum distance and maximum
    /// overlap are kept, and the atoms of the closest row describe the edge.
    pub fn record_interaction(
        &mut self,
        a: usize,
        b: usize,
        interaction: InteractionType,
        atoms: (&str, &str),
        distance: f64,
        overlap: Option<f64>,
    ) {
        let key = edge_key(a, b, interaction);
        if let Some(&i) = self.edge_index.get(&key) {
            let edge = &mut self.edges[i];
            if edge.distance.is_none_or(|d| distance < d) {
                edge.distance = Some(distance);
                edge.interacting_atoms = Some(format!("{},{}", atoms.0, atoms.1));
                edge.subtype = subtype(interaction, atoms.0, atoms.1);
            }
            edge.overlap = match (edge.overlap, overlap) {
                (Some(x), Some(y)) => Some(x.max(y)),
                (x, y) => x.or(y),
            };
            return;
        }
        self.push_edge(InteractionEdge {
            source: a,
            target: b,
            interaction,
            subtype: subtype(interaction, atoms.0, atoms.1),
            distance: Some(distance),
            overlap,
            interacting_atoms: Some(format!("{},{}", atoms.0, atoms.1)),
            interaction_count: None,
        });
    }

    /// Turns an existing contact between the same two atoms into a hydrogen
    /// bond, dropping its overlap. Returns `false` when no such contact exists.
    pub fn merge_hbond_into_contact(
        &mut self,
        a: usize,
        b: usize,
        atoms: (&str, &str),
        distance: f64,
    ) -> bool {
        let contact_key = edge_key(a, b, InteractionType::Contact);
        let Some(&i) = self.edge_index.get(&contact_key) else {
            return false;
        };
        let forward = format!("{},{}", atoms.0, atoms.1);
        let backward = format!("{},{}", atoms.1, atoms.0);
        let same_atoms = self.edges[i]
            .interacting_atoms
            .as_deref()
            .is_some_and(|existing| existing == forward || existing == backward);
        if !same_atoms {
            return false;
        }
        let hbond_key = edge_key(a, b, InteractionType::HBond);
        if self.edge_index.contains_key(&hbond_key) {
            return false;
        }

        self.edge_index.remove(&contact_key);
        let edge = &mut self.edges[i];
        edge.interaction = InteractionType::HBond;
        edge.subtype = subtype(InteractionType::HBond, atoms.0, atoms.1);
        edge.overlap = None;
        edge.distance = Some(distance);
        self.edge_index.insert(hbond_key, i);
        true
    }

    pub fn add_backbone_edge(&mut self, a: usize, b: usize) {
        let key = edge_key(a, b, InteractionType::Backbone);
        if self.edge_index.contains_key(&key) {
            return;
        }
        self.push_edge(InteractionEdge {
            source: a,
            target: b,
            interaction: InteractionType::Backbone,
            subtype: InteractionType::Backbone.as_str().to_string(),
            distance: None,
            overlap: None,
            interacting_atoms: None,
            interaction_count: None,
        });
    }

    /// Adds one summary edge per connected node pair, counting its
    /// interactions and carrying the shortest distance among them.
    pub fn add_combined_edges(&mut self) {
        let mut summary: BTreeMap<(usize, usize), (usize, Option<f64>)> = BTreeMap::new();
        for edge in self
            .edges
            .iter()
            .filter(|e| e.interaction != InteractionType::Combi)
        {
            let (a, b, _) = edge_key(edge.source, edge.target, edge.interaction);
            let entry = summary.entry((a, b)).or_insert((0, None));
            entry.0 += 1;
            entry.1 = match (entry.1, edge.distance) {
                (Some(x), Some(y)) => Some(x.min(y)),
                (x, y) => x.or(y),
            };
        }
        for ((a, b), (count, distance)) in summary {
            let key = edge_key(a, b, InteractionType::Combi);
            if let Some(&i) = self.edge_index.get(&key) {
                self.edges[i].interaction_count = Some(count);
                self.edges[i].distance = distance;
                continue;
            }
            self.push_edge(InteractionEdge {
                source: a,
                target: b,
                interaction: InteractionType::Combi,
                subtype: "combi all_all".to_string(),
                distance,
                overlap: None,
                interacting_atoms: None,
                interaction_count: Some(count),
            });
        }
    }

    fn push_edge(&mut self, edge: InteractionEdge) {
        let key = edge_key(edge.source, edge.target, edge.interaction);
        self.edge_index.insert(key, self.edges.len());
        self.edges.push(edge);
    }
}
