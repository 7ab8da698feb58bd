use super::chain::Chain;
use super::ids::{ChainId, HostObjectId, ModelKey, NetworkId, ResidueId};
use super::object::{ResidueRef, StructuralObject, compare_residue_indices};
use super::residue::Residue;
use slotmap::SlotMap;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How a model was obtained, which decides the open command and whether
/// residue composition is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// A structure file or PDB identifier.
    FileStructure,
    /// A model fetched from a structure database.
    DatabaseStructure,
    /// A small molecule built from a chemical formula (SMILES).
    SmallMolecule,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown model kind: '{0}'")]
pub struct ParseModelKindError(pub String);

impl FromStr for ModelKind {
    type Err = ParseModelKindError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" | "pdb" | "structure" => Ok(ModelKind::FileStructure),
            "database" | "modbase" => Ok(ModelKind::DatabaseStructure),
            "smiles" | "small-molecule" => Ok(ModelKind::SmallMolecule),
            _ => Err(ParseModelKindError(s.to_string())),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ModelKind::FileStructure => "file",
                ModelKind::DatabaseStructure => "database",
                ModelKind::SmallMolecule => "smiles",
            }
        )
    }
}

/// Display color of a model, with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3},{:.3},{:.3}", self.red, self.green, self.blue)
    }
}

/// A model open in the external viewer, with its chain and residue composition.
///
/// Chains and residues live in slot-map arenas owned by the model, with lookup
/// maps from their viewer identifiers. Dropping a model therefore drops its
/// whole composition.
#[derive(Debug, Clone)]
pub struct StructuralModel {
    key: ModelKey,
    pub name: String,
    pub kind: ModelKind,
    pub color: Option<Color>,
    pub(crate) selected: bool,
    chains: SlotMap<ChainId, Chain>,
    residues: SlotMap<ResidueId, Residue>,
    chain_order: Vec<ChainId>,
    chain_id_map: HashMap<String, ChainId>,
    residue_id_map: HashMap<(String, String), ResidueId>,
    host_objects: BTreeMap<HostObjectId, NetworkId>,
    functional_residues: Vec<ResidueRef>,
}

impl StructuralModel {
    pub fn new(key: ModelKey, name: &str, kind: ModelKind) -> Self {
        Self {
            key,
            name: name.to_string(),
            kind,
            color: None,
            selected: false,
            chains: SlotMap::with_key(),
            residues: SlotMap::with_key(),
            chain_order: Vec::new(),
            chain_id_map: HashMap::new(),
            residue_id_map: HashMap::new(),
            host_objects: BTreeMap::new(),
            functional_residues: Vec::new(),
        }
    }

    pub fn key(&self) -> ModelKey {
        self.key
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    /// Chains in the order they were first reported.
    pub fn chains_iter(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chain_order
            .iter()
            .filter_map(|&id| self.chains.get(id).map(|c| (id, c)))
    }

    pub fn residues_iter(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.residues.iter()
    }

    pub fn chain_residues(&self, id: ChainId) -> impl Iterator<Item = &Residue> {
        self.chains
            .get(id)
            .map(|c| c.residues.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|&rid| self.residues.get(rid))
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn find_chain(&self, chain: &str) -> Option<ChainId> {
        self.chain_id_map.get(chain).copied()
    }

    pub fn find_residue(&self, chain: &str, index: &str) -> Option<ResidueId> {
        self.residue_id_map
            .get(&(chain.to_string(), index.to_string()))
            .copied()
    }

    pub fn residue_by_ref(&self, reference: &ResidueRef) -> Option<&Residue> {
        if reference.model != self.key {
            return None;
        }
        self.find_residue(&reference.chain, &reference.index)
            .and_then(|id| self.residues.get(id))
    }

    /// Adds a chain or returns the existing one with the same identifier.
    pub fn add_chain(&mut self, chain: &str) -> ChainId {
        if let Some(&id) = self.chain_id_map.get(chain) {
            return id;
        }
        let id = self.chains.insert(Chain::new(self.key, chain));
        self.chain_id_map.insert(chain.to_string(), id);
        self.chain_order.push(id);
        id
    }

    /// Adds a residue (creating its chain on demand) or returns the existing one.
    ///
    /// A residue already present keeps its recorded type.
    pub fn add_residue(&mut self, chain: &str, index: &str, residue_type: &str) -> ResidueId {
        let key = (chain.to_string(), index.to_string());
        if let Some(&id) = self.residue_id_map.get(&key) {
            return id;
        }
        let chain_id = self.add_chain(chain);
        let id = self.residues.insert(Residue::new(
            self.key,
            chain,
            index,
            residue_type,
            Some(chain_id),
        ));
        self.residue_id_map.insert(key, id);
        if let Some(c) = self.chains.get_mut(chain_id) {
            c.residues.push(id);
        }
        id
    }

    pub fn remove_residue(&mut self, id: ResidueId) -> Option<Residue> {
        let residue = self.residues.remove(id)?;
        self.residue_id_map
            .remove(&(residue.chain.clone(), residue.index.clone()));
        if let Some(chain) = residue.chain_id.and_then(|cid| self.chains.get_mut(cid)) {
            chain.residues.retain(|&rid| rid != id);
        }
        Some(residue)
    }

    /// Drops every chain and residue, keeping identity, bindings and annotations.
    pub fn clear_composition(&mut self) {
        self.chains.clear();
        self.residues.clear();
        self.chain_order.clear();
        self.chain_id_map.clear();
        self.residue_id_map.clear();
    }

    /// Sorts each chain's residues by numeric index.
    pub fn sort_residues(&mut self) {
        let residues = &self.residues;
        for (_, chain) in self.chains.iter_mut() {
            chain.residues.sort_by(|&a, &b| match (residues.get(a), residues.get(b)) {
                (Some(x), Some(y)) => compare_residue_indices(&x.index, &y.index),
                _ => std::cmp::Ordering::Equal,
            });
        }
    }

    pub fn selected_residues(&self) -> impl Iterator<Item = &Residue> {
        self.residues.values().filter(|r| r.selected)
    }

    pub fn has_selected_children(&self) -> bool {
        self.chains.values().any(|c| c.selected) || self.residues.values().any(|r| r.selected)
    }

    /// Whether the object is flagged as selected. Objects outside this model,
    /// or unknown to it, report `false`.
    pub fn is_object_selected(&self, object: &StructuralObject) -> bool {
        match object {
            StructuralObject::Model(key) => *key == self.key && self.selected,
            StructuralObject::Chain(c) if c.model == self.key => self
                .find_chain(&c.chain)
                .and_then(|id| self.chains.get(id))
                .is_some_and(|c| c.selected),
            StructuralObject::Residue(r) => self.residue_by_ref(r).is_some_and(|r| r.selected),
            _ => false,
        }
    }

    /// Sets the selection flag of the object, returning `false` if the object
    /// does not exist in this model.
    pub(crate) fn set_object_selected(&mut self, object: &StructuralObject, selected: bool) -> bool {
        match object {
            StructuralObject::Model(key) if *key == self.key => {
                self.selected = selected;
                true
            }
            StructuralObject::Chain(c) if c.model == self.key => {
                match self.find_chain(&c.chain).and_then(|id| self.chains.get_mut(id)) {
                    Some(chain) => {
                        chain.selected = selected;
                        true
                    }
                    None => false,
                }
            }
            StructuralObject::Residue(r) if r.model == self.key => {
                match self
                    .find_residue(&r.chain, &r.index)
                    .and_then(|id| self.residues.get_mut(id))
                {
                    Some(residue) => {
                        residue.selected = selected;
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    pub(crate) fn clear_selection_flags(&mut self) {
        self.selected = false;
        for chain in self.chains.values_mut() {
            chain.selected = false;
        }
        for residue in self.residues.values_mut() {
            residue.selected = false;
        }
    }

    pub fn host_objects(&self) -> &BTreeMap<HostObjectId, NetworkId> {
        &self.host_objects
    }

    pub(crate) fn add_host_object(&mut self, host: HostObjectId, network: NetworkId) {
        self.host_objects.insert(host, network);
    }

    pub(crate) fn remove_host_object(&mut self, host: HostObjectId) {
        self.host_objects.remove(&host);
    }

    pub(crate) fn remove_network(&mut self, network: NetworkId) {
        self.host_objects.retain(|_, n| *n != network);
    }

    pub(crate) fn take_host_objects(&mut self) -> BTreeMap<HostObjectId, NetworkId> {
        std::mem::take(&mut self.host_objects)
    }

    pub fn functional_residues(&self) -> &[ResidueRef] {
        &self.functional_residues
    }

    pub(crate) fn set_functional_residues(&mut self, residues: Vec<ResidueRef>) {
        self.functional_residues = residues;
    }
}
