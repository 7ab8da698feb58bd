//! The boundary to the host network-analysis application.
//!
//! The engine never touches host graph primitives directly. It sees host
//! nodes, edges and networks as opaque identities, reads their attributes,
//! and pushes selection changes back through [`HostGraph`].

use crate::core::models::ids::{HostObjectId, NetworkId};
use crate::core::network::InteractionNetwork;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Which side a selection change originated from. Changes the engine pushes
/// into the host are tagged `External` so they are not echoed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Host,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEvent {
    pub origin: Origin,
    pub changes: BTreeMap<HostObjectId, bool>,
}

impl SelectionEvent {
    pub fn from_host(changes: impl IntoIterator<Item = (HostObjectId, bool)>) -> Self {
        Self {
            origin: Origin::Host,
            changes: changes.into_iter().collect(),
        }
    }
}

/// A host attribute cell: a comma-delimited scalar or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    List(Vec<String>),
}

impl AttributeValue {
    /// Trimmed, non-empty entries of the cell.
    pub fn entries(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            AttributeValue::Text(text) => text.split(',').collect(),
            AttributeValue::List(items) => items.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Host identities assigned to a registered interaction network; `nodes[i]`
/// is the host object of the network's `i`-th node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredNetwork {
    pub id: NetworkId,
    pub nodes: Vec<HostObjectId>,
}

pub trait HostGraph {
    fn contains(&self, object: HostObjectId) -> bool;

    fn is_selected(&self, object: HostObjectId) -> bool;

    /// The network a node or edge belongs to.
    fn network_of(&self, object: HostObjectId) -> Option<NetworkId>;

    fn set_selected(&mut self, changes: &BTreeMap<HostObjectId, bool>, origin: Origin);

    fn refresh_views(&mut self, networks: &[NetworkId]);

    fn attribute(&self, object: HostObjectId, column: &str) -> Option<AttributeValue>;

    fn register_network(&mut self, network: &InteractionNetwork) -> RegisteredNetwork;
}

#[derive(Debug, Clone)]
struct MemoryObject {
    network: NetworkId,
    selected: bool,
    attributes: HashMap<String, AttributeValue>,
}

/// A self-contained host graph kept in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    next_id: u64,
    networks: BTreeMap<NetworkId, String>,
    objects: BTreeMap<HostObjectId, MemoryObject>,
    refreshed: BTreeSet<NetworkId>,
    external_updates: usize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_network(&mut self, name: &str) -> NetworkId {
        let id = NetworkId(self.allocate());
        self.networks.insert(id, name.to_string());
        id
    }

    pub fn add_object(&mut self, network: NetworkId) -> HostObjectId {
        let id = HostObjectId(self.allocate());
        self.objects.insert(
            id,
            MemoryObject {
                network,
                selected: false,
                attributes: HashMap::new(),
            },
        );
        id
    }

    pub fn set_attribute(&mut self, object: HostObjectId, column: &str, value: AttributeValue) {
        if let Some(o) = self.objects.get_mut(&object) {
            o.attributes.insert(column.to_string(), value);
        }
    }

    pub fn network_name(&self, network: NetworkId) -> Option<&str> {
        self.networks.get(&network).map(String::as_str)
    }

    pub fn objects_in(&self, network: NetworkId) -> Vec<HostObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.network == network)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn selected_objects(&self) -> Vec<HostObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.selected)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Applies a user-driven selection change and returns the event the host
    /// would announce for it.
    pub fn select(&mut self, changes: impl IntoIterator<Item = (HostObjectId, bool)>) -> SelectionEvent {
        let event = SelectionEvent::from_host(changes);
        self.set_selected(&event.changes, Origin::Host);
        event
    }

    pub fn refreshed(&self) -> &BTreeSet<NetworkId> {
        &self.refreshed
    }

    /// How many selection pushes came from the viewer side.
    pub fn external_updates(&self) -> usize {
        self.external_updates
    }
}

impl HostGraph for MemoryHost {
    fn contains(&self, object: HostObjectId) -> bool {
        self.objects.contains_key(&object)
    }

    fn is_selected(&self, object: HostObjectId) -> bool {
        self.objects.get(&object).is_some_and(|o| o.selected)
    }

    fn network_of(&self, object: HostObjectId) -> Option<NetworkId> {
        self.objects.get(&object).map(|o| o.network)
    }

    fn set_selected(&mut self, changes: &BTreeMap<HostObjectId, bool>, origin: Origin) {
        for (id, &selected) in changes {
            if let Some(o) = self.objects.get_mut(id) {
                o.selected = selected;
            }
        }
        if origin == Origin::External {
            self.external_updates += 1;
        }
    }

    fn refresh_views(&mut self, networks: &[NetworkId]) {
        self.refreshed.extend(networks.iter().copied());
    }

    fn attribute(&self, object: HostObjectId, column: &str) -> Option<AttributeValue> {
        self.objects.get(&object)?.attributes.get(column).cloned()
    }

    fn register_network(&mut self, network: &InteractionNetwork) -> RegisteredNetwork {
        let id = self.add_network(network.name());
        let nodes = network
            .nodes()
            .iter()
            .map(|node| {
                let object = self.add_object(id);
                self.set_attribute(object, "name", AttributeValue::Text(node.name.clone()));
                self.set_attribute(
                    object,
                    "ResidueReference",
                    AttributeValue::Text(node.residue_attr.clone()),
                );
                object
            })
            .collect();
        RegisteredNetwork { id, nodes }
    }
}
