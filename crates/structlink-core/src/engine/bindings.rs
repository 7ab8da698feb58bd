use crate::core::models::ids::{HostObjectId, ModelKey, NetworkId};
use crate::core::models::object::{Structural, StructuralObject};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Many-to-many association between host-graph objects and structural
/// objects, plus the network owning each bound host object.
///
/// Both directions are updated together by every mutation, so the two maps
/// are mutual inverses whenever no call is in progress.
#[derive(Debug, Default, Clone)]
pub struct BindingTable {
    by_host: HashMap<HostObjectId, BTreeSet<StructuralObject>>,
    by_object: HashMap<StructuralObject, BTreeSet<HostObjectId>>,
    owners: HashMap<HostObjectId, NetworkId>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_host.is_empty()
    }

    pub fn bind(&mut self, host: HostObjectId, network: NetworkId, object: StructuralObject) {
        if let Some(previous) = self.owners.insert(host, network) {
            if previous != network {
                warn!(%host, %previous, %network, "Host object rebound to a different network");
            }
        }
        self.by_host.entry(host).or_default().insert(object.clone());
        self.by_object.entry(object).or_default().insert(host);
    }

    pub fn unbind(&mut self, host: HostObjectId, object: &StructuralObject) {
        let host_empty = match self.by_host.get_mut(&host) {
            Some(objects) => {
                objects.remove(object);
                objects.is_empty()
            }
            None => return,
        };
        if host_empty {
            self.by_host.remove(&host);
            self.owners.remove(&host);
        }
        self.detach_host_from(object, host);
    }

    /// Removes every binding of `host`, returning the objects it was bound to.
    pub fn unbind_host(&mut self, host: HostObjectId) -> Vec<StructuralObject> {
        self.owners.remove(&host);
        let objects = self.by_host.remove(&host).unwrap_or_default();
        for object in &objects {
            self.detach_host_from(object, host);
        }
        objects.into_iter().collect()
    }

    /// Removes every binding to objects of `model`, returning the affected
    /// host objects.
    pub fn unbind_model(&mut self, model: ModelKey) -> Vec<HostObjectId> {
        let doomed: Vec<StructuralObject> = self
            .by_object
            .keys()
            .filter(|o| o.owning_model() == model)
            .cloned()
            .collect();
        let mut affected = BTreeSet::new();
        for object in doomed {
            for host in self.by_object.remove(&object).unwrap_or_default() {
                self.detach_object_from(host, &object);
                affected.insert(host);
            }
        }
        affected.into_iter().collect()
    }

    /// Removes every host object owned by `network`, returning them.
    pub fn unbind_network(&mut self, network: NetworkId) -> Vec<HostObjectId> {
        let hosts: Vec<HostObjectId> = self
            .owners
            .iter()
            .filter(|&(_, n)| *n == network)
            .map(|(h, _)| *h)
            .collect();
        for &host in &hosts {
            self.unbind_host(host);
        }
        hosts
    }

    /// Moves every binding of `from` onto the same objects within `to`.
    pub fn rekey_model(&mut self, from: ModelKey, to: ModelKey) {
        if from == to {
            return;
        }
        let moved: Vec<(StructuralObject, BTreeSet<HostObjectId>)> = self
            .by_object
            .iter()
            .filter(|(o, _)| o.owning_model() == from)
            .map(|(o, h)| (o.clone(), h.clone()))
            .collect();
        for (object, hosts) in moved {
            let target = object.with_model(to);
            for host in hosts {
                let network = self.owners.get(&host).copied();
                self.unbind(host, &object);
                if let Some(network) = network {
                    self.bind(host, network, target.clone());
                }
            }
        }
    }

    pub fn objects_for(&self, host: HostObjectId) -> impl Iterator<Item = &StructuralObject> {
        self.by_host.get(&host).into_iter().flatten()
    }

    pub fn hosts_for(&self, object: &StructuralObject) -> impl Iterator<Item = HostObjectId> + '_ {
        self.by_object.get(object).into_iter().flatten().copied()
    }

    pub fn network_of(&self, host: HostObjectId) -> Option<NetworkId> {
        self.owners.get(&host).copied()
    }

    pub fn hosts(&self) -> impl Iterator<Item = HostObjectId> + '_ {
        self.by_host.keys().copied()
    }

    pub fn objects(&self) -> impl Iterator<Item = &StructuralObject> {
        self.by_object.keys()
    }

    /// Checks that both maps describe the same set of pairs and that every
    /// bound host object has an owner.
    pub fn is_consistent(&self) -> bool {
        let forward = self.by_host.iter().all(|(host, objects)| {
            !objects.is_empty()
                && self.owners.contains_key(host)
                && objects
                    .iter()
                    .all(|o| self.by_object.get(o).is_some_and(|h| h.contains(host)))
        });
        let backward = self.by_object.iter().all(|(object, hosts)| {
            !hosts.is_empty()
                && hosts
                    .iter()
                    .all(|h| self.by_host.get(h).is_some_and(|o| o.contains(object)))
        });
        forward && backward && self.owners.len() == self.by_host.len()
    }

    pub fn clear(&mut self) {
        self.by_host.clear();
        self.by_object.clear();
        self.owners.clear();
    }

    fn detach_host_from(&mut self, object: &StructuralObject, host: HostObjectId) {
        if let Some(hosts) = self.by_object.get_mut(object) {
            hosts.remove(&host);
            if hosts.is_empty() {
                self.by_object.remove(object);
            }
        }
    }

    fn detach_object_from(&mut self, host: HostObjectId, object: &StructuralObject) {
        if let Some(objects) = self.by_host.get_mut(&host) {
            objects.remove(object);
            if objects.is_empty() {
                self.by_host.remove(&host);
                self.owners.remove(&host);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::object::{ChainRef, ResidueRef};

    const NET: NetworkId = NetworkId(1);

    fn model(n: u32) -> ModelKey {
        ModelKey::new(n, 0)
    }

    fn residue(m: u32, index: &str) -> StructuralObject {
        ResidueRef::new(model(m), "A", index).into()
    }

    #[test]
    fn bind_is_visible_from_both_sides() {
        let mut table = BindingTable::new();
        table.bind(HostObjectId(1), NET, residue(0, "1"));
        table.bind(HostObjectId(1), NET, residue(0, "2"));
        table.bind(HostObjectId(2), NET, residue(0, "2"));
        assert_eq!(table.objects_for(HostObjectId(1)).count(), 2);
        assert_eq!(table.hosts_for(&residue(0, "2")).count(), 2);
        assert_eq!(table.network_of(HostObjectId(2)), Some(NET));
        assert!(table.is_consistent());
    }

    #[test]
    fn maps_remain_inverse_across_mixed_sequences() {
        let mut table = BindingTable::new();
        let chain: StructuralObject = ChainRef::new(model(1), "B").into();
        for i in 0..6 {
            table.bind(HostObjectId(i), NET, residue((i % 2) as u32, &i.to_string()));
            table.bind(HostObjectId(i), NET, chain.clone());
            assert!(table.is_consistent());
        }
        table.unbind(HostObjectId(0), &chain);
        assert!(table.is_consistent());
        table.unbind_host(HostObjectId(1));
        assert!(table.is_consistent());
        let affected = table.unbind_model(model(1));
        assert!(!affected.is_empty());
        assert!(table.is_consistent());
        assert!(table.objects().all(|o| o.owning_model() != model(1)));
        table.unbind_network(NET);
        assert!(table.is_empty());
        assert!(table.is_consistent());
    }

    #[test]
    fn unbind_last_object_drops_host_and_owner() {
        let mut table = BindingTable::new();
        table.bind(HostObjectId(7), NET, residue(0, "1"));
        table.unbind(HostObjectId(7), &residue(0, "1"));
        assert!(table.is_empty());
        assert_eq!(table.network_of(HostObjectId(7)), None);
        assert!(table.is_consistent());
    }

    #[test]
    fn unbind_network_only_touches_its_hosts() {
        let mut table = BindingTable::new();
        table.bind(HostObjectId(1), NetworkId(1), residue(0, "1"));
        table.bind(HostObjectId(2), NetworkId(2), residue(0, "1"));
        assert_eq!(table.unbind_network(NetworkId(1)), vec![HostObjectId(1)]);
        assert_eq!(table.hosts_for(&residue(0, "1")).collect::<Vec<_>>(), vec![HostObjectId(2)]);
        assert!(table.is_consistent());
    }

    #[test]
    fn rekey_model_moves_bindings() {
        let mut table = BindingTable::new();
        table.bind(HostObjectId(1), NET, StructuralObject::Model(model(0)));
        table.bind(HostObjectId(1), NET, residue(0, "5"));
        let target = ModelKey::new(0, 1);
        table.rekey_model(model(0), target);
        assert!(table.objects().all(|o| o.owning_model() == target));
        assert_eq!(table.objects_for(HostObjectId(1)).count(), 2);
        assert_eq!(table.network_of(HostObjectId(1)), Some(NET));
        assert!(table.is_consistent());
    }
}
