//! Two-way selection reconciliation between host objects and the viewer.
//!
//! The synchronizer owns the binding table and the canonical selection set.
//! Every change to the set goes through [`SelectionSynchronizer::add`] and
//! [`SelectionSynchronizer::remove`], which also flip the `selected` flag of
//! the object in the registry, so the set and the flags never disagree.

use super::bindings::BindingTable;
use super::error::EngineError;
use super::gateway::Gateway;
use super::host::{HostGraph, Origin, SelectionEvent};
use super::registry::Registry;
use crate::core::io::commands;
use crate::core::io::records::{AtomSpec, parse_model_line, parse_residue_line};
use crate::core::models::ids::{HostObjectId, ModelKey, NetworkId};
use crate::core::models::object::{ResidueRef, Structural, StructuralObject};
use crate::core::models::structure::ModelKind;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct SelectionSynchronizer {
    bindings: BindingTable,
    selection: BTreeSet<StructuralObject>,
    host_selected: BTreeSet<HostObjectId>,
}

impl SelectionSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn selection(&self) -> &BTreeSet<StructuralObject> {
        &self.selection
    }

    /// Binds a host object to a structural object. Bindings are also recorded
    /// on the owning model so they survive a registry refresh.
    pub fn bind(
        &mut self,
        registry: &mut Registry,
        host: HostObjectId,
        network: NetworkId,
        object: StructuralObject,
    ) {
        registry.bind_host_object(object.owning_model(), host, network);
        self.bindings.bind(host, network, object);
    }

    pub fn unbind(&mut self, registry: &mut Registry, host: HostObjectId, object: &StructuralObject) {
        self.bindings.unbind(host, object);
        let model = object.owning_model();
        let still_bound = self
            .bindings
            .objects_for(host)
            .any(|o| o.owning_model() == model);
        if !still_bound {
            registry.unbind_host_object(model, host);
        }
    }

    /// Forgets everything tied to `model`: bindings and selected objects.
    /// Returns the host objects that lost a binding.
    pub fn unbind_model(&mut self, model: ModelKey) -> Vec<HostObjectId> {
        self.selection.retain(|o| o.owning_model() != model);
        let affected = self.bindings.unbind_model(model);
        for host in &affected {
            if self.bindings.objects_for(*host).next().is_none() {
                self.host_selected.remove(host);
            }
        }
        affected
    }

    pub fn unbind_network(&mut self, registry: &mut Registry, network: NetworkId) -> Vec<HostObjectId> {
        registry.unbind_network(network);
        let hosts = self.bindings.unbind_network(network);
        for host in &hosts {
            self.host_selected.remove(host);
        }
        hosts
    }

    /// Carries bindings and selection over to a model's new identity.
    pub fn rekey_model(&mut self, from: ModelKey, to: ModelKey) {
        self.bindings.rekey_model(from, to);
        let moved: Vec<StructuralObject> = self
            .selection
            .iter()
            .filter(|o| o.owning_model() == from)
            .cloned()
            .collect();
        for object in moved {
            self.selection.remove(&object);
            self.selection.insert(object.with_model(to));
        }
    }

    /// Re-applies the selection flags of the current set, e.g. after the
    /// registry rebuilt its models.
    pub fn restore_flags(&mut self, registry: &mut Registry) {
        registry.clear_selection_flags();
        self.selection.retain(|o| registry.set_selected(o, true));
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
        self.selection.clear();
        self.host_selected.clear();
    }

    fn add(&mut self, registry: &mut Registry, object: StructuralObject) {
        if registry.set_selected(&object, true) {
            self.selection.insert(object);
        } else {
            debug!(object = %object, "Ignoring selection of unknown object");
        }
    }

    fn remove(&mut self, registry: &mut Registry, object: &StructuralObject) {
        registry.set_selected(object, false);
        self.selection.remove(object);
    }

    fn clear_selection(&mut self, registry: &mut Registry) {
        registry.clear_selection_flags();
        self.selection.clear();
    }

    fn covers(&self, object: &StructuralObject) -> bool {
        self.selection.contains(object) || object.ancestors().iter().any(|a| self.selection.contains(a))
    }

    /// Selects `object`, collapsing into an already selected ancestor and
    /// absorbing selected descendants.
    fn select_object(&mut self, registry: &mut Registry, object: StructuralObject) {
        if self.covers(&object) {
            return;
        }
        let absorbed: Vec<StructuralObject> = self
            .selection
            .iter()
            .filter(|s| s.is_descendant_of(&object))
            .cloned()
            .collect();
        for descendant in &absorbed {
            self.remove(registry, descendant);
        }
        self.add(registry, object);
    }

    /// Deselects `object`. Selected descendants go with it; a selected
    /// ancestor is split into its remaining children.
    fn deselect_object(&mut self, registry: &mut Registry, object: &StructuralObject) {
        let descendants: Vec<StructuralObject> = self
            .selection
            .iter()
            .filter(|s| s.is_descendant_of(object))
            .cloned()
            .collect();
        for descendant in &descendants {
            self.remove(registry, descendant);
        }
        if self.selection.contains(object) {
            self.remove(registry, object);
            return;
        }
        let ancestor = object
            .ancestors()
            .into_iter()
            .find(|a| self.selection.contains(a));
        if let Some(ancestor) = ancestor {
            self.remove(registry, &ancestor);
            self.expand_without(registry, &ancestor, object);
        }
    }

    fn expand_without(&mut self, registry: &mut Registry, parent: &StructuralObject, excluded: &StructuralObject) {
        for child in registry.children(parent) {
            if &child == excluded {
                continue;
            }
            if excluded.is_descendant_of(&child) {
                self.expand_without(registry, &child, excluded);
            } else {
                self.add(registry, child);
            }
        }
    }

    /// Handles a selection change in the host graph and mirrors the
    /// resulting selection into the viewer. Changes this synchronizer pushed
    /// itself are ignored.
    pub fn on_host_selection_changed(
        &mut self,
        event: &SelectionEvent,
        registry: &mut Registry,
        gateway: &Gateway,
    ) -> Result<(), EngineError> {
        if event.origin == Origin::External {
            return Ok(());
        }
        let mut touched = false;
        for (&host, &selected) in &event.changes {
            let objects: Vec<StructuralObject> = self.bindings.objects_for(host).cloned().collect();
            if objects.is_empty() {
                continue;
            }
            touched = true;
            if selected {
                self.host_selected.insert(host);
                for object in objects {
                    self.select_object(registry, object);
                }
            } else {
                self.host_selected.remove(&host);
                for object in &objects {
                    self.deselect_object(registry, object);
                }
            }
        }
        if !touched {
            return Ok(());
        }
        let expression = self.selection_expression(registry);
        debug!(expression = expression.as_str(), "Mirroring host selection");
        gateway.select(&expression)?;
        Ok(())
    }

    /// The selection set in its coarsest form: chains whose residues are all
    /// selected become the chain, models whose chains are all selected become
    /// the model.
    pub fn coarsened(&self, registry: &Registry) -> BTreeSet<StructuralObject> {
        let mut set = self.selection.clone();
        for model in registry.list_all() {
            let model_object = StructuralObject::Model(model.key());
            if set.contains(&model_object) {
                continue;
            }
            let mut chains = Vec::new();
            for (chain_id, chain) in model.chains_iter() {
                let chain_object: StructuralObject = chain.reference().into();
                chains.push(chain_object.clone());
                if set.contains(&chain_object) {
                    continue;
                }
                let residues: Vec<StructuralObject> = model
                    .chain_residues(chain_id)
                    .map(|r| r.reference().into())
                    .collect();
                if !residues.is_empty() && residues.iter().all(|r| set.contains(r)) {
                    for residue in &residues {
                        set.remove(residue);
                    }
                    set.insert(chain_object);
                }
            }
            if !chains.is_empty() && chains.iter().all(|c| set.contains(c)) {
                for chain in &chains {
                    set.remove(chain);
                }
                set.insert(model_object);
            }
        }
        let redundant: Vec<StructuralObject> = set
            .iter()
            .filter(|o| o.ancestors().iter().any(|a| set.contains(a)))
            .cloned()
            .collect();
        for object in &redundant {
            set.remove(object);
        }
        set
    }

    /// Viewer selection expression for the coarsened set; empty when nothing
    /// is selected.
    pub fn selection_expression(&self, registry: &Registry) -> String {
        self.coarsened(registry)
            .iter()
            .map(|o| o.spec())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Rebuilds the selection set from what the viewer reports as selected,
    /// then pushes it into the host.
    pub fn on_external_selection_changed(
        &mut self,
        registry: &mut Registry,
        gateway: &Gateway,
        host: &mut dyn HostGraph,
    ) -> Result<(), EngineError> {
        let model_reply = gateway.send_command(commands::LIST_SELECTED_MODELS, true)?;
        let residue_reply = gateway.send_command(commands::LIST_SELECTED_RESIDUES, true)?;

        let mut selected_models = BTreeSet::new();
        for line in model_reply.iter().filter(|l| l.trim_start().starts_with("model id")) {
            match parse_model_line(line) {
                Ok(record) => {
                    selected_models.insert(record.key);
                }
                Err(e) => warn!(error = %e, "Skipping selected model record"),
            }
        }

        let default_model = registry.default_model();
        let mut selected_residues: BTreeMap<ModelKey, BTreeSet<ResidueRef>> = BTreeMap::new();
        for line in residue_reply.iter().filter(|l| l.trim_start().starts_with("residue id")) {
            let record = match parse_residue_line(line) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "Skipping selected residue record");
                    continue;
                }
            };
            let Some(reference) = resolve(&record.spec, default_model) else {
                continue;
            };
            selected_models.insert(reference.model);
            selected_residues.entry(reference.model).or_default().insert(reference);
        }

        self.clear_selection(registry);
        for key in selected_models {
            let empty = BTreeSet::new();
            let residues = selected_residues.get(&key).unwrap_or(&empty);
            self.reconcile_model(registry, key, residues);
        }
        debug!(objects = self.selection.len(), "Reconciled viewer selection");

        self.push_to_host(host);
        Ok(())
    }

    fn reconcile_model(&mut self, registry: &mut Registry, key: ModelKey, residues: &BTreeSet<ResidueRef>) {
        let Some(model) = registry.get(key) else {
            debug!(model = %key, "Selection reported for an unknown model");
            return;
        };
        if model.kind == ModelKind::SmallMolecule || residues.len() == model.residue_count() {
            self.add(registry, StructuralObject::Model(key));
            return;
        }
        let mut picked = Vec::new();
        for (chain_id, chain) in model.chains_iter() {
            let chain_residues: Vec<ResidueRef> =
                model.chain_residues(chain_id).map(|r| r.reference()).collect();
            let hits: Vec<ResidueRef> = chain_residues
                .iter()
                .filter(|r| residues.contains(*r))
                .cloned()
                .collect();
            if hits.is_empty() {
                continue;
            }
            if hits.len() == chain_residues.len() {
                picked.push(chain.reference().into());
            } else {
                picked.extend(hits.into_iter().map(StructuralObject::from));
            }
        }
        for object in picked {
            self.add(registry, object);
        }
    }

    /// Two-pass host update: every host object this synchronizer selected is
    /// cleared, then host objects bound to anything the selection covers (or
    /// to the model owning a selected object) are selected.
    pub fn push_to_host(&mut self, host: &mut dyn HostGraph) {
        let mut changes: BTreeMap<HostObjectId, bool> = self
            .host_selected
            .iter()
            .map(|&h| (h, false))
            .collect();
        self.host_selected.clear();

        let selected_models: BTreeSet<ModelKey> =
            self.selection.iter().map(|o| o.owning_model()).collect();
        for bound in self.bindings.hosts().collect::<Vec<_>>() {
            let hit = self.bindings.objects_for(bound).any(|o| {
                self.covers(o) || (o.is_model() && selected_models.contains(&o.owning_model()))
            });
            if hit && host.contains(bound) {
                changes.insert(bound, true);
                self.host_selected.insert(bound);
            }
        }

        let networks: BTreeSet<NetworkId> = changes
            .keys()
            .filter_map(|&h| self.bindings.network_of(h))
            .collect();
        host.set_selected(&changes, Origin::External);
        host.refresh_views(&networks.into_iter().collect::<Vec<_>>());
    }

    /// Replaces the selection with the functional residues annotated on
    /// `models` and mirrors it both ways.
    pub fn select_functional_residues(
        &mut self,
        registry: &mut Registry,
        gateway: &Gateway,
        host: &mut dyn HostGraph,
        models: &[ModelKey],
    ) -> Result<(), EngineError> {
        self.clear_selection(registry);
        let residues: Vec<ResidueRef> = models
            .iter()
            .filter_map(|&key| registry.get(key))
            .flat_map(|m| m.functional_residues().to_vec())
            .collect();
        for residue in residues {
            self.select_object(registry, residue.into());
        }
        gateway.select(&self.selection_expression(registry))?;
        self.push_to_host(host);
        Ok(())
    }
}

fn resolve(spec: &AtomSpec, default_model: Option<ModelKey>) -> Option<ResidueRef> {
    let model = spec.model.or(default_model)?;
    Some(spec.residue_ref(model))
}
