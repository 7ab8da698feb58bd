use super::error::EngineError;
use super::gateway::Gateway;
use crate::core::io::commands;
use crate::core::io::records::{
    parse_model_color, parse_model_line, parse_model_prefix, parse_residue_line,
};
use crate::core::models::ids::{HostObjectId, ModelKey, NetworkId};
use crate::core::models::object::{Structural, StructuralObject, residue_number};
use crate::core::models::structure::{Color, ModelKind, StructuralModel};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Outcome of re-synchronizing the registry with the viewer's model list.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub added: Vec<ModelKey>,
    /// Surviving models, as `(previous key, current key)`.
    pub retained: Vec<(ModelKey, ModelKey)>,
    pub dropped: Vec<StructuralModel>,
}

/// Canonical store of the models open in the viewer, keyed by model identity.
#[derive(Debug, Default)]
pub struct Registry {
    models: BTreeMap<ModelKey, StructuralModel>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `name` in the viewer and registers every model the viewer reports
    /// that was not known before. Returns only the new models.
    pub fn open(
        &mut self,
        gateway: &Gateway,
        name: &str,
        kind: ModelKind,
    ) -> Result<Vec<ModelKey>, EngineError> {
        let _guard = gateway.listen_guard()?;
        let reply = gateway.send_command(&commands::open(name, kind), true)?;

        let mut staged: Vec<StructuralModel> = Vec::new();
        for line in reply.iter().filter(|l| l.trim_start().starts_with('#')) {
            let Some(key) = parse_model_prefix(line) else {
                warn!(line = line.as_str(), "Unreadable model identifier in open reply");
                continue;
            };
            if self.models.contains_key(&key) || staged.iter().any(|m| m.key() == key) {
                continue;
            }
            let mut model = StructuralModel::new(key, name, kind);
            model.color = fetch_color(gateway, key)?;
            if kind != ModelKind::SmallMolecule {
                fetch_residues(gateway, &mut model)?;
            }
            info!(
                model = %key,
                name,
                chains = model.chain_count(),
                residues = model.residue_count(),
                "Registered model"
            );
            staged.push(model);
        }

        gateway.send_command(commands::FOCUS, false)?;
        // Nothing is registered unless every new model was read completely.
        let opened = staged.iter().map(StructuralModel::key).collect();
        for model in staged {
            self.models.insert(model.key(), model);
        }
        Ok(opened)
    }

    /// Rebuilds the store from the viewer's current model list.
    ///
    /// A surveyed model inherits kind, host bindings and functional residues
    /// from the stored model with the same key, or failing that the same
    /// model number; small molecules also keep their name. Stored models
    /// missing from the survey are dropped and returned in the report.
    pub fn refresh(&mut self, gateway: &Gateway) -> Result<RefreshReport, EngineError> {
        let _guard = gateway.listen_guard()?;
        let reply = gateway.send_command(commands::LIST_MODELS, true)?;

        // The store is only replaced once the whole survey has been read.
        let mut previous = self.models.clone();
        let mut refreshed = BTreeMap::new();
        let mut report = RefreshReport::default();
        for line in reply.iter().filter(|l| l.trim_start().starts_with("model id")) {
            let record = match parse_model_line(line) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "Skipping model survey line");
                    continue;
                }
            };
            if refreshed.contains_key(&record.key) {
                continue;
            }
            let old_key = if previous.contains_key(&record.key) {
                Some(record.key)
            } else {
                previous
                    .keys()
                    .find(|k| k.model_number() == record.key.model_number())
                    .copied()
            };
            let old = old_key.and_then(|k| previous.remove(&k));

            let mut model = match &old {
                Some(old) if old.kind == ModelKind::SmallMolecule => {
                    StructuralModel::new(record.key, &old.name, old.kind)
                }
                Some(old) => StructuralModel::new(record.key, &record.name, old.kind),
                None => StructuralModel::new(record.key, &record.name, ModelKind::FileStructure),
            };
            if let Some(mut old) = old {
                for (host, network) in old.take_host_objects() {
                    model.add_host_object(host, network);
                }
                let moved = old
                    .functional_residues()
                    .iter()
                    .map(|r| {
                        let mut r = r.clone();
                        r.model = record.key;
                        r
                    })
                    .collect();
                model.set_functional_residues(moved);
                report.retained.push((old.key(), record.key));
            } else {
                report.added.push(record.key);
            }

            model.color = fetch_color(gateway, record.key)?;
            if model.kind != ModelKind::SmallMolecule {
                fetch_residues(gateway, &mut model)?;
            }
            refreshed.insert(record.key, model);
        }

        self.models = refreshed;
        report.dropped = previous.into_values().collect();
        for model in &report.dropped {
            info!(model = %model.key(), name = model.name.as_str(), "Model is no longer open");
        }
        Ok(report)
    }

    /// Closes the model in the viewer and removes it from the store.
    pub fn close(&mut self, gateway: &Gateway, key: ModelKey) -> Result<StructuralModel, EngineError> {
        if !self.models.contains_key(&key) {
            return Err(EngineError::ModelNotFound(key));
        }
        {
            let _guard = gateway.listen_guard()?;
            gateway.send_command(&commands::close(key), false)?;
        }
        self.remove(key).ok_or(EngineError::ModelNotFound(key))
    }

    pub fn has(&self, key: ModelKey) -> bool {
        self.models.contains_key(&key)
    }

    pub fn get(&self, key: ModelKey) -> Option<&StructuralModel> {
        self.models.get(&key)
    }

    pub fn get_mut(&mut self, key: ModelKey) -> Option<&mut StructuralModel> {
        self.models.get_mut(&key)
    }

    pub fn insert(&mut self, model: StructuralModel) {
        self.models.insert(model.key(), model);
    }

    /// Removes a model together with its whole composition.
    pub fn remove(&mut self, key: ModelKey) -> Option<StructuralModel> {
        let removed = self.models.remove(&key);
        if removed.is_some() {
            debug!(model = %key, "Removed model from registry");
        }
        removed
    }

    pub fn list_by_name(&self, name: &str) -> Vec<&StructuralModel> {
        self.models.values().filter(|m| m.name == name).collect()
    }

    pub fn list_all(&self) -> impl Iterator<Item = &StructuralModel> {
        self.models.values()
    }

    pub fn keys(&self) -> Vec<ModelKey> {
        self.models.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// The model an address without a model prefix refers to.
    pub fn default_model(&self) -> Option<ModelKey> {
        self.models.keys().next().copied()
    }

    /// Immediate children of an object: chains of a model, residues of a chain.
    pub fn children(&self, object: &StructuralObject) -> Vec<StructuralObject> {
        let Some(model) = self.models.get(&object.owning_model()) else {
            return Vec::new();
        };
        match object {
            StructuralObject::Model(_) => model
                .chains_iter()
                .map(|(_, c)| c.reference().into())
                .collect(),
            StructuralObject::Chain(c) => match model.find_chain(&c.chain) {
                Some(id) => model
                    .chain_residues(id)
                    .map(|r| r.reference().into())
                    .collect(),
                None => Vec::new(),
            },
            StructuralObject::Residue(_) => Vec::new(),
        }
    }

    pub fn contains_object(&self, object: &StructuralObject) -> bool {
        let Some(model) = self.models.get(&object.owning_model()) else {
            return false;
        };
        match object {
            StructuralObject::Model(_) => true,
            StructuralObject::Chain(c) => model.find_chain(&c.chain).is_some(),
            StructuralObject::Residue(r) => model.find_residue(&r.chain, &r.index).is_some(),
        }
    }

    pub fn is_selected(&self, object: &StructuralObject) -> bool {
        self.models
            .values()
            .any(|m| m.is_object_selected(object))
    }

    pub(crate) fn set_selected(&mut self, object: &StructuralObject, selected: bool) -> bool {
        let key = object.owning_model();
        self.models
            .get_mut(&key)
            .is_some_and(|m| m.set_object_selected(object, selected))
    }

    pub(crate) fn clear_selection_flags(&mut self) {
        for model in self.models.values_mut() {
            model.clear_selection_flags();
        }
    }

    pub(crate) fn bind_host_object(&mut self, model: ModelKey, host: HostObjectId, network: NetworkId) {
        if let Some(m) = self.models.get_mut(&model) {
            m.add_host_object(host, network);
        }
    }

    pub(crate) fn unbind_host_object(&mut self, model: ModelKey, host: HostObjectId) {
        if let Some(m) = self.models.get_mut(&model) {
            m.remove_host_object(host);
        }
    }

    pub(crate) fn unbind_network(&mut self, network: NetworkId) {
        for model in self.models.values_mut() {
            model.remove_network(network);
        }
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }
}

fn fetch_color(gateway: &Gateway, key: ModelKey) -> Result<Option<Color>, EngineError> {
    let reply = gateway.send_command(&commands::model_color(key), true)?;
    let Some(line) = reply.iter().find(|l| l.contains(" color ")) else {
        return Ok(None);
    };
    match parse_model_color(line) {
        Ok(color) => Ok(color),
        Err(e) => {
            warn!(model = %key, error = %e, "Ignoring unreadable model color");
            Ok(None)
        }
    }
}

fn fetch_residues(gateway: &Gateway, model: &mut StructuralModel) -> Result<(), EngineError> {
    let key = model.key();
    let reply = gateway.send_command(&commands::list_residues(key), true)?;
    for line in reply.iter().filter(|l| l.trim_start().starts_with("residue id")) {
        let record = match parse_residue_line(line) {
            Ok(record) => record,
            Err(e) => {
                warn!(model = %key, error = %e, "Skipping residue record");
                continue;
            }
        };
        let reference = record.reference(key);
        if reference.model != key {
            continue;
        }
        if residue_number(&reference.index).is_none() {
            debug!(model = %key, index = reference.index.as_str(), "Residue index is not numeric");
        }
        model.add_residue(&reference.chain, &reference.index, &record.residue_type);
    }
    model.sort_residues();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::object::{ChainRef, ResidueRef};
    use crate::engine::error::GatewayError;
    use crate::engine::testing::ScriptedTool;

    fn script_1tkk(tool: &ScriptedTool) {
        tool.respond("open 1tkk", &["#0, chain A: protein", "#0, chain B: protein"]);
        tool.respond(
            "listm type molecule attr color spec #0",
            &["model id #0 type Molecule color 0.5,0.5,1"],
        );
        tool.respond(
            "listr spec #0",
            &[
                "residue id #0:2.A type ALA",
                "residue id #0:1.A type MET",
                "residue id #0:1.B type GLY",
                "garbage",
            ],
        );
    }

    #[test]
    fn open_registers_new_models_with_composition() {
        let (tool, gateway) = ScriptedTool::spawn();
        script_1tkk(&tool);
        let mut registry = Registry::new();
        let opened = registry.open(&gateway, "1tkk", ModelKind::FileStructure).unwrap();
        assert_eq!(opened, vec![ModelKey::new(0, 0)]);

        let model = registry.get(ModelKey::new(0, 0)).unwrap();
        assert_eq!(model.name, "1tkk");
        assert_eq!(model.chain_count(), 2);
        assert_eq!(model.residue_count(), 3);
        assert_eq!(model.color.map(|c| c.blue), Some(1.0));
        let chain_a = model.find_chain("A").unwrap();
        let order: Vec<&str> = model.chain_residues(chain_a).map(|r| r.index.as_str()).collect();
        assert_eq!(order, vec!["1", "2"]);

        let commands = tool.commands();
        assert_eq!(commands.first().map(String::as_str), Some(commands::LISTEN_STOP));
        assert!(commands.contains(&"focus".to_string()));
        assert_eq!(commands.last().map(String::as_str), Some(commands::LISTEN_START));
    }

    #[test]
    fn reopening_returns_only_new_models() {
        let (tool, gateway) = ScriptedTool::spawn();
        script_1tkk(&tool);
        let mut registry = Registry::new();
        registry.open(&gateway, "1tkk", ModelKind::FileStructure).unwrap();
        let again = registry.open(&gateway, "1tkk", ModelKind::FileStructure).unwrap();
        assert!(again.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn small_molecules_skip_residue_listing() {
        let (tool, gateway) = ScriptedTool::spawn();
        tool.respond("open smiles:CCO", &["#1 opened"]);
        let mut registry = Registry::new();
        let opened = registry.open(&gateway, "CCO", ModelKind::SmallMolecule).unwrap();
        assert_eq!(opened, vec![ModelKey::new(1, 0)]);
        assert!(!tool.commands().iter().any(|c| c.starts_with("listr")));
        assert_eq!(registry.get(ModelKey::new(1, 0)).unwrap().residue_count(), 0);
    }

    #[test]
    fn refresh_drops_models_missing_from_survey() {
        let (tool, gateway) = ScriptedTool::spawn();
        script_1tkk(&tool);
        tool.respond("open CCO", &["#1 opened"]);
        tool.respond("listr spec #1", &["residue id #1:1 type LIG"]);
        let mut registry = Registry::new();
        registry.open(&gateway, "1tkk", ModelKind::DatabaseStructure).unwrap();
        registry.open(&gateway, "CCO", ModelKind::FileStructure).unwrap();
        registry.bind_host_object(ModelKey::new(0, 0), HostObjectId(9), NetworkId(1));

        tool.respond("listm type molecule", &["model id #0 type Molecule name 1tkk"]);
        let report = registry.refresh(&gateway).unwrap();
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].key(), ModelKey::new(1, 0));
        assert_eq!(report.retained, vec![(ModelKey::new(0, 0), ModelKey::new(0, 0))]);
        assert!(!registry.has(ModelKey::new(1, 0)));

        let model = registry.get(ModelKey::new(0, 0)).unwrap();
        assert_eq!(model.kind, ModelKind::DatabaseStructure);
        assert_eq!(model.residue_count(), 3);
        assert!(model.host_objects().contains_key(&HostObjectId(9)));
    }

    #[test]
    fn refresh_matches_by_model_number_and_keeps_small_molecule_name() {
        let (tool, gateway) = ScriptedTool::spawn();
        tool.respond("open smiles:CCO", &["#2 opened"]);
        let mut registry = Registry::new();
        registry.open(&gateway, "CCO", ModelKind::SmallMolecule).unwrap();

        tool.respond(
            "listm type molecule",
            &["model id #2.1 type Molecule name smiles", "model id #3 type Molecule name extra"],
        );
        let report = registry.refresh(&gateway).unwrap();
        assert_eq!(report.retained, vec![(ModelKey::new(2, 0), ModelKey::new(2, 1))]);
        assert_eq!(report.added, vec![ModelKey::new(3, 0)]);
        let model = registry.get(ModelKey::new(2, 1)).unwrap();
        assert_eq!(model.name, "CCO");
        assert_eq!(model.kind, ModelKind::SmallMolecule);
        assert_eq!(registry.get(ModelKey::new(3, 0)).unwrap().kind, ModelKind::FileStructure);
    }

    #[test]
    fn failed_refresh_leaves_the_store_untouched() {
        let (tool, gateway) = ScriptedTool::spawn_with_timeout(std::time::Duration::from_millis(200));
        script_1tkk(&tool);
        tool.respond("open 2xyz", &["#1, chain A: protein"]);
        tool.respond("listr spec #1", &["residue id #1:1.A type SER"]);
        let mut registry = Registry::new();
        registry.open(&gateway, "1tkk", ModelKind::FileStructure).unwrap();
        registry.open(&gateway, "2xyz", ModelKind::DatabaseStructure).unwrap();
        registry.bind_host_object(ModelKey::new(1, 0), HostObjectId(4), NetworkId(1));

        tool.respond(
            "listm type molecule",
            &["model id #0 type Molecule name 1tkk", "model id #1 type Molecule name 2xyz"],
        );
        tool.silence("listm type molecule attr color spec #1");
        let result = registry.refresh(&gateway);
        assert!(matches!(
            result,
            Err(EngineError::Gateway(GatewayError::ReplyTimeout { .. }))
        ));

        assert_eq!(registry.keys(), vec![ModelKey::new(0, 0), ModelKey::new(1, 0)]);
        let kept = registry.get(ModelKey::new(1, 0)).unwrap();
        assert_eq!(kept.kind, ModelKind::DatabaseStructure);
        assert_eq!(kept.residue_count(), 1);
        assert!(kept.host_objects().contains_key(&HostObjectId(4)));
        assert_eq!(tool.commands().last().map(String::as_str), Some(commands::LISTEN_START));
    }

    #[test]
    fn failed_open_registers_none_of_its_models() {
        let (tool, gateway) = ScriptedTool::spawn_with_timeout(std::time::Duration::from_millis(200));
        tool.respond("open 1nmr", &["#0.1, chain A: protein", "#0.2, chain A: protein"]);
        tool.respond("listr spec #0.1", &["residue id #0.1:1.A type MET"]);
        tool.silence("listr spec #0.2");
        let mut registry = Registry::new();

        let result = registry.open(&gateway, "1nmr", ModelKind::FileStructure);
        assert!(matches!(
            result,
            Err(EngineError::Gateway(GatewayError::ReplyTimeout { .. }))
        ));
        assert!(registry.is_empty());
        assert_eq!(tool.commands().last().map(String::as_str), Some(commands::LISTEN_START));
    }

    #[test]
    fn close_sends_command_and_removes_model() {
        let (tool, gateway) = ScriptedTool::spawn();
        script_1tkk(&tool);
        let mut registry = Registry::new();
        registry.open(&gateway, "1tkk", ModelKind::FileStructure).unwrap();
        let closed = registry.close(&gateway, ModelKey::new(0, 0)).unwrap();
        assert_eq!(closed.name, "1tkk");
        assert!(registry.is_empty());
        assert!(tool.commands().contains(&"close #0".to_string()));
        assert!(matches!(
            registry.close(&gateway, ModelKey::new(0, 0)),
            Err(EngineError::ModelNotFound(_))
        ));
    }

    #[test]
    fn children_and_selection_flags_follow_composition() {
        let mut registry = Registry::new();
        let key = ModelKey::new(0, 0);
        let mut model = StructuralModel::new(key, "1abc", ModelKind::FileStructure);
        model.add_residue("A", "1", "MET");
        model.add_residue("A", "2", "ALA");
        registry.insert(model);

        let chain: StructuralObject = ChainRef::new(key, "A").into();
        assert_eq!(registry.children(&StructuralObject::Model(key)), vec![chain.clone()]);
        assert_eq!(registry.children(&chain).len(), 2);

        let residue: StructuralObject = ResidueRef::new(key, "A", "2").into();
        assert!(registry.set_selected(&residue, true));
        assert!(registry.is_selected(&residue));
        assert!(!registry.set_selected(&ResidueRef::new(key, "Z", "1").into(), true));
        registry.clear_selection_flags();
        assert!(!registry.is_selected(&residue));
        assert_eq!(registry.list_by_name("1abc").len(), 1);
        assert_eq!(registry.default_model(), Some(key));
    }
}
