use super::config::{ColumnConfig, GatewayConfig};
use super::error::{EngineError, GatewayError};
use super::gateway::{Gateway, Notification};
use super::host::{HostGraph, RegisteredNetwork, SelectionEvent};
use super::registry::{RefreshReport, Registry};
use super::synchronizer::SelectionSynchronizer;
use crate::core::io::records::parse_functional_residue;
use crate::core::models::ids::{HostObjectId, ModelKey, NetworkId};
use crate::core::models::object::{ResidueRef, Structural, StructuralObject};
use crate::core::models::structure::ModelKind;
use crate::core::network::InteractionNetwork;
use tracing::{debug, info, warn};

/// What a batch of viewer notifications amounted to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NotificationSummary {
    pub models_changed: bool,
    pub selection_changed: bool,
    pub lost: bool,
}

/// The context every operation runs in: the viewer gateway, the registry of
/// open models and the selection synchronizer.
///
/// Losing the viewer tears the whole session down; it can be launched again.
pub struct Session {
    gateway: Option<Gateway>,
    registry: Registry,
    synchronizer: SelectionSynchronizer,
    columns: ColumnConfig,
}

impl Session {
    pub fn new(columns: ColumnConfig) -> Self {
        Self {
            gateway: None,
            registry: Registry::new(),
            synchronizer: SelectionSynchronizer::new(),
            columns,
        }
    }

    /// Launches the viewer unless one is already attached and alive.
    pub fn launch(&mut self, config: &GatewayConfig) -> Result<(), EngineError> {
        if self.is_running() {
            return Ok(());
        }
        self.teardown();
        self.gateway = Some(Gateway::start(config)?);
        Ok(())
    }

    pub fn attach(&mut self, gateway: Gateway) {
        self.teardown();
        self.gateway = Some(gateway);
    }

    pub fn is_running(&self) -> bool {
        self.gateway.as_ref().is_some_and(Gateway::is_running)
    }

    pub fn gateway(&self) -> Result<&Gateway, EngineError> {
        self.gateway
            .as_ref()
            .ok_or(EngineError::Gateway(GatewayError::NotRunning))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn synchronizer(&self) -> &SelectionSynchronizer {
        &self.synchronizer
    }

    pub fn columns(&self) -> &ColumnConfig {
        &self.columns
    }

    /// Stops the viewer and forgets all state.
    pub fn shutdown(&mut self) {
        if let Some(mut gateway) = self.gateway.take() {
            gateway.stop();
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.gateway.take().is_some() || !self.registry.is_empty() {
            info!("Tearing down viewer session.");
        }
        self.registry.clear();
        self.synchronizer.clear();
    }

    /// Tears the session down when `result` shows the viewer is gone.
    fn check<T>(&mut self, result: Result<T, EngineError>) -> Result<T, EngineError> {
        if let Err(EngineError::Gateway(e)) = &result {
            if e.is_fatal() {
                warn!(error = %e, "Viewer connection lost");
                self.teardown();
            }
        }
        result
    }

    pub fn open_structure(&mut self, name: &str, kind: ModelKind) -> Result<Vec<ModelKey>, EngineError> {
        let result = match self.gateway.as_ref() {
            Some(gateway) => self.registry.open(gateway, name, kind),
            None => Err(GatewayError::NotRunning.into()),
        };
        self.check(result)
    }

    /// Structure names found in the configured attribute columns of a host
    /// object, with the kind each one must be opened as.
    pub fn structure_names(&self, host: &dyn HostGraph, object: HostObjectId) -> Vec<(String, ModelKind)> {
        let mut names: Vec<(String, ModelKind)> = Vec::new();
        let mut collect = |columns: &[String], kind: ModelKind| {
            for column in columns {
                let Some(value) = host.attribute(object, column) else {
                    continue;
                };
                for entry in value.entries() {
                    if !names.iter().any(|(n, _)| *n == entry) {
                        names.push((entry, kind));
                    }
                }
            }
        };
        collect(&self.columns.structure_columns, ModelKind::FileStructure);
        collect(&self.columns.chemical_columns, ModelKind::SmallMolecule);
        names
    }

    /// Opens (or reuses) the structures named by each host object's
    /// attributes, binds the object to the resulting models and reads its
    /// functional-residue annotations.
    pub fn open_structures(
        &mut self,
        host: &dyn HostGraph,
        objects: &[HostObjectId],
    ) -> Result<Vec<ModelKey>, EngineError> {
        let mut touched = Vec::new();
        for &object in objects {
            let Some(network) = host.network_of(object) else {
                debug!(%object, "Host object is not part of any network");
                continue;
            };
            for (name, kind) in self.structure_names(host, object) {
                let existing: Vec<ModelKey> = self
                    .registry
                    .list_by_name(&name)
                    .iter()
                    .map(|m| m.key())
                    .collect();
                let keys = if existing.is_empty() {
                    self.open_structure(&name, kind)?
                } else {
                    existing
                };
                for key in keys {
                    self.synchronizer.bind(
                        &mut self.registry,
                        object,
                        network,
                        StructuralObject::Model(key),
                    );
                    self.annotate_functional_residues(host, object, key);
                    if !touched.contains(&key) {
                        touched.push(key);
                    }
                }
            }
        }
        Ok(touched)
    }

    fn annotate_functional_residues(&mut self, host: &dyn HostGraph, object: HostObjectId, key: ModelKey) {
        let Some(model) = self.registry.get_mut(key) else {
            return;
        };
        let mut residues: Vec<ResidueRef> = model.functional_residues().to_vec();
        for column in &self.columns.residue_columns {
            let Some(value) = host.attribute(object, column) else {
                continue;
            };
            for entry in value.entries() {
                if let Some(residue) = parse_functional_residue(&entry, &model.name, key) {
                    if !residues.contains(&residue) {
                        residues.push(residue);
                    }
                }
            }
        }
        model.set_functional_residues(residues);
    }

    /// Closes every model bound to the given host objects.
    pub fn close_structures(&mut self, objects: &[HostObjectId]) -> Result<Vec<ModelKey>, EngineError> {
        let mut models: Vec<ModelKey> = objects
            .iter()
            .flat_map(|&o| self.synchronizer.bindings().objects_for(o))
            .filter(|o| o.is_model())
            .map(|o| o.owning_model())
            .collect();
        models.sort();
        models.dedup();
        for &key in &models {
            self.close_model(key)?;
        }
        Ok(models)
    }

    pub fn close_model(&mut self, key: ModelKey) -> Result<(), EngineError> {
        let result = match self.gateway.as_ref() {
            Some(gateway) => self.registry.close(gateway, key).map(|_| ()),
            None => Err(GatewayError::NotRunning.into()),
        };
        let result = self.check(result);
        if result.is_ok() {
            self.synchronizer.unbind_model(key);
        }
        result
    }

    /// Re-reads the viewer's model list and cascades dropped models through
    /// the bindings.
    pub fn refresh_models(&mut self) -> Result<RefreshReport, EngineError> {
        let result = match self.gateway.as_ref() {
            Some(gateway) => self.registry.refresh(gateway),
            None => Err(GatewayError::NotRunning.into()),
        };
        let report = self.check(result)?;
        for &(from, to) in &report.retained {
            self.synchronizer.rekey_model(from, to);
        }
        for model in &report.dropped {
            self.synchronizer.unbind_model(model.key());
        }
        self.synchronizer.restore_flags(&mut self.registry);
        Ok(report)
    }

    pub fn host_selection_changed(&mut self, event: &SelectionEvent) -> Result<(), EngineError> {
        let result = match self.gateway.as_ref() {
            Some(gateway) => {
                self.synchronizer
                    .on_host_selection_changed(event, &mut self.registry, gateway)
            }
            None => Err(GatewayError::NotRunning.into()),
        };
        self.check(result)
    }

    pub fn reconcile_external_selection(&mut self, host: &mut dyn HostGraph) -> Result<(), EngineError> {
        let result = match self.gateway.as_ref() {
            Some(gateway) => {
                self.synchronizer
                    .on_external_selection_changed(&mut self.registry, gateway, host)
            }
            None => Err(GatewayError::NotRunning.into()),
        };
        self.check(result)
    }

    pub fn select_functional_residues(
        &mut self,
        host: &mut dyn HostGraph,
        models: &[ModelKey],
    ) -> Result<(), EngineError> {
        let result = match self.gateway.as_ref() {
            Some(gateway) => self.synchronizer.select_functional_residues(
                &mut self.registry,
                gateway,
                host,
                models,
            ),
            None => Err(GatewayError::NotRunning.into()),
        };
        self.check(result)
    }

    /// Drains pending viewer notifications and acts on them once per kind:
    /// model changes refresh the registry, and either kind of change
    /// reconciles the selection. Loss of the viewer tears the session down.
    pub fn process_notifications(&mut self, host: &mut dyn HostGraph) -> Result<NotificationSummary, EngineError> {
        let Some(gateway) = self.gateway.as_ref() else {
            return Ok(NotificationSummary::default());
        };
        let mut summary = NotificationSummary::default();
        for notification in gateway.drain_notifications() {
            match notification {
                Notification::ModelChanged => summary.models_changed = true,
                Notification::SelectionChanged => summary.selection_changed = true,
                Notification::Lost => summary.lost = true,
            }
        }
        if summary.lost {
            self.teardown();
            return Ok(summary);
        }
        if summary.models_changed {
            self.refresh_models()?;
        }
        if summary.models_changed || summary.selection_changed {
            self.reconcile_external_selection(host)?;
        }
        Ok(summary)
    }

    /// Hands a derived network to the host and binds each of its nodes to
    /// the residue it stands for.
    pub fn register_network(
        &mut self,
        host: &mut dyn HostGraph,
        network: &InteractionNetwork,
    ) -> RegisteredNetwork {
        let registered = host.register_network(network);
        for (node, &object) in network.nodes().iter().zip(&registered.nodes) {
            self.synchronizer.bind(
                &mut self.registry,
                object,
                registered.id,
                node.residue.clone().into(),
            );
        }
        info!(
            network = %registered.id,
            nodes = registered.nodes.len(),
            "Registered interaction network"
        );
        registered
    }

    pub fn unregister_network(&mut self, network: NetworkId) -> Vec<HostObjectId> {
        self.synchronizer.unbind_network(&mut self.registry, network)
    }

    pub fn presets(&mut self) -> Result<Vec<String>, EngineError> {
        let result = match self.gateway.as_ref() {
            Some(gateway) => gateway.presets().map_err(EngineError::from),
            None => Err(GatewayError::NotRunning.into()),
        };
        self.check(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::commands;
    use crate::engine::host::{AttributeValue, MemoryHost};
    use crate::engine::testing::ScriptedTool;

    fn session_with_tool() -> (ScriptedTool, Session) {
        let (tool, gateway) = ScriptedTool::spawn();
        let mut session = Session::new(ColumnConfig::default());
        session.attach(gateway);
        (tool, session)
    }

    fn script_1tkk(tool: &ScriptedTool) {
        tool.respond("open 1tkk", &["#0, chain A: protein"]);
        tool.respond(
            "listr spec #0",
            &[
                "residue id #0:1.A type MET",
                "residue id #0:2.A type ALA",
                "residue id #0:3.A type GLY",
            ],
        );
    }

    #[test]
    fn structure_names_come_from_configured_columns() {
        let (_tool, session) = session_with_tool();
        let mut host = MemoryHost::new();
        let net = host.add_network("ppi");
        let node = host.add_object(net);
        host.set_attribute(node, "pdb", AttributeValue::Text("1tkk, 2xyz".to_string()));
        host.set_attribute(node, "SMILES", AttributeValue::List(vec!["CCO".to_string()]));
        host.set_attribute(node, "unrelated", AttributeValue::Text("3abc".to_string()));
        assert_eq!(
            session.structure_names(&host, node),
            vec![
                ("1tkk".to_string(), ModelKind::FileStructure),
                ("2xyz".to_string(), ModelKind::FileStructure),
                ("CCO".to_string(), ModelKind::SmallMolecule),
            ]
        );
    }

    #[test]
    fn open_structures_binds_models_and_reads_functional_residues() {
        let (tool, mut session) = session_with_tool();
        script_1tkk(&tool);
        let mut host = MemoryHost::new();
        let net = host.add_network("ppi");
        let node = host.add_object(net);
        host.set_attribute(node, "pdb", AttributeValue::Text("1tkk".to_string()));
        host.set_attribute(node, "FunctionalResidues", AttributeValue::Text("2.A, 9xyz#1.A".to_string()));

        let opened = session.open_structures(&host, &[node]).unwrap();
        let key = ModelKey::new(0, 0);
        assert_eq!(opened, vec![key]);
        let model = session.registry().get(key).unwrap();
        assert!(model.host_objects().contains_key(&node));
        assert_eq!(model.functional_residues(), &[ResidueRef::new(key, "A", "2")]);
        assert!(session.synchronizer().bindings().is_consistent());

        // A second request reuses the open model.
        session.open_structures(&host, &[node]).unwrap();
        let opens = tool
            .commands()
            .iter()
            .filter(|c| c.starts_with("open "))
            .count();
        assert_eq!(opens, 1);

        session
            .select_functional_residues(&mut host, &[key])
            .unwrap();
        assert!(tool
            .commands()
            .contains(&"listen stop select; sel #0:2.A; listen start select".to_string()));
    }

    #[test]
    fn close_structures_closes_bound_models() {
        let (tool, mut session) = session_with_tool();
        script_1tkk(&tool);
        let mut host = MemoryHost::new();
        let net = host.add_network("ppi");
        let node = host.add_object(net);
        host.set_attribute(node, "pdb", AttributeValue::Text("1tkk".to_string()));
        session.open_structures(&host, &[node]).unwrap();

        let closed = session.close_structures(&[node]).unwrap();
        assert_eq!(closed, vec![ModelKey::new(0, 0)]);
        assert!(session.registry().is_empty());
        assert!(session.synchronizer().bindings().is_empty());
        assert!(tool.commands().contains(&"close #0".to_string()));
    }

    #[test]
    fn refresh_drops_missing_models_and_cascades_bindings() {
        let (tool, mut session) = session_with_tool();
        script_1tkk(&tool);
        tool.respond("open 2xyz", &["#1, chain A: protein"]);
        tool.respond("listr spec #1", &["residue id #1:1.A type SER"]);
        let mut host = MemoryHost::new();
        let net = host.add_network("ppi");
        let a = host.add_object(net);
        let b = host.add_object(net);
        host.set_attribute(a, "pdb", AttributeValue::Text("1tkk".to_string()));
        host.set_attribute(b, "pdb", AttributeValue::Text("2xyz".to_string()));
        session.open_structures(&host, &[a, b]).unwrap();

        tool.respond("listm type molecule", &["model id #0 type Molecule name 1tkk"]);
        let report = session.refresh_models().unwrap();
        assert_eq!(report.dropped.len(), 1);
        assert!(!session.registry().has(ModelKey::new(1, 0)));
        let bindings = session.synchronizer().bindings();
        assert_eq!(bindings.objects_for(b).count(), 0);
        assert_eq!(bindings.objects_for(a).count(), 1);
        assert!(bindings.is_consistent());
    }

    #[test]
    fn refresh_timeout_keeps_registry_and_bindings_in_step() {
        let (tool, gateway) = ScriptedTool::spawn_with_timeout(std::time::Duration::from_millis(200));
        let mut session = Session::new(ColumnConfig::default());
        session.attach(gateway);
        script_1tkk(&tool);
        tool.respond("open 2xyz", &["#1, chain A: protein"]);
        tool.respond("listr spec #1", &["residue id #1:1.A type SER"]);
        let mut host = MemoryHost::new();
        let net = host.add_network("ppi");
        let a = host.add_object(net);
        let b = host.add_object(net);
        host.set_attribute(a, "pdb", AttributeValue::Text("1tkk".to_string()));
        host.set_attribute(b, "pdb", AttributeValue::Text("2xyz".to_string()));
        session.open_structures(&host, &[a, b]).unwrap();

        tool.respond(
            "listm type molecule",
            &["model id #0 type Molecule name 1tkk", "model id #1 type Molecule name 2xyz"],
        );
        tool.silence("listm type molecule attr color spec #1");
        let result = session.refresh_models();
        assert!(matches!(
            result,
            Err(EngineError::Gateway(GatewayError::ReplyTimeout { .. }))
        ));

        assert!(session.is_running());
        assert_eq!(session.registry().len(), 2);
        let bindings = session.synchronizer().bindings();
        assert!(bindings
            .objects()
            .all(|object| session.registry().has(object.owning_model())));
        assert_eq!(bindings.objects_for(b).count(), 1);
    }

    #[test]
    fn notifications_are_coalesced() {
        let (tool, mut session) = session_with_tool();
        script_1tkk(&tool);
        session.open_structure("1tkk", ModelKind::FileStructure).unwrap();
        tool.respond("listm type molecule", &["model id #0 type Molecule name 1tkk"]);
        tool.notify("SelectionChanged: x");
        tool.notify("SelectionChanged: y");
        tool.notify("ModelChanged: z");
        session.gateway().unwrap().send_command(commands::FOCUS, true).unwrap();
        tool.clear_commands();

        let mut host = MemoryHost::new();
        let summary = session.process_notifications(&mut host).unwrap();
        assert!(summary.models_changed && summary.selection_changed && !summary.lost);
        let commands = tool.commands();
        assert_eq!(commands.iter().filter(|c| *c == commands::LIST_MODELS).count(), 1);
        assert_eq!(
            commands
                .iter()
                .filter(|c| *c == commands::LIST_SELECTED_RESIDUES)
                .count(),
            1
        );
    }

    #[test]
    fn losing_the_viewer_tears_the_session_down() {
        let (tool, mut session) = session_with_tool();
        script_1tkk(&tool);
        session.open_structure("1tkk", ModelKind::FileStructure).unwrap();
        tool.silence("preset list");
        tool.close_after_next_command();
        assert!(session.presets().is_err());
        assert!(!session.is_running());
        assert!(session.registry().is_empty());

        let mut host = MemoryHost::new();
        let summary = session.process_notifications(&mut host).unwrap();
        assert_eq!(summary, NotificationSummary::default());
        assert!(matches!(
            session.open_structure("1tkk", ModelKind::FileStructure),
            Err(EngineError::Gateway(GatewayError::NotRunning))
        ));
    }

    #[test]
    fn lost_notification_triggers_teardown() {
        let (tool, mut session) = session_with_tool();
        script_1tkk(&tool);
        session.open_structure("1tkk", ModelKind::FileStructure).unwrap();
        tool.close_after_next_command();
        let _ = session.gateway().unwrap().send_command(commands::FOCUS, false);
        // Wait for the reader to observe the closed stream.
        for _ in 0..100 {
            if !session.gateway().unwrap().is_running() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        let mut host = MemoryHost::new();
        let summary = session.process_notifications(&mut host).unwrap();
        assert!(summary.lost);
        assert!(session.registry().is_empty());
        assert!(session.gateway().is_err());
    }

    #[test]
    fn registered_network_nodes_are_bound_to_residues() {
        let (tool, mut session) = session_with_tool();
        script_1tkk(&tool);
        let key = session.open_structure("1tkk", ModelKind::FileStructure).unwrap()[0];
        let model = session.registry().get(key).unwrap();
        let mut network = InteractionNetwork::new("RIN 1tkk");
        for (_, residue) in model.residues_iter() {
            network.add_node(residue, &model.name, false);
        }
        let mut host = MemoryHost::new();
        let registered = session.register_network(&mut host, &network);
        assert_eq!(registered.nodes.len(), 3);
        let first = registered.nodes[0];
        let bound: Vec<&StructuralObject> = session.synchronizer().bindings().objects_for(first).collect();
        assert_eq!(bound, vec![&StructuralObject::from(network.nodes()[0].residue.clone())]);

        let event = host.select([(first, true)]);
        session.host_selection_changed(&event).unwrap();
        let spec = network.nodes()[0].residue.clone();
        assert!(session.registry().is_selected(&spec.into()));

        let removed = session.unregister_network(registered.id);
        assert_eq!(removed.len(), 3);
        assert!(session.synchronizer().bindings().is_empty());
    }
}
