use super::{launch, open_all};
use crate::cli::{ModelsArgs, NetworkOverrides};
use crate::config::build_config;
use crate::error::Result;
use std::fmt::Write;
use structlink::core::models::object::Structural;
use structlink::engine::registry::Registry;
use tracing::info;

pub fn run(args: ModelsArgs) -> Result<()> {
    let config = build_config(&args.viewer, &NetworkOverrides::default())?;
    let mut session = launch(&config)?;

    let result = open_all(&mut session, &args.structures, args.kind.into());
    if result.is_ok() {
        info!(models = session.registry().len(), "Rendering model summary.");
        print!("{}", render_summary(session.registry()));
    }
    session.shutdown();
    result.map(|_| ())
}

/// One block per model: identity, kind, color and per-chain residue counts.
pub fn render_summary(registry: &Registry) -> String {
    let mut out = String::new();
    for model in registry.list_all() {
        let _ = writeln!(out, "{}  {}  ({})", model.key(), model.name, model.kind);
        if let Some(color) = &model.color {
            let _ = writeln!(out, "    color: {}", color);
        }
        let _ = writeln!(
            out,
            "    chains: {}  residues: {}",
            model.chain_count(),
            model.residue_count()
        );
        for (_, chain) in model.chains_iter() {
            let label = if chain.id.is_empty() { "-" } else { chain.id.as_str() };
            let _ = writeln!(out, "      {:<4}{:>6}", label, chain.residue_count());
        }
        let functional = model.functional_residues();
        if !functional.is_empty() {
            let specs: Vec<String> = functional.iter().map(|r| r.spec()).collect();
            let _ = writeln!(out, "    functional residues: {}", specs.join(" "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use structlink::core::models::ids::ModelKey;
    use structlink::core::models::structure::{Color, ModelKind, StructuralModel};

    #[test]
    fn summary_lists_models_in_key_order() {
        let mut registry = Registry::new();

        let mut ligand = StructuralModel::new(ModelKey::new(1, 0), "CCO", ModelKind::SmallMolecule);
        ligand.color = Some(Color {
            red: 1.0,
            green: 0.5,
            blue: 0.0,
        });
        registry.insert(ligand);

        let mut protein = StructuralModel::new(ModelKey::new(0, 0), "1tkk", ModelKind::FileStructure);
        protein.add_residue("A", "1", "MET");
        protein.add_residue("A", "2", "ALA");
        protein.add_residue("B", "1", "GLY");
        registry.insert(protein);

        let summary = render_summary(&registry);
        let protein_at = summary.find("#0  1tkk").unwrap();
        let ligand_at = summary.find("#1  CCO").unwrap();
        assert!(protein_at < ligand_at);
        assert!(summary.contains("chains: 2  residues: 3"));
        assert!(summary.contains("      A        2"));
        assert!(summary.contains("color: 1.000,0.500,0.000"));
    }

    #[test]
    fn empty_registry_renders_nothing() {
        assert!(render_summary(&Registry::new()).is_empty());
    }
}
