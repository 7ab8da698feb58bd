use super::ids::{ChainId, ModelKey};
use super::object::ResidueRef;
use crate::core::utils::identifiers;

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub model: ModelKey,
    pub index: String,        // Sequence index as reported (may carry an insertion code)
    pub chain: String,        // Chain identifier, empty when the residue has no chain
    pub residue_type: String, // Three-letter residue code (e.g. "ALA", "HOH")
    pub(crate) chain_id: Option<ChainId>,
    pub(crate) selected: bool,
}

impl Residue {
    pub(crate) fn new(
        model: ModelKey,
        chain: &str,
        index: &str,
        residue_type: &str,
        chain_id: Option<ChainId>,
    ) -> Self {
        Self {
            model,
            index: index.to_string(),
            chain: chain.to_string(),
            residue_type: residue_type.to_string(),
            chain_id,
            selected: false,
        }
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.chain_id
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn reference(&self) -> ResidueRef {
        ResidueRef::new(self.model, self.chain.clone(), self.index.clone())
    }

    /// Three-letter label used in node names, e.g. `ALA 12`.
    pub fn label(&self) -> String {
        format!("{} {}", self.residue_type, self.index)
    }

    pub fn small_molecule_code(&self) -> Option<&'static str> {
        identifiers::small_molecule_code(&self.residue_type)
    }

    pub fn is_water(&self) -> bool {
        identifiers::is_water(&self.residue_type)
    }
}
