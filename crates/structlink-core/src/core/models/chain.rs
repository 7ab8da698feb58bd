use super::ids::{ModelKey, ResidueId};
use super::object::ChainRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub model: ModelKey,
    pub id: String,                      // Chain identifier as reported by the viewer (e.g. "A")
    pub(crate) residues: Vec<ResidueId>, // Residues in the order the viewer listed them
    pub(crate) selected: bool,
}

impl Chain {
    pub(crate) fn new(model: ModelKey, id: &str) -> Self {
        Self {
            model,
            id: id.to_string(),
            residues: Vec::new(),
            selected: false,
        }
    }

    pub fn residues(&self) -> &[ResidueId] {
        &self.residues
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn reference(&self) -> ChainRef {
        ChainRef::new(self.model, self.id.clone())
    }
}
