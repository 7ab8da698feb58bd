//! # Core Models Module
//!
//! Data structures describing what is open in the external viewer: models,
//! their chains and residues, and the value references used to address them.
//!
//! ## Key Components
//!
//! - [`ids`] - Model keys, arena keys and host-side identities
//! - [`object`] - Value references (`ChainRef`, `ResidueRef`) and the
//!   [`object::StructuralObject`] tagged variant with its [`object::Structural`] capability trait
//! - [`structure`] - [`structure::StructuralModel`], owning its chain and residue arenas
//! - [`chain`] / [`residue`] - Per-entity records
//!
//! ## Usage
//!
//! ```ignore
//! use structlink::core::models::{ids::ModelKey, structure::{ModelKind, StructuralModel}};
//!
//! let mut model = StructuralModel::new(ModelKey::new(0, 0), "1abc", ModelKind::FileStructure);
//! model.add_residue("A", "12", "ALA");
//! assert_eq!(model.residue_count(), 1);
//! ```

pub mod chain;
pub mod ids;
pub mod object;
pub mod residue;
pub mod structure;
