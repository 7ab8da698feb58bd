//! Text protocol support for the external viewer.
//!
//! This module builds the command lines sent to the viewer and parses the
//! replies it prints: listing records (models, residues, colors, presets),
//! the tabular output of structural analyses, and the CSV tables a derived
//! network is exported to.

pub mod analysis;
pub mod commands;
pub mod error;
pub mod export;
pub mod records;
