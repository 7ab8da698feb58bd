//! # Core Module
//!
//! Stateless building blocks shared by the rest of the library.
//!
//! ## Overview
//!
//! Nothing in this module talks to the external viewer. It describes what
//! the viewer holds, what the viewer is told and what it answers, and what a
//! derived network looks like.
//!
//! ## Architecture
//!
//! - **Structural Representation** ([`models`]) - Models, chains, residues and the value
//!   references used to address them across refreshes
//! - **Protocol I/O** ([`io`]) - Command builders, reply parsers and CSV export
//! - **Interaction Networks** ([`network`]) - Residue nodes and typed interaction edges
//! - **Identifier Tables** ([`utils`]) - Backbone atoms, water and small-molecule codes

pub mod io;
pub mod models;
pub mod network;
pub mod utils;
