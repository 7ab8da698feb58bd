//! # structlink Core Library
//!
//! A bridge between graph-based network analysis and an external molecular
//! structure viewer running as a separate, long-lived process.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture so that protocol
//! details, stateful coordination and end-user procedures stay apart.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`StructuralModel`,
//!   `StructuralObject`, `InteractionNetwork`), the command builders and reply
//!   parsers of the viewer's text protocol, and CSV export.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer. It owns the viewer
//!   process through the `Gateway`, keeps the `Registry` of open models,
//!   reconciles selection in both directions through the `SelectionSynchronizer`,
//!   and ties them together in a `Session`.
//!
//! - **[`workflows`]: The Public API.** Complete procedures built on a
//!   session, such as deriving a residue interaction network from the
//!   viewer's structural analyses.

pub mod core;
pub mod engine;
pub mod workflows;
