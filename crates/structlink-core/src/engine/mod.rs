//! # Engine Module
//!
//! This module implements the stateful side of structlink: the connection to
//! the viewer process and everything that must stay consistent with it.
//!
//! ## Overview
//!
//! The viewer is an external program controlled over its standard streams.
//! The engine launches it, serializes commands and their framed replies,
//! mirrors the set of open models, and keeps selection in step between the
//! viewer and the host graph application, in both directions.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Launch parameters, network derivation settings and attribute columns
//! - **Process Gateway** ([`gateway`]) - Viewer process, request/reply framing and notifications
//! - **Structural Registry** ([`registry`]) - The models open in the viewer and their composition
//! - **Bindings** ([`bindings`]) - Links between host objects and structural objects
//! - **Selection Synchronizer** ([`synchronizer`]) - Two-way selection reconciliation
//! - **Host Boundary** ([`host`]) - The trait through which the host graph is seen
//! - **Session** ([`session`]) - The context tying all of the above together
//! - **Progress Monitoring** ([`progress`]) - Progress reporting for long-running workflows
//! - **Error Handling** ([`error`]) - Gateway and engine error types
//!
//! ## Key Capabilities
//!
//! - **Single in-flight command** with a bounded wait for each reply
//! - **Notification suppression** while the engine itself changes the viewer
//! - **Identity-preserving refresh** of models across viewer-side renumbering
//! - **Coarsened selection mirroring** so whole chains and models are sent as such
//! - **Automatic teardown** when the viewer process goes away

pub mod bindings;
pub mod config;
pub mod error;
pub mod gateway;
pub mod host;
pub mod progress;
pub mod registry;
pub mod session;
pub mod synchronizer;

#[cfg(test)]
pub(crate) mod testing;
