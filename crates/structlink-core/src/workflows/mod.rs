//! # Workflows Module
//!
//! This module provides the high-level procedures built on top of a
//! [`Session`](crate::engine::session::Session).
//!
//! ## Overview
//!
//! Workflows are the top-level entry points for users of structlink. Each one
//! drives a sequence of viewer commands, interprets the replies against the
//! registry, and returns a plain value the caller can export or hand to the
//! host application.
//!
//! ## Architecture
//!
//! - **Network Workflow** ([`network`]) - Derives a residue interaction network
//!   from contacts, clashes, hydrogen bonds, connectivity and distances
//!   computed by the viewer for the current selection.
//!
//! ## Key Capabilities
//!
//! - **Phase-by-phase progress reporting** through the engine's reporter
//! - **Tolerant reply handling** where an unusable analysis is skipped, not fatal
//! - **Notification suppression** for the duration of a workflow

pub mod network;
