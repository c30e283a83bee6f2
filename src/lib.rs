//! kspawn: configuration for local kube-spawn clusters
//!
//! Resolves a cluster's configuration from built-in defaults, the stored `kspawn.toml`
//! and explicit overrides, validates it, and writes it back without disturbing hand
//! edits.

pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod logging;
pub mod provision;
pub mod resolve;
pub mod store;
pub mod validation;
