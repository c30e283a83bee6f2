//! Validation
//!
//! Checks a resolved configuration and reports every violation at once. Never mutates
//! the configuration and never stops at the first problem.

use crate::cluster::{
    Bindmount, ClusterConfiguration, ContainerRuntime, PathMap, RuntimeProfile,
};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("cluster-name must not be empty")]
    MissingClusterName,

    #[error("nodes must not be negative (got {0})")]
    InvalidNodeCount(i64),

    #[error("container-runtime '{0}' is not one of docker, rkt, crio")]
    UnknownRuntime(String),

    #[error("runtime-config.{runtime} is missing {}", .missing.join(", "))]
    IncompleteRuntimeConfig {
        runtime: ContainerRuntime,
        missing: Vec<&'static str>,
    },

    #[error("{scope}: more than one bind mount targets '{dst}'")]
    DuplicateBindDestination { scope: String, dst: String },

    #[error("{location}: path mapping needs both src and dst (src '{src}', dst '{dst}')")]
    InvalidPathMapping {
        location: String,
        src: String,
        dst: String,
    },

    #[error("nodes is {nodes} but {machines} machine records exist")]
    MachineCountMismatch { nodes: i64, machines: usize },
}

/// Collect every violation in `config`.
pub fn validate(config: &ClusterConfiguration) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.name.is_empty() {
        errors.push(ValidationError::MissingClusterName);
    }
    if config.nodes < 0 {
        errors.push(ValidationError::InvalidNodeCount(config.nodes));
    }

    match config.runtime() {
        Ok(runtime) => {
            let missing = config
                .runtime_config
                .profile(runtime)
                .map(|profile| profile.missing_fields())
                .unwrap_or_else(|| RuntimeProfile::empty(runtime).missing_fields());
            if !missing.is_empty() {
                errors.push(ValidationError::IncompleteRuntimeConfig { runtime, missing });
            }
        }
        Err(unknown) => errors.push(ValidationError::UnknownRuntime(unknown.0)),
    }

    check_mappings(&mut errors, "bindmount", &config.bindmount);
    check_sequence(&mut errors, "copymap", &config.copymap);
    for machine in &config.machines {
        let scope = format!("machines[{}].bindmount", machine.name);
        check_mappings(&mut errors, &scope, &machine.bindmount);
    }

    check_destinations(&mut errors, config);

    // Consistency assertion on resolution output; skipped when the count itself is invalid.
    if config.nodes >= 0 && config.machines.len() as i64 != config.nodes {
        errors.push(ValidationError::MachineCountMismatch {
            nodes: config.nodes,
            machines: config.machines.len(),
        });
    }

    errors
}

fn check_mappings(errors: &mut Vec<ValidationError>, scope: &str, mounts: &Bindmount) {
    check_sequence(errors, &format!("{}.read-only", scope), &mounts.read_only);
    check_sequence(errors, &format!("{}.read-write", scope), &mounts.read_write);
}

fn check_sequence(errors: &mut Vec<ValidationError>, scope: &str, maps: &[PathMap]) {
    for (index, map) in maps.iter().enumerate() {
        if !map.is_valid() {
            errors.push(ValidationError::InvalidPathMapping {
                location: format!("{}[{}]", scope, index),
                src: map.src.clone(),
                dst: map.dst.clone(),
            });
        }
    }
}

/// Destinations must be unique in the cluster-wide set and in each machine's effective
/// set (cluster-wide entries followed by the machine's own). Clashes inside the
/// cluster-wide set are reported once, under "bindmount".
fn check_destinations(errors: &mut Vec<ValidationError>, config: &ClusterConfiguration) {
    let mut cluster_dsts = HashSet::new();
    let mut reported = HashSet::new();
    for map in config.bindmount.iter().filter(|m| !m.dst.is_empty()) {
        if !cluster_dsts.insert(map.dst.as_str()) && reported.insert(map.dst.as_str()) {
            errors.push(ValidationError::DuplicateBindDestination {
                scope: "bindmount".to_string(),
                dst: map.dst.clone(),
            });
        }
    }

    for machine in &config.machines {
        let mut seen = cluster_dsts.clone();
        let mut reported = HashSet::new();
        for map in machine.bindmount.iter().filter(|m| !m.dst.is_empty()) {
            if !seen.insert(map.dst.as_str()) && reported.insert(map.dst.as_str()) {
                errors.push(ValidationError::DuplicateBindDestination {
                    scope: format!("machines[{}]", machine.name),
                    dst: map.dst.clone(),
                });
            }
        }
    }
}
