//! Cluster Configuration
//!
//! The resolved, authoritative description of a local cluster: identity, node count,
//! image, runtime selection, bind mounts, join token and per-machine records.

use serde::Serialize;

mod bindmount;
mod machine;
mod runtime;

pub use bindmount::{Bindmount, PathMap};
pub use machine::{machine_name, MachineConfiguration};
pub use runtime::{
    validate_profile, ContainerRuntime, CrioProfile, RktProfile, RuntimeConfiguration,
    RuntimeProfile, RuntimeWarning,
};

use crate::error::UnknownRuntime;
use crate::validation::{self, ValidationError};

/// Aggregate root for a cluster's desired and observed state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterConfiguration {
    #[serde(rename = "dir")]
    pub kube_spawn_dir: String,
    pub cni_plugin_dir: String,

    #[serde(rename = "cluster-name")]
    pub name: String,
    pub container_runtime: String,
    pub kubernetes_version: String,
    pub image: String,
    pub nodes: i64,

    /// Run from a local kubernetes build
    #[serde(rename = "dev")]
    pub dev_cluster: bool,
    pub hyperkube_tag: String,

    pub runtime_config: RuntimeConfiguration,

    /// Files copied from the host into every machine for this session only. Never persisted.
    #[serde(skip)]
    pub copymap: Vec<PathMap>,

    pub bindmount: Bindmount,

    /// Generated on kubeadm init and used to join workers
    pub token: String,
    pub token_groups_option: String,

    pub machines: Vec<MachineConfiguration>,
}

impl ClusterConfiguration {
    /// The runtime selected by `container_runtime`.
    pub fn runtime(&self) -> Result<ContainerRuntime, UnknownRuntime> {
        ContainerRuntime::select(&self.container_runtime)
    }

    pub fn machine(&self, name: &str) -> Option<&MachineConfiguration> {
        self.machines.iter().find(|m| m.name == name)
    }

    pub fn running_machines(&self) -> impl Iterator<Item = &MachineConfiguration> {
        self.machines.iter().filter(|m| m.running)
    }

    /// Cluster-wide mounts followed by the machine's own.
    pub fn effective_bindmount(&self, machine: &MachineConfiguration) -> Bindmount {
        self.bindmount.union(&machine.bindmount)
    }

    /// Inert runtime blocks that carry settings.
    pub fn runtime_warnings(&self) -> Vec<RuntimeWarning> {
        validate_profile(&self.runtime_config, &self.container_runtime)
    }

    /// Validate the entire configuration, collecting every violation.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let errors = validation::validate(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
