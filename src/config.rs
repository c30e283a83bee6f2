//! Configuration Layers
//!
//! Partial cluster configurations used as merge layers: built-in defaults, the persisted
//! store and explicit overrides. Every field is optional so a layer only speaks for the
//! fields it sets. Keys are snake_case; the on-disk kebab-case mapping lives in
//! [`crate::store`].

use crate::cluster::PathMap;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod defaults;
mod sources;

pub use defaults::{
    builder_with_defaults, builtin_defaults, DEFAULT_CGROUP_PER_QOS, DEFAULT_CNI_PLUGIN_DIR,
    DEFAULT_CONTAINER_RUNTIME, DEFAULT_IMAGE, DEFAULT_KUBERNETES_VERSION, DEFAULT_KUBE_SPAWN_DIR,
    DEFAULT_NODES, DEFAULT_RUNTIME_TIMEOUT,
};
pub use sources::environment::ENV_PREFIX;

/// Where a layer came from. Decides which fields the layer may set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Defaults,
    Persisted,
    Overrides,
}

impl Layer {
    /// Tool-owned machine facts (`ip`, `running`) are only taken from what the tool wrote.
    pub fn may_set_tool_owned(self) -> bool {
        matches!(self, Layer::Persisted)
    }
}

/// One layer of cluster configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterPatch {
    pub kube_spawn_dir: Option<String>,
    pub cni_plugin_dir: Option<String>,
    pub name: Option<String>,
    pub container_runtime: Option<String>,
    pub kubernetes_version: Option<String>,
    pub image: Option<String>,
    pub nodes: Option<i64>,
    pub dev_cluster: Option<bool>,
    pub hyperkube_tag: Option<String>,
    pub runtime_config: RuntimePatch,
    pub copymap: Option<Vec<PathMap>>,
    pub bindmount: BindmountPatch,
    /// An empty string clears the token.
    pub token: Option<String>,
    pub token_groups_option: Option<String>,
    /// Merged by machine name.
    pub machines: Vec<MachinePatch>,
    /// Machines to drop by name. Running machines cannot be dropped.
    pub remove_machines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimePatch {
    pub endpoint: Option<String>,
    pub timeout: Option<String>,
    pub use_legacy_cgroup_driver: Option<bool>,
    pub cgroup_per_qos: Option<bool>,
    pub fail_swap_on: Option<bool>,
    pub rkt: RktPatch,
    pub crio: CrioPatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RktPatch {
    pub rkt_bin: Option<String>,
    pub stage1_image: Option<String>,
    pub rktlet_bin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrioPatch {
    pub crio_bin: Option<String>,
    pub runc_bin: Option<String>,
    pub conmon_bin: Option<String>,
}

/// Sequences are leaves: a layer that sets one replaces it whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindmountPatch {
    pub read_only: Option<Vec<PathMap>>,
    pub read_write: Option<Vec<PathMap>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachinePatch {
    pub name: String,
    pub running: Option<bool>,
    pub ip: Option<String>,
    pub bindmount: BindmountPatch,
}

impl ClusterPatch {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

impl MachinePatch {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Where environment overrides are read from.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The process environment
    #[default]
    Process,
    /// A fixed set of variables, for tests and embedding
    Vars(config::Map<String, String>),
    Disabled,
}

/// Loads the overrides layer: an optional overrides file, then `KSPAWN_*` environment
/// variables. Command-line flags are applied on top by the caller.
#[derive(Debug, Clone, Default)]
pub struct OverrideLoader {
    file: Option<PathBuf>,
    environment: EnvSource,
}

impl OverrideLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: Option<&Path>) -> Self {
        self.file = path.map(Path::to_path_buf);
        self
    }

    pub fn environment(mut self, source: EnvSource) -> Self {
        self.environment = source;
        self
    }

    pub fn load(&self) -> Result<ClusterPatch, ApiError> {
        let builder = config::Config::builder();
        let builder = sources::file::add_to_builder(builder, self.file.as_deref())?;
        let builder = sources::environment::add_to_builder(builder, &self.environment)?;
        let patch: ClusterPatch = builder.build()?.try_deserialize()?;
        tracing::debug!(
            file = ?self.file,
            nodes = ?patch.nodes,
            runtime = ?patch.container_runtime,
            "Loaded override layer"
        );
        Ok(patch)
    }
}
