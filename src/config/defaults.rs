//! Built-in defaults: the lowest-precedence layer.

use crate::config::ClusterPatch;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

pub const DEFAULT_KUBE_SPAWN_DIR: &str = "/var/lib/kube-spawn";
pub const DEFAULT_CNI_PLUGIN_DIR: &str = "/opt/cni/bin";
pub const DEFAULT_CONTAINER_RUNTIME: &str = "docker";
pub const DEFAULT_KUBERNETES_VERSION: &str = "v1.10.5";
pub const DEFAULT_IMAGE: &str = "coreos";
pub const DEFAULT_NODES: i64 = 3;
pub const DEFAULT_RUNTIME_TIMEOUT: &str = "15m";
pub const DEFAULT_CGROUP_PER_QOS: bool = true;

/// Create a Config builder with the built-in defaults applied.
///
/// Runtime-specific blocks are never defaulted; they would otherwise show up as inert
/// settings whenever another runtime is selected.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("kube_spawn_dir", DEFAULT_KUBE_SPAWN_DIR)?
        .set_default("cni_plugin_dir", DEFAULT_CNI_PLUGIN_DIR)?
        .set_default("container_runtime", DEFAULT_CONTAINER_RUNTIME)?
        .set_default("kubernetes_version", DEFAULT_KUBERNETES_VERSION)?
        .set_default("image", DEFAULT_IMAGE)?
        .set_default("nodes", DEFAULT_NODES)?
        .set_default("dev_cluster", false)?
        .set_default("runtime_config.timeout", DEFAULT_RUNTIME_TIMEOUT)?
        .set_default("runtime_config.use_legacy_cgroup_driver", false)?
        .set_default("runtime_config.cgroup_per_qos", DEFAULT_CGROUP_PER_QOS)?
        .set_default("runtime_config.fail_swap_on", false)
}

/// Built-in defaults as a merge layer.
pub fn builtin_defaults() -> Result<ClusterPatch, ConfigError> {
    builder_with_defaults()?.build()?.try_deserialize()
}
