//! On-disk schema of `kspawn.toml`, read side.
//!
//! Kebab-case keys as users write them. Unknown keys are ignored here and left
//! untouched in the document by saves.

use crate::cluster::PathMap;
use crate::config::{BindmountPatch, ClusterPatch, CrioPatch, MachinePatch, RktPatch, RuntimePatch};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub(crate) struct ClusterFile {
    dir: Option<String>,
    cni_plugin_dir: Option<String>,
    cluster_name: Option<String>,
    container_runtime: Option<String>,
    kubernetes_version: Option<String>,
    image: Option<String>,
    nodes: Option<i64>,
    dev: Option<bool>,
    hyperkube_tag: Option<String>,
    runtime_config: RuntimeFile,
    bindmount: BindmountFile,
    token: Option<String>,
    token_groups_option: Option<String>,
    machines: Vec<MachineFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct RuntimeFile {
    endpoint: Option<String>,
    timeout: Option<String>,
    use_legacy_cgroup_driver: Option<bool>,
    cgroup_per_qos: Option<bool>,
    fail_swap_on: Option<bool>,
    rkt: RktFile,
    crio: CrioFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct RktFile {
    rkt_bin: Option<String>,
    stage1_image: Option<String>,
    rktlet_bin: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct CrioFile {
    crio_bin: Option<String>,
    runc_bin: Option<String>,
    conmon_bin: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct BindmountFile {
    read_only: Option<Vec<PathMap>>,
    read_write: Option<Vec<PathMap>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct MachineFile {
    running: Option<bool>,
    name: String,
    ip: Option<String>,
    bindmount: BindmountFile,
}

impl ClusterFile {
    pub(crate) fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub(crate) fn cluster_name(&self) -> Option<&str> {
        self.cluster_name.as_deref()
    }

    pub(crate) fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The stored document as the persisted merge layer.
    pub(crate) fn into_patch(self) -> ClusterPatch {
        ClusterPatch {
            kube_spawn_dir: self.dir,
            cni_plugin_dir: self.cni_plugin_dir,
            name: self.cluster_name,
            container_runtime: self.container_runtime,
            kubernetes_version: self.kubernetes_version,
            image: self.image,
            nodes: self.nodes,
            dev_cluster: self.dev,
            hyperkube_tag: self.hyperkube_tag,
            runtime_config: RuntimePatch {
                endpoint: self.runtime_config.endpoint,
                timeout: self.runtime_config.timeout,
                use_legacy_cgroup_driver: self.runtime_config.use_legacy_cgroup_driver,
                cgroup_per_qos: self.runtime_config.cgroup_per_qos,
                fail_swap_on: self.runtime_config.fail_swap_on,
                rkt: RktPatch {
                    rkt_bin: self.runtime_config.rkt.rkt_bin,
                    stage1_image: self.runtime_config.rkt.stage1_image,
                    rktlet_bin: self.runtime_config.rkt.rktlet_bin,
                },
                crio: CrioPatch {
                    crio_bin: self.runtime_config.crio.crio_bin,
                    runc_bin: self.runtime_config.crio.runc_bin,
                    conmon_bin: self.runtime_config.crio.conmon_bin,
                },
            },
            copymap: None,
            bindmount: self.bindmount.into_patch(),
            token: self.token,
            token_groups_option: self.token_groups_option,
            machines: self
                .machines
                .into_iter()
                .map(|machine| MachinePatch {
                    name: machine.name,
                    running: machine.running,
                    ip: machine.ip,
                    bindmount: machine.bindmount.into_patch(),
                })
                .collect(),
            remove_machines: Vec::new(),
        }
    }
}

impl BindmountFile {
    fn into_patch(self) -> BindmountPatch {
        BindmountPatch {
            read_only: self.read_only,
            read_write: self.read_write,
        }
    }
}
