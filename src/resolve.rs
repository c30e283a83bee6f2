//! Resolution Engine
//!
//! Merges defaults, the persisted store and explicit overrides into one
//! [`ClusterConfiguration`], then reconciles the machine records against `nodes`.
//! Resolution is pure: on error nothing has been applied anywhere.

use crate::cluster::{
    Bindmount, ClusterConfiguration, ContainerRuntime, CrioProfile, MachineConfiguration,
    RktProfile, RuntimeConfiguration, RuntimeProfile,
};
use crate::config::{BindmountPatch, ClusterPatch, Layer, MachinePatch, RuntimePatch};
use crate::error::ResolveError;
use std::collections::BTreeMap;
use tracing::{info, warn};

mod merge;
mod reconcile;

use merge::Merger;

/// Resolve layers in precedence order `defaults < persisted < overrides`.
pub fn resolve(
    defaults: &ClusterPatch,
    persisted: Option<&ClusterPatch>,
    overrides: &ClusterPatch,
) -> Result<ClusterConfiguration, ResolveError> {
    let mut merger = Merger::new();
    merger.apply(Layer::Defaults, defaults)?;
    if let Some(persisted) = persisted {
        merger.apply(Layer::Persisted, persisted)?;
    }
    merger.apply(Layer::Overrides, overrides)?;

    let mut config = build(merger.finish());
    reconcile::reconcile_nodes(&mut config)?;

    for warning in config.runtime_warnings() {
        warn!("{}", warning);
    }
    info!(
        cluster = %config.name,
        nodes = config.nodes,
        runtime = %config.container_runtime,
        "Resolved cluster configuration"
    );
    Ok(config)
}

/// A stored layer over `defaults`, as written: no overrides, no reconciliation.
pub fn materialize(defaults: &ClusterPatch, stored: &ClusterPatch) -> ClusterConfiguration {
    let mut merger = Merger::new();
    merger.merge(Layer::Defaults, defaults);
    merger.merge(Layer::Persisted, stored);
    build(merger.finish())
}

fn build(patch: ClusterPatch) -> ClusterConfiguration {
    let container_runtime = patch.container_runtime.unwrap_or_default();
    let runtime_config = build_runtime(&container_runtime, patch.runtime_config);
    let machines: Vec<MachineConfiguration> =
        patch.machines.into_iter().map(build_machine).collect();
    // Without an explicit count the records already present are the desired state.
    let nodes = patch.nodes.unwrap_or(machines.len() as i64);

    ClusterConfiguration {
        kube_spawn_dir: patch.kube_spawn_dir.unwrap_or_default(),
        cni_plugin_dir: patch.cni_plugin_dir.unwrap_or_default(),
        name: patch.name.unwrap_or_default(),
        container_runtime,
        kubernetes_version: patch.kubernetes_version.unwrap_or_default(),
        image: patch.image.unwrap_or_default(),
        nodes,
        dev_cluster: patch.dev_cluster.unwrap_or(false),
        hyperkube_tag: patch.hyperkube_tag.unwrap_or_default(),
        runtime_config,
        copymap: patch.copymap.unwrap_or_default(),
        bindmount: build_bindmount(patch.bindmount),
        token: patch.token.unwrap_or_default(),
        token_groups_option: patch.token_groups_option.unwrap_or_default(),
        machines,
    }
}

/// The selector picks the active profile; other populated blocks become inert.
fn build_runtime(selector: &str, patch: RuntimePatch) -> RuntimeConfiguration {
    let selected = ContainerRuntime::select(selector).ok();
    let candidates = [
        RuntimeProfile::Rkt(RktProfile {
            rkt_bin: patch.rkt.rkt_bin.unwrap_or_default(),
            stage1_image: patch.rkt.stage1_image.unwrap_or_default(),
            rktlet_bin: patch.rkt.rktlet_bin.unwrap_or_default(),
        }),
        RuntimeProfile::Crio(CrioProfile {
            crio_bin: patch.crio.crio_bin.unwrap_or_default(),
            runc_bin: patch.crio.runc_bin.unwrap_or_default(),
            conmon_bin: patch.crio.conmon_bin.unwrap_or_default(),
        }),
    ];

    let mut active = selected.map(RuntimeProfile::empty);
    let mut inert = BTreeMap::new();
    for profile in candidates {
        if Some(profile.runtime()) == selected {
            active = Some(profile);
        } else if !profile.is_empty() {
            inert.insert(profile.runtime(), profile);
        }
    }

    RuntimeConfiguration {
        endpoint: patch.endpoint.filter(|endpoint| !endpoint.is_empty()),
        timeout: patch.timeout.unwrap_or_default(),
        use_legacy_cgroup_driver: patch.use_legacy_cgroup_driver.unwrap_or(false),
        cgroup_per_qos: patch.cgroup_per_qos.unwrap_or(false),
        fail_swap_on: patch.fail_swap_on.unwrap_or(false),
        active,
        inert,
    }
}

fn build_bindmount(patch: BindmountPatch) -> Bindmount {
    Bindmount {
        read_only: patch.read_only.unwrap_or_default(),
        read_write: patch.read_write.unwrap_or_default(),
    }
}

fn build_machine(patch: MachinePatch) -> MachineConfiguration {
    MachineConfiguration {
        running: patch.running.unwrap_or(false),
        name: patch.name,
        ip: patch.ip.unwrap_or_default(),
        bindmount: build_bindmount(patch.bindmount),
    }
}
