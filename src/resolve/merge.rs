//! Layer merge: defaults, then persisted, then overrides, field by field.

use crate::config::{
    BindmountPatch, ClusterPatch, CrioPatch, Layer, MachinePatch, RktPatch, RuntimePatch,
};
use crate::error::ResolveError;
use tracing::{debug, info, warn};

/// Accumulates layers from lowest to highest precedence.
#[derive(Debug, Default)]
pub(crate) struct Merger {
    merged: ClusterPatch,
}

impl Merger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Check then merge one layer. A rejected layer leaves the accumulated state untouched.
    pub(crate) fn apply(&mut self, layer: Layer, patch: &ClusterPatch) -> Result<(), ResolveError> {
        self.check(layer, patch)?;
        self.merge(layer, patch);
        Ok(())
    }

    /// Preconditions that can reject a layer: token immutability and removal of running machines.
    fn check(&self, layer: Layer, patch: &ClusterPatch) -> Result<(), ResolveError> {
        next_token(&self.merged.token, layer, &patch.token)?;

        let still_running: Vec<String> = patch
            .remove_machines
            .iter()
            .filter(|name| {
                self.merged
                    .machines
                    .iter()
                    .any(|m| &m.name == *name && m.running == Some(true))
            })
            .cloned()
            .collect();
        if !still_running.is_empty() {
            return Err(ResolveError::MachineStillRunning(still_running));
        }
        Ok(())
    }

    /// Merge a layer whose preconditions hold. Stored layers always do.
    pub(crate) fn merge(&mut self, layer: Layer, patch: &ClusterPatch) {
        debug!(layer = ?layer, machines = patch.machines.len(), "Merging configuration layer");
        let merged = &mut self.merged;

        overlay(&mut merged.kube_spawn_dir, &patch.kube_spawn_dir);
        overlay(&mut merged.cni_plugin_dir, &patch.cni_plugin_dir);
        overlay(&mut merged.name, &patch.name);
        overlay(&mut merged.container_runtime, &patch.container_runtime);
        overlay(&mut merged.kubernetes_version, &patch.kubernetes_version);
        overlay(&mut merged.image, &patch.image);
        overlay(&mut merged.nodes, &patch.nodes);
        overlay(&mut merged.dev_cluster, &patch.dev_cluster);
        overlay(&mut merged.hyperkube_tag, &patch.hyperkube_tag);
        merge_runtime(&mut merged.runtime_config, &patch.runtime_config);
        overlay(&mut merged.copymap, &patch.copymap);
        merge_bindmount(&mut merged.bindmount, &patch.bindmount);

        if let Ok(token) = next_token(&merged.token, layer, &patch.token) {
            if layer != Layer::Persisted && patch.token.as_deref() == Some("") {
                info!("Join token cleared by override");
            }
            merged.token = token;
        }
        overlay(&mut merged.token_groups_option, &patch.token_groups_option);

        merge_machines(&mut merged.machines, layer, &patch.machines);
        let removed = remove_machines(&mut merged.machines, &patch.remove_machines);
        // Without an explicit count, removed records are not synthesized again.
        if patch.nodes.is_none() {
            if let Some(nodes) = merged.nodes.as_mut().filter(|nodes| **nodes > 0) {
                *nodes = (*nodes - removed as i64).max(0);
            }
        }
    }

    pub(crate) fn finish(self) -> ClusterPatch {
        self.merged
    }
}

fn overlay<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if let Some(value) = value {
        *slot = Some(value.clone());
    }
}

/// Token value after applying `incoming` from `layer`.
///
/// The store is authoritative for a generated token. Other layers may set it only while
/// it is empty, and may clear it with an empty string.
fn next_token(
    current: &Option<String>,
    layer: Layer,
    incoming: &Option<String>,
) -> Result<Option<String>, ResolveError> {
    let Some(incoming) = incoming else {
        return Ok(current.clone());
    };
    if layer == Layer::Persisted || incoming.is_empty() {
        return Ok(Some(incoming.clone()));
    }
    match current.as_deref() {
        Some(existing) if !existing.is_empty() && existing != incoming => {
            Err(ResolveError::TokenImmutable)
        }
        _ => Ok(Some(incoming.clone())),
    }
}

fn merge_runtime(merged: &mut RuntimePatch, patch: &RuntimePatch) {
    overlay(&mut merged.endpoint, &patch.endpoint);
    overlay(&mut merged.timeout, &patch.timeout);
    overlay(&mut merged.use_legacy_cgroup_driver, &patch.use_legacy_cgroup_driver);
    overlay(&mut merged.cgroup_per_qos, &patch.cgroup_per_qos);
    overlay(&mut merged.fail_swap_on, &patch.fail_swap_on);
    merge_rkt(&mut merged.rkt, &patch.rkt);
    merge_crio(&mut merged.crio, &patch.crio);
}

fn merge_rkt(merged: &mut RktPatch, patch: &RktPatch) {
    overlay(&mut merged.rkt_bin, &patch.rkt_bin);
    overlay(&mut merged.stage1_image, &patch.stage1_image);
    overlay(&mut merged.rktlet_bin, &patch.rktlet_bin);
}

fn merge_crio(merged: &mut CrioPatch, patch: &CrioPatch) {
    overlay(&mut merged.crio_bin, &patch.crio_bin);
    overlay(&mut merged.runc_bin, &patch.runc_bin);
    overlay(&mut merged.conmon_bin, &patch.conmon_bin);
}

fn merge_bindmount(merged: &mut BindmountPatch, patch: &BindmountPatch) {
    overlay(&mut merged.read_only, &patch.read_only);
    overlay(&mut merged.read_write, &patch.read_write);
}

/// Match machines by name; unmatched entries append in layer order.
fn merge_machines(merged: &mut Vec<MachinePatch>, layer: Layer, incoming: &[MachinePatch]) {
    let tool_owned = layer.may_set_tool_owned();
    for machine in incoming {
        if machine.name.is_empty() && !tool_owned {
            warn!(layer = ?layer, "Ignoring machine entry without a name");
            continue;
        }
        if !tool_owned && (machine.running.is_some() || machine.ip.is_some()) {
            warn!(
                machine = %machine.name,
                layer = ?layer,
                "Ignoring tool-owned machine fields (running, ip) from a user layer"
            );
        }

        let index = match merged
            .iter()
            .position(|m| !machine.name.is_empty() && m.name == machine.name)
        {
            Some(index) => index,
            None => {
                merged.push(MachinePatch::named(machine.name.clone()));
                merged.len() - 1
            }
        };
        let slot = &mut merged[index];
        if tool_owned {
            overlay(&mut slot.running, &machine.running);
            overlay(&mut slot.ip, &machine.ip);
        }
        merge_bindmount(&mut slot.bindmount, &machine.bindmount);
    }
}

/// Number of records dropped.
fn remove_machines(merged: &mut Vec<MachinePatch>, names: &[String]) -> usize {
    let start = merged.len();
    for name in names {
        let before = merged.len();
        merged.retain(|m| &m.name != name);
        if merged.len() == before {
            warn!(machine = %name, "Machine scheduled for removal is not configured");
        } else {
            info!(machine = %name, "Removed machine record");
        }
    }
    start - merged.len()
}
