//! Node-count reconciliation: make `machines` match `nodes`.

use crate::cluster::{machine_name, ClusterConfiguration, MachineConfiguration};
use crate::error::ResolveError;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use tracing::info;

/// Grow or shrink `config.machines` to `config.nodes` records.
///
/// Growth synthesizes `<cluster>-<n>` records using the smallest unused ordinals.
/// Shrinking drops the highest ordinals first and fails, leaving `machines` untouched,
/// if any dropped record is still running. A negative node count or a nameless cluster
/// is left for validation to report.
pub(crate) fn reconcile_nodes(config: &mut ClusterConfiguration) -> Result<(), ResolveError> {
    let Ok(target) = usize::try_from(config.nodes) else {
        return Ok(());
    };
    let current = config.machines.len();

    if target > current && !config.name.is_empty() {
        let mut used: BTreeSet<u32> = config
            .machines
            .iter()
            .filter_map(|m| m.ordinal(&config.name))
            .collect();
        let mut ordinal = 0u32;
        while config.machines.len() < target {
            while used.contains(&ordinal) {
                ordinal += 1;
            }
            used.insert(ordinal);
            let name = machine_name(&config.name, ordinal);
            info!(machine = %name, "Synthesized machine record");
            config.machines.push(MachineConfiguration::new(name));
        }
    } else if target < current {
        let doomed: BTreeSet<usize> = removal_order(&config.machines, &config.name)
            .into_iter()
            .take(current - target)
            .collect();

        let still_running: Vec<String> = doomed
            .iter()
            .map(|&index| &config.machines[index])
            .filter(|m| m.running)
            .map(|m| m.name.clone())
            .collect();
        if !still_running.is_empty() {
            return Err(ResolveError::MachineStillRunning(still_running));
        }

        let mut index = 0;
        config.machines.retain(|m| {
            let keep = !doomed.contains(&index);
            if !keep {
                info!(machine = %m.name, "Dropped machine record");
            }
            index += 1;
            keep
        });
    }
    Ok(())
}

/// Indices in removal order: highest ordinal first, then records without an ordinal
/// from the back of the list.
fn removal_order(machines: &[MachineConfiguration], cluster: &str) -> Vec<usize> {
    let mut order: Vec<usize> = (0..machines.len()).collect();
    order.sort_by_key(|&index| {
        let ordinal = machines[index].ordinal(cluster).map(i64::from).unwrap_or(-1);
        Reverse((ordinal, index))
    });
    order
}
