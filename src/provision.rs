//! Facts reported back by the provisioning side: machine state and the join token.

use crate::cluster::ClusterConfiguration;
use crate::error::ResolveError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Observed state of one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineReport {
    pub name: String,
    pub ip: String,
    pub running: bool,
}

/// Apply machine reports. Every name must be configured; otherwise nothing is applied.
pub fn apply_reports(
    config: &mut ClusterConfiguration,
    reports: &[MachineReport],
) -> Result<(), ResolveError> {
    if let Some(unknown) = reports.iter().find(|r| config.machine(&r.name).is_none()) {
        return Err(ResolveError::UnknownMachine(unknown.name.clone()));
    }

    for report in reports {
        for machine in config.machines.iter_mut().filter(|m| m.name == report.name) {
            if machine.running != report.running || machine.ip != report.ip {
                info!(
                    machine = %machine.name,
                    ip = %report.ip,
                    running = report.running,
                    "Machine state reported"
                );
            }
            machine.ip = report.ip.clone();
            machine.running = report.running;
        }
    }
    Ok(())
}

/// Store the token generated on kubeadm init. A token that is already set can only be
/// replaced after it has been cleared.
pub fn record_token(
    config: &mut ClusterConfiguration,
    token: &str,
    groups_option: Option<&str>,
) -> Result<(), ResolveError> {
    if !config.token.is_empty() && config.token != token {
        return Err(ResolveError::TokenImmutable);
    }
    if config.token.is_empty() {
        info!(cluster = %config.name, "Recorded join token");
    }
    config.token = token.to_string();
    if let Some(groups_option) = groups_option {
        config.token_groups_option = groups_option.to_string();
    }
    Ok(())
}
