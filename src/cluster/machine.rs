//! Per-node machine records.

use crate::cluster::bindmount::Bindmount;
use serde::Serialize;

/// One cluster node as the tool sees it.
///
/// `name`, `ip` and `running` are tool-owned: names are synthesized during resolution
/// and the provisioning side reports `ip`/`running`. Only `bindmount` is user-authored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MachineConfiguration {
    pub running: bool,
    pub name: String,
    pub ip: String,
    pub bindmount: Bindmount,
}

impl MachineConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Ordinal of a `<cluster>-<n>` name. Non-canonical suffixes (`dev-01`) have none.
    pub fn ordinal(&self, cluster: &str) -> Option<u32> {
        let suffix = self.name.strip_prefix(cluster)?.strip_prefix('-')?;
        let ordinal: u32 = suffix.parse().ok()?;
        (ordinal.to_string() == suffix).then_some(ordinal)
    }
}

pub fn machine_name(cluster: &str, ordinal: u32) -> String {
    format!("{}-{}", cluster, ordinal)
}
