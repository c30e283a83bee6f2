//! Path mappings and bind-mount sets exposed to sandboxed machines.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A host path made visible inside a machine at `dst`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathMap {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub dst: String,
}

impl PathMap {
    pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }

    /// Both ends must be set. Whether `src` exists on the host is checked at mount time.
    pub fn is_valid(&self) -> bool {
        !self.src.is_empty() && !self.dst.is_empty()
    }
}

/// Read-only and read-write mappings, in mount order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Bindmount {
    pub read_only: Vec<PathMap>,
    pub read_write: Vec<PathMap>,
}

impl Bindmount {
    pub fn is_empty(&self) -> bool {
        self.read_only.is_empty() && self.read_write.is_empty()
    }

    /// All mappings, read-only first.
    pub fn iter(&self) -> impl Iterator<Item = &PathMap> {
        self.read_only.iter().chain(self.read_write.iter())
    }

    /// Cluster-level entries followed by `machine` entries. Machine entries never
    /// replace cluster entries, so a shared destination stays visible as a duplicate.
    pub fn union(&self, machine: &Bindmount) -> Bindmount {
        Bindmount {
            read_only: self
                .read_only
                .iter()
                .chain(machine.read_only.iter())
                .cloned()
                .collect(),
            read_write: self
                .read_write
                .iter()
                .chain(machine.read_write.iter())
                .cloned()
                .collect(),
        }
    }

    /// Destinations that appear more than once within the same sequence.
    pub fn repeated_destinations(&self) -> Vec<&str> {
        let mut repeated = Vec::new();
        for sequence in [&self.read_only, &self.read_write] {
            let mut seen = HashSet::new();
            for map in sequence.iter().filter(|m| !m.dst.is_empty()) {
                if !seen.insert(map.dst.as_str()) && !repeated.contains(&map.dst.as_str()) {
                    repeated.push(map.dst.as_str());
                }
            }
        }
        repeated
    }

    /// Every mapping is complete and no sequence reuses a destination.
    pub fn is_valid(&self) -> bool {
        self.iter().all(PathMap::is_valid) && self.repeated_destinations().is_empty()
    }
}
