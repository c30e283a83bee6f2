//! Container runtime selection and runtime-specific settings.
//!
//! The selected runtime's settings are held as a typed [`RuntimeProfile`]. Blocks for
//! runtimes that are not selected are kept as inert profiles so that switching runtimes
//! does not throw away a previous runtime's binary paths.

use crate::error::UnknownRuntime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    Docker,
    Rkt,
    Crio,
}

impl ContainerRuntime {
    pub const ALL: [ContainerRuntime; 3] = [
        ContainerRuntime::Docker,
        ContainerRuntime::Rkt,
        ContainerRuntime::Crio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Rkt => "rkt",
            ContainerRuntime::Crio => "crio",
        }
    }

    /// Select the runtime variant named by `identifier`.
    pub fn select(identifier: &str) -> Result<Self, UnknownRuntime> {
        Self::ALL
            .into_iter()
            .find(|runtime| runtime.as_str() == identifier)
            .ok_or_else(|| UnknownRuntime(identifier.to_string()))
    }
}

impl FromStr for ContainerRuntime {
    type Err = UnknownRuntime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::select(s)
    }
}

impl fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RktProfile {
    pub rkt_bin: String,
    pub stage1_image: String,
    pub rktlet_bin: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrioProfile {
    pub crio_bin: String,
    pub runc_bin: String,
    pub conmon_bin: String,
}

/// Runtime-specific settings, one variant per runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "runtime", rename_all = "lowercase")]
pub enum RuntimeProfile {
    Docker,
    Rkt(RktProfile),
    Crio(CrioProfile),
}

impl RuntimeProfile {
    pub fn empty(runtime: ContainerRuntime) -> Self {
        match runtime {
            ContainerRuntime::Docker => RuntimeProfile::Docker,
            ContainerRuntime::Rkt => RuntimeProfile::Rkt(RktProfile::default()),
            ContainerRuntime::Crio => RuntimeProfile::Crio(CrioProfile::default()),
        }
    }

    pub fn runtime(&self) -> ContainerRuntime {
        match self {
            RuntimeProfile::Docker => ContainerRuntime::Docker,
            RuntimeProfile::Rkt(_) => ContainerRuntime::Rkt,
            RuntimeProfile::Crio(_) => ContainerRuntime::Crio,
        }
    }

    /// Fields keyed by their on-disk names. Every field of a variant is required.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            RuntimeProfile::Docker => Vec::new(),
            RuntimeProfile::Rkt(rkt) => vec![
                ("rkt-bin", rkt.rkt_bin.as_str()),
                ("stage1-image", rkt.stage1_image.as_str()),
                ("rktlet-bin", rkt.rktlet_bin.as_str()),
            ],
            RuntimeProfile::Crio(crio) => vec![
                ("crio-bin", crio.crio_bin.as_str()),
                ("runc-bin", crio.runc_bin.as_str()),
                ("conmon-bin", crio.conmon_bin.as_str()),
            ],
        }
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(key, _)| key)
            .collect()
    }

    pub fn populated_fields(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, _)| key)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.populated_fields().is_empty()
    }
}

/// `[runtime-config]`: settings common to all runtimes plus the per-runtime profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub timeout: String,
    pub use_legacy_cgroup_driver: bool,
    pub cgroup_per_qos: bool,
    pub fail_swap_on: bool,

    /// Profile of the selected runtime; `None` when `container-runtime` names no known runtime.
    pub active: Option<RuntimeProfile>,

    /// Populated profiles of runtimes that are not selected.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub inert: BTreeMap<ContainerRuntime, RuntimeProfile>,
}

impl RuntimeConfiguration {
    /// Profile for `runtime`, whether active or inert.
    pub fn profile(&self, runtime: ContainerRuntime) -> Option<&RuntimeProfile> {
        self.active
            .as_ref()
            .filter(|profile| profile.runtime() == runtime)
            .or_else(|| self.inert.get(&runtime))
    }

    /// Active profile followed by inert ones.
    pub fn profiles(&self) -> impl Iterator<Item = &RuntimeProfile> {
        self.active.iter().chain(self.inert.values())
    }
}

/// A populated field on a runtime that `container-runtime` does not select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeWarning {
    pub runtime: ContainerRuntime,
    pub field: &'static str,
    pub selected: String,
}

impl fmt::Display for RuntimeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "runtime-config.{}.{} is set but container-runtime is '{}'; it is kept but unused",
            self.runtime, self.field, self.selected
        )
    }
}

/// Warn about populated fields of every runtime other than the one `discriminator` selects.
///
/// Missing required fields of the selected runtime are not reported here; validation
/// turns those into hard errors.
pub fn validate_profile(config: &RuntimeConfiguration, discriminator: &str) -> Vec<RuntimeWarning> {
    let selected = ContainerRuntime::select(discriminator).ok();
    config
        .profiles()
        .filter(|profile| Some(profile.runtime()) != selected)
        .flat_map(|profile| {
            profile
                .populated_fields()
                .into_iter()
                .map(move |field| RuntimeWarning {
                    runtime: profile.runtime(),
                    field,
                    selected: discriminator.to_string(),
                })
        })
        .collect()
}
