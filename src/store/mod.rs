//! Persisted configuration store
//!
//! One `kspawn.toml` per cluster. A load hands the stored document to resolution as the
//! persisted layer together with a [`Revision`]; a save writes a resolved configuration
//! back only if the stored bytes still carry that revision.

mod document;
pub mod memory;
pub mod persistence;
mod schema;

pub use memory::MemoryStore;
pub use persistence::FileStore;

use crate::cluster::ClusterConfiguration;
use crate::config::ClusterPatch;
use crate::error::StoreError;
use crate::resolve;
use schema::ClusterFile;
use std::fmt;
use tracing::warn;

/// File name of the stored document inside `<dir>/<cluster-name>/`.
pub const CONFIG_FILE_NAME: &str = "kspawn.toml";

/// Fingerprint of the stored bytes a configuration was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Revision(blake3::Hash);

impl Revision {
    pub fn of(bytes: &[u8]) -> Self {
        Revision(blake3::hash(bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.0.to_hex();
        write!(f, "{}", &hex.as_str()[..12])
    }
}

/// A stored document read back as a merge layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub layer: ClusterPatch,
    pub revision: Revision,
}

impl Loaded {
    /// The stored configuration over `defaults`, without overrides or reconciliation.
    ///
    /// Provisioning feedback edits this and saves it back; keys the document leaves out
    /// stay out as long as they still hold their default.
    pub fn configuration(&self, defaults: &ClusterPatch) -> ClusterConfiguration {
        resolve::materialize(defaults, &self.layer)
    }
}

/// Storage for per-cluster configuration documents.
///
/// Each call acquires and releases the stored document on its own; no lock is held
/// between a load and the save that follows it. `base` on save is the revision the
/// caller loaded, or `None` when it expects no document to exist yet.
pub trait ConfigStore {
    fn load(&self, cluster: &str) -> Result<Loaded, StoreError>;

    fn save(
        &self,
        config: &ClusterConfiguration,
        base: Option<&Revision>,
    ) -> Result<Revision, StoreError>;

    fn exists(&self, cluster: &str) -> Result<bool, StoreError>;
}

/// Cluster names double as directory names.
pub fn check_cluster_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name == "." || name.contains("..") || name.contains(['/', '\\']) {
        return Err(StoreError::InvalidClusterName(name.to_string()));
    }
    Ok(())
}

/// Parse stored text into the persisted layer for `cluster`.
pub(crate) fn parse_stored(cluster: &str, text: &str) -> Result<ClusterPatch, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        cluster: cluster.to_string(),
        reason,
    };

    let file = ClusterFile::parse(text).map_err(|e| corrupt(e.message().to_string()))?;
    if let Some(stored) = file.cluster_name().filter(|name| !name.is_empty()) {
        if stored != cluster {
            return Err(corrupt(format!("document belongs to cluster '{}'", stored)));
        }
    }

    let mut layer = file.into_patch();
    if layer.machines.iter().any(|m| m.name.is_empty()) {
        return Err(corrupt("machine entry without a name".to_string()));
    }
    if layer.name.as_deref().map_or(true, str::is_empty) {
        layer.name = Some(cluster.to_string());
    }
    Ok(layer)
}

/// Check `base` against the stored text and produce the text to write.
///
/// A stored non-empty token is only ever cleared, never replaced by a different one.
pub(crate) fn prepare_save(
    config: &ClusterConfiguration,
    current: Option<&str>,
    base: Option<&Revision>,
) -> Result<String, StoreError> {
    let found = current.map(|text| Revision::of(text.as_bytes()));
    if found.as_ref() != base {
        return Err(StoreError::ConcurrentModification(config.name.clone()));
    }

    let stored_token = current
        .and_then(|text| ClusterFile::parse(text).ok())
        .and_then(|file| file.token().map(str::to_string))
        .unwrap_or_default();
    if !stored_token.is_empty() && !config.token.is_empty() && stored_token != config.token {
        warn!(cluster = %config.name, "Refusing to replace the stored join token");
        return Err(StoreError::TokenImmutable(config.name.clone()));
    }

    match current {
        Some(text) => document::update(text, config)
            .map(|document| document.to_string())
            .map_err(|e| StoreError::Corrupt {
                cluster: config.name.clone(),
                reason: e.message().to_string(),
            }),
        None => Ok(document::render(config).to_string()),
    }
}
