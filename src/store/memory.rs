//! In-process [`ConfigStore`], for tests and embedding.

use crate::cluster::ClusterConfiguration;
use crate::error::StoreError;
use crate::store::{check_cluster_name, parse_stored, prepare_save, ConfigStore, Loaded, Revision};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored text for `cluster`, as a file store would hold it.
    pub fn raw(&self, cluster: &str) -> Option<String> {
        self.documents.lock().get(cluster).cloned()
    }

    /// Replace the stored text, as a hand edit would.
    pub fn insert_raw(&self, cluster: &str, text: impl Into<String>) {
        self.documents.lock().insert(cluster.to_string(), text.into());
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self, cluster: &str) -> Result<Loaded, StoreError> {
        check_cluster_name(cluster)?;
        let documents = self.documents.lock();
        let text = documents
            .get(cluster)
            .ok_or_else(|| StoreError::NotFound(cluster.to_string()))?;
        Ok(Loaded {
            layer: parse_stored(cluster, text)?,
            revision: Revision::of(text.as_bytes()),
        })
    }

    fn save(
        &self,
        config: &ClusterConfiguration,
        base: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        check_cluster_name(&config.name)?;
        let mut documents = self.documents.lock();
        let text = prepare_save(config, documents.get(&config.name).map(String::as_str), base)?;
        let revision = Revision::of(text.as_bytes());
        documents.insert(config.name.clone(), text);
        Ok(revision)
    }

    fn exists(&self, cluster: &str) -> Result<bool, StoreError> {
        check_cluster_name(cluster)?;
        Ok(self.documents.lock().contains_key(cluster))
    }
}
