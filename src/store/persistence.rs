//! Filesystem implementation of [`ConfigStore`]

use crate::cluster::ClusterConfiguration;
use crate::error::StoreError;
use crate::store::{
    check_cluster_name, parse_stored, prepare_save, ConfigStore, Loaded, Revision,
    CONFIG_FILE_NAME,
};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Stores each cluster at `<root>/<cluster-name>/kspawn.toml`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the stored document for `cluster`.
    pub fn path_for(&self, cluster: &str) -> Result<PathBuf, StoreError> {
        check_cluster_name(cluster)?;
        Ok(self.root.join(cluster).join(CONFIG_FILE_NAME))
    }

    fn read(cluster: &str, path: &Path) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => Err(StoreError::Corrupt {
                cluster: cluster.to_string(),
                reason: "document is not valid UTF-8".to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl ConfigStore for FileStore {
    fn load(&self, cluster: &str) -> Result<Loaded, StoreError> {
        let path = self.path_for(cluster)?;
        let text = Self::read(cluster, &path)?
            .ok_or_else(|| StoreError::NotFound(cluster.to_string()))?;
        let layer = parse_stored(cluster, &text)?;
        let revision = Revision::of(text.as_bytes());
        debug!(cluster, path = %path.display(), revision = %revision, "Loaded stored configuration");
        Ok(Loaded { layer, revision })
    }

    /// Write through a temporary file in the same directory, renamed over the stored
    /// document. A failed save leaves the previous document in place.
    fn save(
        &self,
        config: &ClusterConfiguration,
        base: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        let path = self.path_for(&config.name)?;
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::InvalidClusterName(config.name.clone()))?;
        fs::create_dir_all(dir)?;

        let current = Self::read(&config.name, &path)?;
        let text = prepare_save(config, current.as_deref(), base)?;
        let revision = Revision::of(text.as_bytes());
        if current.as_deref() == Some(text.as_str()) {
            debug!(cluster = %config.name, "Stored configuration already up to date");
            return Ok(revision);
        }

        let mut file = NamedTempFile::new_in(dir)?;
        if current.is_some() {
            let permissions = fs::metadata(&path)?.permissions();
            file.as_file().set_permissions(permissions)?;
        }
        file.write_all(text.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| e.error)?;

        info!(
            cluster = %config.name,
            path = %path.display(),
            revision = %revision,
            "Saved cluster configuration"
        );
        Ok(revision)
    }

    fn exists(&self, cluster: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(cluster)?.is_file())
    }
}
