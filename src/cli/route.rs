//! CLI route: single route table and run context. Dispatches to resolution, validation,
//! provisioning hooks and the store.

use crate::cli::parse::{Commands, OverrideArgs};
use crate::cli::presentation::{
    format_configuration_text, format_machines_text, format_warnings, to_json,
};
use crate::cluster::ClusterConfiguration;
use crate::config::{builtin_defaults, ClusterPatch, EnvSource, OverrideLoader};
use crate::error::{ApiError, StoreError};
use crate::provision::{apply_reports, record_token, MachineReport};
use crate::resolve::resolve;
use crate::store::{ConfigStore, FileStore, Loaded};
use crate::validation::validate;
use std::path::PathBuf;
use tracing::{debug, info};

/// Runtime context for CLI execution: the cluster directory and the store rooted there.
pub struct RunContext {
    dir: PathBuf,
    cluster: String,
    store: FileStore,
    environment: EnvSource,
}

impl RunContext {
    pub fn new(dir: PathBuf, cluster: String) -> Self {
        Self {
            store: FileStore::new(dir.clone()),
            dir,
            cluster,
            environment: EnvSource::Process,
        }
    }

    /// Replace the environment overrides are read from.
    pub fn with_environment(mut self, environment: EnvSource) -> Self {
        self.environment = environment;
        self
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Resolve {
                overrides,
                save,
                format,
            } => self.handle_resolve(overrides, *save, format),
            Commands::Validate => self.handle_validate(),
            Commands::Machines { format } => self.handle_machines(format),
            Commands::Report {
                machine,
                ip,
                running,
            } => self.handle_report(MachineReport {
                name: machine.clone(),
                ip: ip.clone(),
                running: *running,
            }),
            Commands::Token {
                token,
                groups_option,
            } => self.handle_token(token, groups_option.as_deref()),
        }
    }

    fn load_optional(&self) -> Result<Option<Loaded>, ApiError> {
        match self.store.load(&self.cluster) {
            Ok(loaded) => Ok(Some(loaded)),
            Err(StoreError::NotFound(_)) => {
                debug!(cluster = %self.cluster, "No stored configuration");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn overrides(&self, args: &OverrideArgs) -> Result<ClusterPatch, ApiError> {
        let mut patch = OverrideLoader::new()
            .file(args.overrides_file.as_deref())
            .environment(self.environment.clone())
            .load()?;
        args.apply_to(&mut patch);
        patch.name = Some(self.cluster.clone());
        patch.kube_spawn_dir = Some(self.dir.to_string_lossy().into_owned());
        Ok(patch)
    }

    fn resolve_with(
        &self,
        args: &OverrideArgs,
    ) -> Result<(ClusterConfiguration, Option<Loaded>), ApiError> {
        let defaults = builtin_defaults()?;
        let loaded = self.load_optional()?;
        let overrides = self.overrides(args)?;
        let config = resolve(&defaults, loaded.as_ref().map(|l| &l.layer), &overrides)?;
        Ok((config, loaded))
    }

    /// The stored document over the built-in defaults; fails when nothing is stored.
    fn stored_configuration(&self) -> Result<(ClusterConfiguration, Loaded), ApiError> {
        let defaults = builtin_defaults()?;
        let loaded = self.store.load(&self.cluster)?;
        Ok((loaded.configuration(&defaults), loaded))
    }

    fn handle_resolve(
        &self,
        args: &OverrideArgs,
        save: bool,
        format: &str,
    ) -> Result<String, ApiError> {
        let (config, loaded) = self.resolve_with(args)?;

        if save {
            let errors = validate(&config);
            if !errors.is_empty() {
                return Err(ApiError::Invalid(errors));
            }
            let revision = self
                .store
                .save(&config, loaded.as_ref().map(|l| &l.revision))?;
            info!(cluster = %config.name, revision = %revision, "Configuration saved");
        }

        match format {
            "json" => to_json(&config),
            _ => Ok(format_configuration_text(&config)),
        }
    }

    fn handle_validate(&self) -> Result<String, ApiError> {
        let (config, _) = self.resolve_with(&OverrideArgs::default())?;
        let errors = validate(&config);
        if !errors.is_empty() {
            return Err(ApiError::Invalid(errors));
        }

        let warnings = config.runtime_warnings();
        if warnings.is_empty() {
            Ok(format!("Configuration for '{}' is valid", config.name))
        } else {
            Ok(format!(
                "{}\nConfiguration for '{}' is valid",
                format_warnings(&warnings),
                config.name
            ))
        }
    }

    fn handle_machines(&self, format: &str) -> Result<String, ApiError> {
        let config = self.stored_configuration()?.0;
        match format {
            "json" => to_json(&config.machines),
            _ => Ok(format_machines_text(&config)),
        }
    }

    fn handle_report(&self, report: MachineReport) -> Result<String, ApiError> {
        let (mut config, loaded) = self.stored_configuration()?;
        apply_reports(&mut config, std::slice::from_ref(&report))?;
        self.store.save(&config, Some(&loaded.revision))?;
        Ok(format!(
            "{}: {}",
            report.name,
            if report.running { "running" } else { "stopped" }
        ))
    }

    fn handle_token(&self, token: &str, groups_option: Option<&str>) -> Result<String, ApiError> {
        let (mut config, loaded) = self.stored_configuration()?;
        record_token(&mut config, token, groups_option)?;
        self.store.save(&config, Some(&loaded.revision))?;
        Ok(format!("Token recorded for '{}'", config.name))
    }
}
