//! CLI parse: clap types for kspawn. Definitions plus the mapping of override flags
//! onto a merge layer.

use crate::cluster::PathMap;
use crate::config::{ClusterPatch, DEFAULT_KUBE_SPAWN_DIR};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// kspawn - configuration for local kube-spawn clusters
#[derive(Parser, Debug)]
#[command(name = "kspawn")]
#[command(about = "Resolve, validate and persist kube-spawn cluster configuration")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding one subdirectory per cluster
    #[arg(long, default_value = DEFAULT_KUBE_SPAWN_DIR)]
    pub dir: PathBuf,

    /// Cluster to operate on
    #[arg(short = 'c', long, default_value = "default")]
    pub cluster_name: String,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge defaults, the stored configuration and overrides
    Resolve {
        #[command(flatten)]
        overrides: OverrideArgs,

        /// Validate and write the result back to the store
        #[arg(long)]
        save: bool,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Report every problem with the resolved configuration
    Validate,
    /// List machine records
    Machines {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Record the observed state of a machine
    Report {
        #[arg(long)]
        machine: String,

        #[arg(long, default_value = "")]
        ip: String,

        #[arg(long, action = ArgAction::Set, default_value = "true")]
        running: bool,
    },
    /// Record the join token generated by kubeadm init
    Token {
        token: String,

        #[arg(long)]
        groups_option: Option<String>,
    },
}

/// Flags that form the top of the overrides layer.
#[derive(Args, Debug, Default, Clone)]
pub struct OverrideArgs {
    /// Overrides file (toml, yaml or json with snake_case keys)
    #[arg(long = "overrides")]
    pub overrides_file: Option<PathBuf>,

    #[arg(long, allow_negative_numbers = true)]
    pub nodes: Option<i64>,

    /// docker, rkt or crio
    #[arg(short = 'r', long)]
    pub container_runtime: Option<String>,

    #[arg(long)]
    pub kubernetes_version: Option<String>,

    #[arg(long)]
    pub image: Option<String>,

    #[arg(long)]
    pub hyperkube_tag: Option<String>,

    #[arg(long)]
    pub cni_plugin_dir: Option<String>,

    /// Build the cluster from local Kubernetes builds (`--dev false` turns it off)
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub dev: Option<bool>,

    #[arg(long)]
    pub runtime_endpoint: Option<String>,

    #[arg(long)]
    pub rkt_bin: Option<String>,

    #[arg(long)]
    pub stage1_image: Option<String>,

    #[arg(long)]
    pub rktlet_bin: Option<String>,

    #[arg(long)]
    pub crio_bin: Option<String>,

    #[arg(long)]
    pub runc_bin: Option<String>,

    #[arg(long)]
    pub conmon_bin: Option<String>,

    /// Join token; an empty value clears the stored one
    #[arg(long)]
    pub token: Option<String>,

    /// Copy a host file into every machine for this run (SRC:DST)
    #[arg(long = "copy", value_parser = parse_path_map)]
    pub copymap: Vec<PathMap>,

    /// Drop a stopped machine record by name
    #[arg(long = "remove-machine")]
    pub remove_machines: Vec<String>,
}

impl OverrideArgs {
    /// Set every flag that was given on `patch`, over what the file and environment set.
    pub fn apply_to(&self, patch: &mut ClusterPatch) {
        fn set<T: Clone>(slot: &mut Option<T>, flag: &Option<T>) {
            if let Some(value) = flag {
                *slot = Some(value.clone());
            }
        }

        set(&mut patch.nodes, &self.nodes);
        set(&mut patch.container_runtime, &self.container_runtime);
        set(&mut patch.kubernetes_version, &self.kubernetes_version);
        set(&mut patch.image, &self.image);
        set(&mut patch.hyperkube_tag, &self.hyperkube_tag);
        set(&mut patch.cni_plugin_dir, &self.cni_plugin_dir);
        set(&mut patch.token, &self.token);
        set(&mut patch.runtime_config.endpoint, &self.runtime_endpoint);
        set(&mut patch.runtime_config.rkt.rkt_bin, &self.rkt_bin);
        set(&mut patch.runtime_config.rkt.stage1_image, &self.stage1_image);
        set(&mut patch.runtime_config.rkt.rktlet_bin, &self.rktlet_bin);
        set(&mut patch.runtime_config.crio.crio_bin, &self.crio_bin);
        set(&mut patch.runtime_config.crio.runc_bin, &self.runc_bin);
        set(&mut patch.runtime_config.crio.conmon_bin, &self.conmon_bin);
        set(&mut patch.dev_cluster, &self.dev);
        if !self.copymap.is_empty() {
            patch.copymap = Some(self.copymap.clone());
        }
        patch
            .remove_machines
            .extend(self.remove_machines.iter().cloned());
    }
}

fn parse_path_map(value: &str) -> Result<PathMap, String> {
    match value.split_once(':') {
        Some((src, dst)) if !src.is_empty() && !dst.is_empty() => Ok(PathMap::new(src, dst)),
        Some(_) => Err(format!("'{}' needs both a source and a destination", value)),
        None if !value.is_empty() => Ok(PathMap::new(value, value)),
        None => Err("empty path mapping".to_string()),
    }
}
