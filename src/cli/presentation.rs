//! Text and JSON rendering of command results.

use crate::cluster::{ClusterConfiguration, RuntimeWarning};
use crate::error::ApiError;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;

pub fn to_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::ConfigError(format!("Failed to serialize output: {}", e)))
}

/// Resolved configuration summary as text.
pub fn format_configuration_text(config: &ClusterConfiguration) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Setting", "Value"]);
    let rows = [
        ("cluster-name", config.name.clone()),
        ("dir", config.kube_spawn_dir.clone()),
        ("cni-plugin-dir", config.cni_plugin_dir.clone()),
        ("container-runtime", config.container_runtime.clone()),
        ("kubernetes-version", config.kubernetes_version.clone()),
        ("hyperkube-tag", config.hyperkube_tag.clone()),
        ("image", config.image.clone()),
        ("nodes", config.nodes.to_string()),
        ("dev", config.dev_cluster.to_string()),
        ("runtime-config.timeout", config.runtime_config.timeout.clone()),
        (
            "token",
            if config.token.is_empty() { "-" } else { "set" }.to_string(),
        ),
    ];
    for (key, value) in rows {
        table.add_row(vec![key.to_string(), value]);
    }
    if let Some(profile) = &config.runtime_config.active {
        for (key, value) in profile.fields() {
            table.add_row(vec![
                format!("runtime-config.{}.{}", profile.runtime(), key),
                value.to_string(),
            ]);
        }
    }

    let mut out = format!("{}\n\n{}", table, format_machines_text(config));
    for copy in &config.copymap {
        out.push_str(&format!("\ncopy {} -> {}", copy.src, copy.dst));
    }
    out
}

/// Machine records as a table.
pub fn format_machines_text(config: &ClusterConfiguration) -> String {
    if config.machines.is_empty() {
        return "No machines".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Machine", "IP", "Running", "Bind mounts"]);
    for machine in &config.machines {
        let ip = if machine.ip.is_empty() { "-" } else { machine.ip.as_str() };
        table.add_row(vec![
            machine.name.clone(),
            ip.to_string(),
            if machine.running { "yes" } else { "no" }.to_string(),
            config.effective_bindmount(machine).iter().count().to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_warnings(warnings: &[RuntimeWarning]) -> String {
    warnings
        .iter()
        .map(|w| format!("warning: {}", w))
        .collect::<Vec<_>>()
        .join("\n")
}
