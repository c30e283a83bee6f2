//! Override sources feeding resolution: overrides file, environment and flags

use super::test_utils::defaults;
use kspawn::cli::OverrideArgs;
use kspawn::config::{ClusterPatch, EnvSource, OverrideLoader};
use kspawn::resolve::resolve;
use std::fs;
use tempfile::TempDir;

fn vars(pairs: &[(&str, &str)]) -> EnvSource {
    EnvSource::Vars(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

#[test]
fn test_file_environment_and_flags_in_precedence_order() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("overrides.toml");
    fs::write(
        &file,
        r#"
nodes = 2
image = "flatcar"
kubernetes_version = "v1.11.0"
"#,
    )
    .unwrap();

    let mut overrides = OverrideLoader::new()
        .file(Some(&file))
        .environment(vars(&[
            ("KSPAWN_IMAGE", "ubuntu"),
            ("KSPAWN_KUBERNETES_VERSION", "v1.12.0"),
        ]))
        .load()
        .unwrap();
    OverrideArgs {
        kubernetes_version: Some("v1.13.0".into()),
        ..Default::default()
    }
    .apply_to(&mut overrides);
    overrides.name = Some("dev".into());

    let persisted = ClusterPatch {
        nodes: Some(1),
        image: Some("debian".into()),
        hyperkube_tag: Some("v1.10.5-custom".into()),
        ..ClusterPatch::named("dev")
    };

    let config = resolve(&defaults(), Some(&persisted), &overrides).unwrap();
    assert_eq!(config.nodes, 2);
    assert_eq!(config.image, "ubuntu");
    assert_eq!(config.kubernetes_version, "v1.13.0");
    assert_eq!(config.hyperkube_tag, "v1.10.5-custom");
    assert_eq!(config.container_runtime, "docker");
}

#[test]
fn test_json_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("overrides.json");
    fs::write(
        &file,
        r#"{"container_runtime": "rkt", "runtime_config": {"rkt": {"rkt_bin": "/usr/bin/rkt"}}}"#,
    )
    .unwrap();

    let overrides = OverrideLoader::new()
        .file(Some(&file))
        .environment(EnvSource::Disabled)
        .load()
        .unwrap();
    assert_eq!(overrides.container_runtime.as_deref(), Some("rkt"));
    assert_eq!(
        overrides.runtime_config.rkt.rkt_bin.as_deref(),
        Some("/usr/bin/rkt")
    );
}

#[test]
fn test_environment_can_clear_token() {
    let overrides = OverrideLoader::new()
        .environment(vars(&[("KSPAWN_TOKEN", "")]))
        .load()
        .unwrap();

    let persisted = ClusterPatch {
        token: Some("abcdef.0123456789abcdef".into()),
        nodes: Some(0),
        ..ClusterPatch::named("dev")
    };
    let config = resolve(&defaults(), Some(&persisted), &overrides).unwrap();
    assert_eq!(config.token, "");
}
