//! Persistence round trips through the file store

use super::test_utils::{defaults, TestStore};
use kspawn::cluster::{ContainerRuntime, PathMap};
use kspawn::config::ClusterPatch;
use kspawn::error::StoreError;
use kspawn::provision::{apply_reports, record_token, MachineReport};
use kspawn::resolve::resolve;
use kspawn::store::{ConfigStore, Revision};
use kspawn::validation::{validate, ValidationError};

const HAND_WRITTEN: &str = r#"# kube-spawn cluster "dev"
cluster-name = "dev"
container-runtime = "docker"
nodes = 2

[runtime-config]
timeout = "15m"   # slow disks

[bindmount]
# shared sources
read-only = [
  { src = "/home/me/go", dst = "/go" },
]

[[machines]]
name = "dev-0"
running = false
ip = ""

[[machines]]
name = "dev-1"
running = false
ip = ""
"#;

#[test]
fn test_resolve_save_load_resolve_is_stable() {
    let store = TestStore::new();
    let overrides = ClusterPatch {
        nodes: Some(2),
        copymap: Some(vec![PathMap::new("/etc/resolv.conf", "/etc/resolv.conf")]),
        ..ClusterPatch::named("dev")
    };

    let first = resolve(&defaults(), None, &overrides).unwrap();
    store.store.save(&first, None).unwrap();

    let loaded = store.store.load("dev").unwrap();
    let second = resolve(&defaults(), Some(&loaded.layer), &overrides).unwrap();
    assert_eq!(second, first);

    // Saving the same configuration again changes nothing on disk.
    let text = store.read("dev");
    let revision = store.store.save(&second, Some(&loaded.revision)).unwrap();
    assert_eq!(store.read("dev"), text);
    assert_eq!(revision, loaded.revision);
}

#[test]
fn test_saved_values_beat_defaults_without_overrides() {
    let store = TestStore::new();
    let mut overrides = ClusterPatch {
        nodes: Some(1),
        image: Some(String::new()),
        dev_cluster: Some(true),
        ..ClusterPatch::named("dev")
    };
    overrides.runtime_config.cgroup_per_qos = Some(false);
    overrides.runtime_config.timeout = Some("30m".into());

    let first = resolve(&defaults(), None, &overrides).unwrap();
    store.store.save(&first, None).unwrap();
    let text = store.read("dev");
    assert!(text.contains("cgroup-per-qos = false"));
    assert!(text.contains("image = \"\""));
    assert!(!text.contains("kubernetes-version"));

    let loaded = store.store.load("dev").unwrap();
    let second = resolve(&defaults(), Some(&loaded.layer), &ClusterPatch::named("dev")).unwrap();
    assert!(!second.runtime_config.cgroup_per_qos);
    assert_eq!(second.runtime_config.timeout, "30m");
    assert_eq!(second.image, "");
    assert!(second.dev_cluster);
    assert_eq!(second, first);
}

#[test]
fn test_copymap_is_never_persisted() {
    let store = TestStore::new();
    let overrides = ClusterPatch {
        nodes: Some(1),
        copymap: Some(vec![PathMap::new("/etc/hosts", "/etc/hosts")]),
        ..ClusterPatch::named("dev")
    };
    let config = resolve(&defaults(), None, &overrides).unwrap();
    store.store.save(&config, None).unwrap();

    assert!(!store.read("dev").contains("copymap"));
    assert!(!store.read("dev").contains("/etc/hosts"));
    assert!(store.store.load("dev").unwrap().layer.copymap.is_none());
}

#[test]
fn test_machine_report_keeps_hand_edits() {
    let store = TestStore::new();
    store.write("dev", HAND_WRITTEN);

    let loaded = store.store.load("dev").unwrap();
    let mut config = loaded.configuration(&defaults());
    apply_reports(
        &mut config,
        &[MachineReport {
            name: "dev-1".into(),
            ip: "10.22.0.3".into(),
            running: true,
        }],
    )
    .unwrap();
    store.store.save(&config, Some(&loaded.revision)).unwrap();

    let expected = HAND_WRITTEN.replace(
        "name = \"dev-1\"\nrunning = false\nip = \"\"",
        "name = \"dev-1\"\nrunning = true\nip = \"10.22.0.3\"",
    );
    assert_eq!(store.read("dev"), expected);
}

#[test]
fn test_token_written_once_with_marker() {
    let store = TestStore::new();
    store.write("dev", HAND_WRITTEN);

    let loaded = store.store.load("dev").unwrap();
    let mut config = loaded.configuration(&defaults());
    record_token(&mut config, "abcdef.0123456789abcdef", None).unwrap();
    store.store.save(&config, Some(&loaded.revision)).unwrap();

    let text = store.read("dev");
    assert!(text.contains("# autogenerated. do not edit!\ntoken = \"abcdef.0123456789abcdef\""));
    assert!(text.starts_with("# kube-spawn cluster \"dev\"\n"));

    let reloaded = store.store.load("dev").unwrap();
    assert_eq!(
        reloaded.layer.token.as_deref(),
        Some("abcdef.0123456789abcdef")
    );
}

#[test]
fn test_runtime_switch_preserves_stale_block() {
    let store = TestStore::new();
    store.write(
        "dev",
        r#"cluster-name = "dev"
container-runtime = "rkt"
nodes = 0

[runtime-config.rkt]
rkt-bin = "/usr/bin/rkt"   # local build
"#,
    );

    let loaded = store.store.load("dev").unwrap();
    let overrides = ClusterPatch {
        container_runtime: Some("crio".into()),
        ..Default::default()
    };
    let config = resolve(&defaults(), Some(&loaded.layer), &overrides).unwrap();

    let errors = validate(&config);
    assert!(errors.iter().any(|e| matches!(
        e,
        ValidationError::IncompleteRuntimeConfig { runtime: ContainerRuntime::Crio, missing }
            if missing.len() == 3
    )));

    store.store.save(&config, Some(&loaded.revision)).unwrap();
    let text = store.read("dev");
    assert!(text.contains("container-runtime = \"crio\""));
    assert!(text.contains("[runtime-config.rkt]\nrkt-bin = \"/usr/bin/rkt\"   # local build\n"));
    assert!(!text.contains("[runtime-config.crio]"));
}

#[test]
fn test_save_detects_concurrent_modification() {
    let store = TestStore::new();
    store.write("dev", HAND_WRITTEN);
    let loaded = store.store.load("dev").unwrap();

    let edited = HAND_WRITTEN.replace("nodes = 2", "nodes = 2 # edited meanwhile");
    store.write("dev", &edited);

    let mut config = loaded.configuration(&defaults());
    config.token = "abcdef.0123456789abcdef".into();
    let err = store.store.save(&config, Some(&loaded.revision)).unwrap_err();
    assert!(matches!(err, StoreError::ConcurrentModification(name) if name == "dev"));
    assert_eq!(store.read("dev"), edited);
}

#[test]
fn test_first_save_refuses_to_clobber_existing_document() {
    let store = TestStore::new();
    store.write("dev", HAND_WRITTEN);

    let config = resolve(&defaults(), None, &ClusterPatch::named("dev")).unwrap();
    assert!(matches!(
        store.store.save(&config, None),
        Err(StoreError::ConcurrentModification(_))
    ));
    assert_eq!(store.read("dev"), HAND_WRITTEN);
}

#[test]
fn test_load_errors() {
    let store = TestStore::new();
    assert!(matches!(
        store.store.load("dev"),
        Err(StoreError::NotFound(name)) if name == "dev"
    ));

    store.write("dev", "nodes = \"three\"\n");
    assert!(matches!(
        store.store.load("dev"),
        Err(StoreError::Corrupt { cluster, .. }) if cluster == "dev"
    ));

    store.write("dev", "cluster-name = \"prod\"\n");
    assert!(matches!(
        store.store.load("dev"),
        Err(StoreError::Corrupt { .. })
    ));
}

#[test]
fn test_unknown_keys_are_ignored_and_kept() {
    let store = TestStore::new();
    store.write(
        "dev",
        "cluster-name = \"dev\"\nnodes = 0\nlegacy-option = 42\n\n[extra]\nnote = \"mine\"\n",
    );
    let loaded = store.store.load("dev").unwrap();
    let mut config = loaded.configuration(&defaults());
    config.nodes = 1;
    config.machines.push(kspawn::cluster::MachineConfiguration::new("dev-0"));
    let revision = store.store.save(&config, Some(&loaded.revision)).unwrap();

    let text = store.read("dev");
    assert!(text.contains("legacy-option = 42"));
    assert!(text.contains("[extra]\nnote = \"mine\""));
    assert_eq!(revision, Revision::of(text.as_bytes()));
}
