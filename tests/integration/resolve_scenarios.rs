//! Resolution scenarios across all three layers

use super::test_utils::defaults;
use kspawn::cluster::{ContainerRuntime, PathMap, RuntimeProfile};
use kspawn::config::{BindmountPatch, ClusterPatch, MachinePatch};
use kspawn::error::ResolveError;
use kspawn::resolve::resolve;

fn stored_machines(names: &[(&str, bool)]) -> Vec<MachinePatch> {
    names
        .iter()
        .map(|(name, running)| MachinePatch {
            running: Some(*running),
            ..MachinePatch::named(*name)
        })
        .collect()
}

#[test]
fn test_scale_up_from_one_to_three() {
    let defaults = ClusterPatch {
        nodes: Some(1),
        ..Default::default()
    };
    let persisted = ClusterPatch {
        nodes: Some(1),
        machines: vec![MachinePatch::named("dev-0")],
        ..ClusterPatch::named("dev")
    };
    let overrides = ClusterPatch {
        nodes: Some(3),
        ..Default::default()
    };

    let config = resolve(&defaults, Some(&persisted), &overrides).unwrap();
    assert_eq!(config.name, "dev");
    assert_eq!(config.nodes, 3);
    let names: Vec<&str> = config.machines.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["dev-0", "dev-1", "dev-2"]);
    assert!(config.machines.iter().all(|m| m.bindmount.is_empty()));
}

#[test]
fn test_builtin_defaults_fill_unset_fields() {
    let config = resolve(&defaults(), None, &ClusterPatch::named("fresh")).unwrap();
    assert_eq!(config.kube_spawn_dir, "/var/lib/kube-spawn");
    assert_eq!(config.cni_plugin_dir, "/opt/cni/bin");
    assert_eq!(config.container_runtime, "docker");
    assert_eq!(config.kubernetes_version, "v1.10.5");
    assert_eq!(config.image, "coreos");
    assert_eq!(config.nodes, 3);
    assert_eq!(config.runtime_config.timeout, "15m");
    assert!(config.runtime_config.cgroup_per_qos);
    assert_eq!(config.machines.len(), 3);
    assert!(config.validate().is_ok());
}

#[test]
fn test_nested_runtime_override_keeps_siblings() {
    let mut persisted = ClusterPatch {
        container_runtime: Some("crio".into()),
        nodes: Some(0),
        ..ClusterPatch::named("dev")
    };
    persisted.runtime_config.crio.crio_bin = Some("/usr/bin/crio".into());
    persisted.runtime_config.crio.runc_bin = Some("/usr/bin/runc".into());
    persisted.runtime_config.crio.conmon_bin = Some("/usr/libexec/conmon".into());

    let mut overrides = ClusterPatch::default();
    overrides.runtime_config.crio.runc_bin = Some("/opt/bin/runc".into());

    let config = resolve(&defaults(), Some(&persisted), &overrides).unwrap();
    let Some(RuntimeProfile::Crio(crio)) = &config.runtime_config.active else {
        panic!("crio should be active");
    };
    assert_eq!(crio.crio_bin, "/usr/bin/crio");
    assert_eq!(crio.runc_bin, "/opt/bin/runc");
    assert_eq!(crio.conmon_bin, "/usr/libexec/conmon");
    assert!(config.validate().is_ok());
}

#[test]
fn test_machine_bindmount_override_by_name() {
    let persisted = ClusterPatch {
        nodes: Some(2),
        machines: vec![
            MachinePatch {
                bindmount: BindmountPatch {
                    read_only: Some(vec![PathMap::new("/src", "/src")]),
                    read_write: Some(vec![PathMap::new("/data", "/data")]),
                },
                ..MachinePatch::named("dev-0")
            },
            MachinePatch::named("dev-1"),
        ],
        ..ClusterPatch::named("dev")
    };
    let overrides = ClusterPatch {
        machines: vec![MachinePatch {
            bindmount: BindmountPatch {
                read_only: Some(vec![PathMap::new("/home", "/home")]),
                read_write: None,
            },
            ..MachinePatch::named("dev-0")
        }],
        ..Default::default()
    };

    let config = resolve(&defaults(), Some(&persisted), &overrides).unwrap();
    let dev0 = config.machine("dev-0").unwrap();
    assert_eq!(dev0.bindmount.read_only, vec![PathMap::new("/home", "/home")]);
    assert_eq!(dev0.bindmount.read_write, vec![PathMap::new("/data", "/data")]);
    assert_eq!(config.machines.len(), 2);
}

#[test]
fn test_overrides_cannot_set_machine_state() {
    let persisted = ClusterPatch {
        nodes: Some(1),
        machines: stored_machines(&[("dev-0", false)]),
        ..ClusterPatch::named("dev")
    };
    let overrides = ClusterPatch {
        machines: vec![MachinePatch {
            running: Some(true),
            ip: Some("10.0.0.1".into()),
            ..MachinePatch::named("dev-0")
        }],
        ..Default::default()
    };

    let config = resolve(&defaults(), Some(&persisted), &overrides).unwrap();
    assert!(!config.machines[0].running);
    assert_eq!(config.machines[0].ip, "");
}

#[test]
fn test_token_immutability() {
    let persisted = ClusterPatch {
        token: Some("abcdef.0123456789abcdef".into()),
        nodes: Some(0),
        ..ClusterPatch::named("dev")
    };

    let replace = ClusterPatch {
        token: Some("zzzzzz.0123456789abcdef".into()),
        ..Default::default()
    };
    assert_eq!(
        resolve(&defaults(), Some(&persisted), &replace),
        Err(ResolveError::TokenImmutable)
    );

    let same = ClusterPatch {
        token: Some("abcdef.0123456789abcdef".into()),
        ..Default::default()
    };
    let config = resolve(&defaults(), Some(&persisted), &same).unwrap();
    assert_eq!(config.token, "abcdef.0123456789abcdef");

    let clear = ClusterPatch {
        token: Some(String::new()),
        ..Default::default()
    };
    let config = resolve(&defaults(), Some(&persisted), &clear).unwrap();
    assert_eq!(config.token, "");

    let cleared = ClusterPatch {
        token: Some(String::new()),
        ..persisted.clone()
    };
    let config = resolve(&defaults(), Some(&cleared), &replace).unwrap();
    assert_eq!(config.token, "zzzzzz.0123456789abcdef");
}

#[test]
fn test_shrink_below_running_fails_and_keeps_input() {
    let persisted = ClusterPatch {
        nodes: Some(3),
        machines: stored_machines(&[("dev-0", true), ("dev-1", true), ("dev-2", true)]),
        ..ClusterPatch::named("dev")
    };
    let before = persisted.clone();
    let overrides = ClusterPatch {
        nodes: Some(1),
        ..Default::default()
    };

    assert_eq!(
        resolve(&defaults(), Some(&persisted), &overrides),
        Err(ResolveError::MachineStillRunning(vec![
            "dev-1".into(),
            "dev-2".into()
        ]))
    );
    assert_eq!(persisted, before);
}

#[test]
fn test_shrink_drops_highest_ordinals() {
    let persisted = ClusterPatch {
        nodes: Some(3),
        machines: stored_machines(&[("dev-0", true), ("dev-1", false), ("dev-2", false)]),
        ..ClusterPatch::named("dev")
    };
    let overrides = ClusterPatch {
        nodes: Some(1),
        ..Default::default()
    };
    let config = resolve(&defaults(), Some(&persisted), &overrides).unwrap();
    assert_eq!(config.machines.len(), 1);
    assert_eq!(config.machines[0].name, "dev-0");
    assert!(config.machines[0].running);
}

#[test]
fn test_remove_machine_by_name() {
    let persisted = ClusterPatch {
        nodes: Some(3),
        machines: stored_machines(&[("dev-0", false), ("dev-1", true), ("dev-2", true)]),
        ..ClusterPatch::named("dev")
    };
    let overrides = ClusterPatch {
        nodes: Some(2),
        remove_machines: vec!["dev-0".into()],
        ..Default::default()
    };
    let config = resolve(&defaults(), Some(&persisted), &overrides).unwrap();
    let names: Vec<&str> = config.machines.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["dev-1", "dev-2"]);

    let running = ClusterPatch {
        remove_machines: vec!["dev-1".into()],
        ..Default::default()
    };
    assert_eq!(
        resolve(&defaults(), Some(&persisted), &running),
        Err(ResolveError::MachineStillRunning(vec!["dev-1".into()]))
    );
}

#[test]
fn test_remove_machine_without_node_count_stays_removed() {
    let mut persisted = ClusterPatch {
        nodes: Some(3),
        machines: stored_machines(&[("dev-0", false), ("dev-1", false), ("dev-2", false)]),
        ..ClusterPatch::named("dev")
    };
    persisted.machines[1].bindmount.read_only = Some(vec![PathMap::new("/src", "/src")]);
    let overrides = ClusterPatch {
        remove_machines: vec!["dev-1".into()],
        ..Default::default()
    };

    let config = resolve(&defaults(), Some(&persisted), &overrides).unwrap();
    let names: Vec<&str> = config.machines.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["dev-0", "dev-2"]);
    assert_eq!(config.nodes, 2);
}

#[test]
fn test_growth_fills_gaps_in_ordinals() {
    let persisted = ClusterPatch {
        nodes: Some(2),
        machines: stored_machines(&[("dev-0", false), ("dev-2", false)]),
        ..ClusterPatch::named("dev")
    };
    let overrides = ClusterPatch {
        nodes: Some(4),
        ..Default::default()
    };
    let config = resolve(&defaults(), Some(&persisted), &overrides).unwrap();
    let names: Vec<&str> = config.machines.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["dev-0", "dev-2", "dev-1", "dev-3"]);
}

#[test]
fn test_runtime_switch_leaves_previous_profile_inert() {
    let mut persisted = ClusterPatch {
        container_runtime: Some("rkt".into()),
        nodes: Some(0),
        ..ClusterPatch::named("dev")
    };
    persisted.runtime_config.rkt.rkt_bin = Some("/usr/bin/rkt".into());
    let overrides = ClusterPatch {
        container_runtime: Some("crio".into()),
        ..Default::default()
    };

    let config = resolve(&defaults(), Some(&persisted), &overrides).unwrap();
    assert_eq!(config.runtime().unwrap(), ContainerRuntime::Crio);
    assert!(config.runtime_config.inert.contains_key(&ContainerRuntime::Rkt));

    let warnings = config.runtime_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "rkt-bin");
}
