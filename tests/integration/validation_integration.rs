//! Validation of resolved configurations

use super::test_utils::defaults;
use kspawn::cluster::{ContainerRuntime, PathMap};
use kspawn::config::{BindmountPatch, ClusterPatch, MachinePatch};
use kspawn::resolve::resolve;
use kspawn::validation::{validate, ValidationError};

#[test]
fn test_duplicate_destination_between_cluster_and_machine() {
    let persisted = ClusterPatch {
        nodes: Some(2),
        bindmount: BindmountPatch {
            read_only: None,
            read_write: Some(vec![PathMap::new("/srv/foo", "/etc/foo")]),
        },
        machines: vec![
            MachinePatch::named("dev-0"),
            MachinePatch {
                bindmount: BindmountPatch {
                    read_only: Some(vec![PathMap::new("/home/me/foo", "/etc/foo")]),
                    read_write: None,
                },
                ..MachinePatch::named("dev-1")
            },
        ],
        ..ClusterPatch::named("dev")
    };

    let config = resolve(&defaults(), Some(&persisted), &ClusterPatch::default()).unwrap();
    assert_eq!(
        validate(&config),
        vec![ValidationError::DuplicateBindDestination {
            scope: "machines[dev-1]".into(),
            dst: "/etc/foo".into(),
        }]
    );
}

#[test]
fn test_every_problem_reported_in_one_pass() {
    let mut overrides = ClusterPatch {
        nodes: Some(-1),
        container_runtime: Some("rkt".into()),
        bindmount: BindmountPatch {
            read_only: Some(vec![PathMap::new("", "/opt")]),
            read_write: Some(vec![PathMap::new("/a", "/x"), PathMap::new("/b", "/x")]),
        },
        ..ClusterPatch::named("dev")
    };
    overrides.runtime_config.rkt.rkt_bin = Some("/usr/bin/rkt".into());

    let config = resolve(&defaults(), None, &overrides).unwrap();
    let errors = validate(&config);

    assert!(errors.contains(&ValidationError::InvalidNodeCount(-1)));
    assert!(errors.contains(&ValidationError::IncompleteRuntimeConfig {
        runtime: ContainerRuntime::Rkt,
        missing: vec!["stage1-image", "rktlet-bin"],
    }));
    assert!(errors.contains(&ValidationError::InvalidPathMapping {
        location: "bindmount.read-only[0]".into(),
        src: String::new(),
        dst: "/opt".into(),
    }));
    assert!(errors.contains(&ValidationError::DuplicateBindDestination {
        scope: "bindmount".into(),
        dst: "/x".into(),
    }));
    assert!(!errors
        .iter()
        .any(|e| matches!(e, ValidationError::MachineCountMismatch { .. })));
    assert_eq!(errors.len(), 4);
}

#[test]
fn test_unknown_runtime_and_missing_name() {
    let overrides = ClusterPatch {
        container_runtime: Some("containerd".into()),
        nodes: Some(0),
        name: Some(String::new()),
        ..Default::default()
    };
    let config = resolve(&defaults(), None, &overrides).unwrap();
    assert_eq!(
        validate(&config),
        vec![
            ValidationError::MissingClusterName,
            ValidationError::UnknownRuntime("containerd".into()),
        ]
    );
}

#[test]
fn test_nameless_cluster_cannot_synthesize_machines() {
    let config = resolve(&defaults(), None, &ClusterPatch::default()).unwrap();
    let errors = validate(&config);
    assert!(errors.contains(&ValidationError::MissingClusterName));
    assert!(errors.contains(&ValidationError::MachineCountMismatch {
        nodes: 3,
        machines: 0
    }));
}
