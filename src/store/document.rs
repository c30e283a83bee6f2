//! On-disk schema of `kspawn.toml`, write side.
//!
//! A save edits the stored document in place: a value is rewritten only when it differs
//! from what the document already holds, so comments, ordering, hand-edited entries,
//! unknown keys and blocks of unselected runtimes survive unchanged.
//!
//! An absent key reads back as its built-in default, so a value equal to that default is
//! not added. Any other value is written, even an empty string or `false`.

use crate::cluster::{
    Bindmount, ClusterConfiguration, ContainerRuntime, MachineConfiguration, PathMap,
    RuntimeConfiguration, RuntimeProfile,
};
use crate::config::{
    DEFAULT_CGROUP_PER_QOS, DEFAULT_CNI_PLUGIN_DIR, DEFAULT_CONTAINER_RUNTIME, DEFAULT_IMAGE,
    DEFAULT_KUBERNETES_VERSION, DEFAULT_KUBE_SPAWN_DIR, DEFAULT_RUNTIME_TIMEOUT,
};
use toml_edit::{Array, ArrayOfTables, DocumentMut, InlineTable, Item, Table, TableLike, Value};

const AUTOGENERATED: &str = "# autogenerated. do not edit!\n";

/// A fresh document for `config`.
pub(crate) fn render(config: &ClusterConfiguration) -> DocumentMut {
    let mut document = DocumentMut::new();
    sync_cluster(document.as_table_mut(), config);
    document
}

/// `text` with `config` written into it.
pub(crate) fn update(
    text: &str,
    config: &ClusterConfiguration,
) -> Result<DocumentMut, toml_edit::TomlError> {
    let mut document: DocumentMut = text.parse()?;
    sync_cluster(document.as_table_mut(), config);
    Ok(document)
}

fn sync_cluster(root: &mut Table, config: &ClusterConfiguration) {
    sync_str_or(root, "dir", &config.kube_spawn_dir, DEFAULT_KUBE_SPAWN_DIR);
    sync_str_or(root, "cni-plugin-dir", &config.cni_plugin_dir, DEFAULT_CNI_PLUGIN_DIR);
    sync_str(root, "cluster-name", &config.name);
    sync_str_or(root, "container-runtime", &config.container_runtime, DEFAULT_CONTAINER_RUNTIME);
    sync_str_or(root, "kubernetes-version", &config.kubernetes_version, DEFAULT_KUBERNETES_VERSION);
    sync_str_or(root, "image", &config.image, DEFAULT_IMAGE);
    sync_int(root, "nodes", config.nodes);
    sync_bool(root, "dev", config.dev_cluster);
    sync_str(root, "hyperkube-tag", &config.hyperkube_tag);
    sync_autogenerated(root, "token", &config.token);
    sync_autogenerated(root, "token-groups-option", &config.token_groups_option);
    sync_runtime(root, &config.runtime_config);
    sync_bindmount(root, &config.bindmount);
    sync_machines(root, &config.machines);
}

fn sync_runtime(root: &mut Table, runtime: &RuntimeConfiguration) {
    let Some(table) = ensure_table(root, "runtime-config") else {
        return;
    };
    match &runtime.endpoint {
        Some(endpoint) => sync_str(table, "endpoint", endpoint),
        None => {
            table.remove("endpoint");
        }
    }
    sync_str_or(table, "timeout", &runtime.timeout, DEFAULT_RUNTIME_TIMEOUT);
    sync_bool(table, "use-legacy-cgroup-driver", runtime.use_legacy_cgroup_driver);
    sync_bool_or(table, "cgroup-per-qos", runtime.cgroup_per_qos, DEFAULT_CGROUP_PER_QOS);
    sync_bool(table, "fail-swap-on", runtime.fail_swap_on);

    // Blocks are written for active and inert profiles alike; an empty profile
    // never creates a block.
    for selector in ContainerRuntime::ALL {
        let profile = runtime
            .profile(selector)
            .cloned()
            .unwrap_or_else(|| RuntimeProfile::empty(selector));
        let fields = profile.fields();
        if fields.is_empty() || (profile.is_empty() && !table.contains_key(selector.as_str())) {
            continue;
        }
        let Some(block) = ensure_table(table, selector.as_str()) else {
            continue;
        };
        for (key, value) in fields {
            sync_str(block, key, value);
        }
    }
}

fn sync_bindmount(parent: &mut dyn TableLike, mounts: &Bindmount) {
    if mounts.is_empty() && !parent.contains_key("bindmount") {
        return;
    }
    let multiline = !parent.get("bindmount").is_some_and(Item::is_inline_table);
    let Some(table) = ensure_table(parent, "bindmount") else {
        return;
    };
    sync_pathmaps(table, "read-only", &mounts.read_only, multiline);
    sync_pathmaps(table, "read-write", &mounts.read_write, multiline);
}

/// Machine tables are matched by name; tables of dropped machines go, new ones are appended.
fn sync_machines(root: &mut Table, machines: &[MachineConfiguration]) {
    if machines.is_empty() {
        root.remove("machines");
        return;
    }

    let mut existing: Vec<Table> = root
        .get("machines")
        .and_then(Item::as_array_of_tables)
        .map(|tables| tables.iter().cloned().collect())
        .unwrap_or_default();

    let mut synced = ArrayOfTables::new();
    for machine in machines {
        let position = existing
            .iter()
            .position(|t| t.get("name").and_then(Item::as_str) == Some(machine.name.as_str()));
        let mut table = match position {
            Some(index) => existing.remove(index),
            None => fresh_machine(machine),
        };
        sync_bool(&mut table, "running", machine.running);
        sync_str(&mut table, "name", &machine.name);
        sync_str(&mut table, "ip", &machine.ip);
        sync_bindmount(&mut table, &machine.bindmount);
        synced.push(table);
    }

    match root.get_mut("machines") {
        Some(slot) => *slot = Item::ArrayOfTables(synced),
        None => {
            root.insert("machines", Item::ArrayOfTables(synced));
        }
    }
}

fn fresh_machine(machine: &MachineConfiguration) -> Table {
    let mut table = Table::new();
    let fields = [
        ("running", Value::from(machine.running)),
        ("name", Value::from(machine.name.as_str())),
        ("ip", Value::from(machine.ip.as_str())),
    ];
    for (key, value) in fields {
        table.insert(key, Item::Value(value));
        mark_autogenerated(&mut table, key);
    }
    table
}

fn mark_autogenerated(table: &mut Table, key: &str) {
    if let Some(mut key) = table.key_mut(key) {
        key.leaf_decor_mut().set_prefix(AUTOGENERATED);
    }
}

fn ensure_table<'a>(parent: &'a mut dyn TableLike, key: &str) -> Option<&'a mut dyn TableLike> {
    if !parent.get(key).is_some_and(Item::is_table_like) {
        parent.insert(key, Item::Table(Table::new()));
    }
    parent.get_mut(key).and_then(Item::as_table_like_mut)
}

/// Replace or insert a value, keeping the decor (spacing, trailing comment) of the old one.
fn put(table: &mut dyn TableLike, key: &str, mut value: Value) {
    match table.get_mut(key) {
        Some(slot) => {
            if let Some(old) = slot.as_value() {
                *value.decor_mut() = old.decor().clone();
            }
            *slot = Item::Value(value);
        }
        None => {
            table.insert(key, Item::Value(value));
        }
    }
}

fn sync_str(table: &mut dyn TableLike, key: &str, value: &str) {
    sync_str_or(table, key, value, "");
}

/// `default` is what an absent key resolves to.
fn sync_str_or(table: &mut dyn TableLike, key: &str, value: &str, default: &str) {
    match table.get(key) {
        None if value == default => {}
        Some(item) if item.as_str() == Some(value) => {}
        _ => put(table, key, Value::from(value)),
    }
}

fn sync_bool(table: &mut dyn TableLike, key: &str, value: bool) {
    sync_bool_or(table, key, value, false);
}

fn sync_bool_or(table: &mut dyn TableLike, key: &str, value: bool, default: bool) {
    match table.get(key) {
        None if value == default => {}
        Some(item) if item.as_bool() == Some(value) => {}
        _ => put(table, key, Value::from(value)),
    }
}

fn sync_int(table: &mut dyn TableLike, key: &str, value: i64) {
    match table.get(key) {
        Some(item) if item.as_integer() == Some(value) => {}
        _ => put(table, key, Value::from(value)),
    }
}

/// Tool-owned top-level strings. An empty value removes the key.
fn sync_autogenerated(table: &mut Table, key: &str, value: &str) {
    if value.is_empty() {
        table.remove(key);
        return;
    }
    if table.get(key).and_then(Item::as_str) == Some(value) {
        return;
    }
    let fresh = !table.contains_key(key);
    put(table, key, Value::from(value));
    if fresh {
        mark_autogenerated(table, key);
    }
}

fn sync_pathmaps(table: &mut dyn TableLike, key: &str, maps: &[PathMap], multiline: bool) {
    match table.get(key) {
        None if maps.is_empty() => {}
        Some(item) if read_pathmaps(item).as_deref() == Some(maps) => {}
        _ => put(table, key, Value::Array(pathmap_array(maps, multiline))),
    }
}

/// Accepts both `key = [{ src, dst }]` and `[[key]]` spellings.
fn read_pathmaps(item: &Item) -> Option<Vec<PathMap>> {
    if let Some(tables) = item.as_array_of_tables() {
        return Some(
            tables
                .iter()
                .map(|t| {
                    PathMap::new(
                        t.get("src").and_then(Item::as_str).unwrap_or_default(),
                        t.get("dst").and_then(Item::as_str).unwrap_or_default(),
                    )
                })
                .collect(),
        );
    }
    item.as_array()?
        .iter()
        .map(|value| {
            let entry = value.as_inline_table()?;
            Some(PathMap::new(
                entry.get("src").and_then(Value::as_str).unwrap_or_default(),
                entry.get("dst").and_then(Value::as_str).unwrap_or_default(),
            ))
        })
        .collect()
}

fn pathmap_array(maps: &[PathMap], multiline: bool) -> Array {
    let mut array = Array::new();
    for map in maps {
        let mut entry = InlineTable::new();
        entry.insert("src", Value::from(map.src.as_str()));
        entry.insert("dst", Value::from(map.dst.as_str()));
        array.push(entry);
    }
    if multiline && !array.is_empty() {
        for value in array.iter_mut() {
            value.decor_mut().set_prefix("\n    ");
        }
        array.set_trailing_comma(true);
        array.set_trailing("\n");
    }
    array
}
