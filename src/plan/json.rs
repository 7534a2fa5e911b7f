//! Loads `terraform show -json` output. Attribute values are flattened the
//! way the legacy flat map did: nested maps and lists become dotted keys,
//! scalars their string form, and whole floats print without a fraction
//! (`1.0` becomes `1`).

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::{AttributeDiff, ChangeAction, InstanceDiff, Plan, ROOT_MODULE};
use crate::error::HarnessError;

/// Subset of `terraform show -json` output needed to rebuild the diff tree.
#[derive(Debug, Deserialize)]
struct JsonPlan {
    format_version: Option<String>,
    terraform_version: Option<String>,
    #[serde(default)]
    resource_changes: Vec<ResourceChange>,
}

#[derive(Debug, Deserialize)]
struct ResourceChange {
    address: String,
    #[serde(default)]
    module_address: Option<String>,
    /// Set on objects kept alive by `create_before_destroy`; they share the
    /// address of the current instance.
    #[serde(default)]
    deposed: Option<String>,
    change: Change,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    before: Option<Value>,
    #[serde(default)]
    after: Option<Value>,
    #[serde(default)]
    after_unknown: Option<Value>,
    #[serde(default)]
    before_sensitive: Option<Value>,
    #[serde(default)]
    after_sensitive: Option<Value>,
}

pub fn load_plan_json(path: &Path) -> Result<Plan, HarnessError> {
    let raw = std::fs::read_to_string(path).map_err(|source| HarnessError::PlanRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_plan_json(&raw)
}

pub fn parse_plan_json(raw: &str) -> Result<Plan, HarnessError> {
    let json: JsonPlan = serde_json::from_str(raw)?;

    let mut plan = Plan {
        format_version: json.format_version,
        terraform_version: json.terraform_version,
        modules: Vec::new(),
    };
    // Root first so that root resources win ties, matching Terraform's module order.
    plan.module_mut(ROOT_MODULE);

    for rc in json.resource_changes {
        let module_path = rc.module_address.as_deref().unwrap_or(ROOT_MODULE);
        let mut key = relative_address(&rc.address, rc.module_address.as_deref());
        if let Some(deposed) = &rc.deposed {
            key = format!("{key} (deposed {deposed})");
        }
        let diff = instance_diff(rc.change);
        tracing::debug!(module = module_path, resource = %key, action = %diff.action, "loaded resource");
        plan.module_mut(module_path).resources.insert(key, diff);
    }

    if plan.modules.len() > 1 && plan.modules[0].resources.is_empty() {
        plan.modules.remove(0);
    }
    Ok(plan)
}

fn relative_address(address: &str, module_address: Option<&str>) -> String {
    module_address
        .and_then(|m| address.strip_prefix(m))
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(address)
        .to_string()
}

fn instance_diff(change: Change) -> InstanceDiff {
    let before = flatten_root(change.before.as_ref());
    let after = flatten_root(change.after.as_ref());
    let unknown = flatten_flags(change.after_unknown.as_ref());
    let sensitive: BTreeSet<String> = flatten_flags(change.after_sensitive.as_ref())
        .union(&flatten_flags(change.before_sensitive.as_ref()))
        .cloned()
        .collect();

    let names: BTreeSet<&String> = before.keys().chain(after.keys()).chain(unknown.iter()).collect();
    let attributes = names
        .into_iter()
        .map(|name| {
            let diff = AttributeDiff {
                old: before.get(name).cloned().unwrap_or_default(),
                new: after.get(name).cloned().unwrap_or_default(),
                new_computed: covered_by(&unknown, name),
                sensitive: covered_by(&sensitive, name),
            };
            (name.clone(), diff)
        })
        .collect();

    InstanceDiff {
        action: ChangeAction::from_actions(change.actions.as_slice()),
        attributes,
    }
}

fn flatten_root(value: Option<&Value>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let Some(Value::Object(map)) = value {
        for (key, v) in map {
            flatten_into(&mut out, key, v);
        }
    }
    out
}

/// Flat attribute map: maps get a `.%` count, lists a `.#` length.
fn flatten_into(out: &mut BTreeMap<String, String>, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            out.insert(format!("{prefix}.%"), map.len().to_string());
            for (key, v) in map {
                flatten_into(out, &format!("{prefix}.{key}"), v);
            }
        }
        Value::Array(items) => {
            out.insert(format!("{prefix}.#"), items.len().to_string());
            for (i, v) in items.iter().enumerate() {
                flatten_into(out, &format!("{prefix}.{i}"), v);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Null => {
            out.insert(prefix.to_string(), String::new());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), number_string(n));
        }
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
    }
}

fn number_string(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

/// A mask leaf marks its own key and everything flattened beneath it.
fn covered_by(flags: &BTreeSet<String>, name: &str) -> bool {
    flags.iter().any(|flag| {
        name == flag.as_str()
            || name
                .strip_prefix(flag.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

/// Collects the flattened names of every `true` leaf in an unknown/sensitive mask.
fn flatten_flags(mask: Option<&Value>) -> BTreeSet<String> {
    fn walk(out: &mut BTreeSet<String>, prefix: &str, value: &Value) {
        match value {
            Value::Bool(true) => {
                out.insert(prefix.to_string());
            }
            Value::Object(map) => {
                for (key, v) in map {
                    walk(out, &format!("{prefix}.{key}"), v);
                }
            }
            Value::Array(items) => {
                for (i, v) in items.iter().enumerate() {
                    walk(out, &format!("{prefix}.{i}"), v);
                }
            }
            _ => {}
        }
    }

    let mut out = BTreeSet::new();
    if let Some(Value::Object(map)) = mask {
        for (key, v) in map {
            walk(&mut out, key, v);
        }
    }
    out
}
