//! In-memory plan tree: modules → resources → attribute diffs.

mod json;
mod locate;

pub use json::{load_plan_json, parse_plan_json};
pub use locate::{locate_attribute, locate_resource};

use std::collections::BTreeMap;
use std::fmt;

pub const ROOT_MODULE: &str = "root";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub format_version: Option<String>,
    pub terraform_version: Option<String>,
    pub modules: Vec<ModuleDiff>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDiff {
    /// `root` or the module address, e.g. `module.network`.
    pub path: String,
    pub resources: BTreeMap<String, InstanceDiff>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceDiff {
    pub action: ChangeAction,
    pub attributes: BTreeMap<String, AttributeDiff>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeDiff {
    pub old: String,
    pub new: String,
    /// Value is only known after apply.
    pub new_computed: bool,
    pub sensitive: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeAction {
    #[default]
    NoOp,
    Create,
    Read,
    Update,
    Delete,
    Replace,
}

impl ChangeAction {
    /// Maps Terraform's `change.actions` list onto a single action.
    pub fn from_actions<S: AsRef<str>>(actions: &[S]) -> Self {
        let actions: Vec<&str> = actions.iter().map(AsRef::as_ref).collect();
        match actions.as_slice() {
            ["create"] => Self::Create,
            ["read"] => Self::Read,
            ["update"] => Self::Update,
            ["delete"] => Self::Delete,
            ["delete", "create"] | ["create", "delete"] => Self::Replace,
            _ => Self::NoOp,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoOp => "no-op",
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ModuleDiff {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            resources: BTreeMap::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path == ROOT_MODULE
    }
}

impl Plan {
    /// Every `module/resource` key in iteration order, used in failure messages.
    pub fn resource_keys(&self) -> Vec<String> {
        self.modules
            .iter()
            .flat_map(|module| {
                module
                    .resources
                    .keys()
                    .map(move |key| format!("{}/{}", module.path, key))
            })
            .collect()
    }

    pub fn resource_count(&self) -> usize {
        self.modules.iter().map(|m| m.resources.len()).sum()
    }

    /// Resource paths that appear in more than one module. The locator
    /// resolves these to the first module in order.
    pub fn duplicate_resource_paths(&self) -> Vec<&str> {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        for module in &self.modules {
            for key in module.resources.keys() {
                *seen.entry(key.as_str()).or_default() += 1;
            }
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(key, _)| key)
            .collect()
    }

    pub(crate) fn module_mut(&mut self, path: &str) -> &mut ModuleDiff {
        let index = match self.modules.iter().position(|m| m.path == path) {
            Some(index) => index,
            None => {
                self.modules.push(ModuleDiff::new(path));
                self.modules.len() - 1
            }
        };
        &mut self.modules[index]
    }
}
