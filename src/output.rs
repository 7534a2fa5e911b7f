use tabled::settings::Style;
use tabled::{Table, Tabled};
use termtree::Tree;

use crate::plan::{AttributeDiff, Plan};

const SENSITIVE: &str = "(sensitive)";
const COMPUTED: &str = "(known after apply)";

#[derive(Debug, Tabled)]
struct ResourceRow {
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Attributes")]
    attributes: usize,
}

pub fn render_table(plan: &Plan) -> String {
    let rows: Vec<ResourceRow> = plan
        .modules
        .iter()
        .flat_map(|module| {
            module.resources.iter().map(|(key, diff)| ResourceRow {
                module: module.path.clone(),
                resource: key.clone(),
                action: diff.action.to_string(),
                attributes: diff.attributes.len(),
            })
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Module → resource → `attr: old => new` tree. Multi-line values are
/// reduced to their first line.
pub fn render_tree(plan: &Plan) -> String {
    let title = match &plan.terraform_version {
        Some(version) => format!("plan (terraform {version})"),
        None => "plan".to_string(),
    };

    let modules = plan.modules.iter().map(|module| {
        let resources = module.resources.iter().map(|(key, diff)| {
            let attributes = diff
                .attributes
                .iter()
                .map(|(name, attr)| Tree::new(format!("{name}: {}", describe(attr))));
            Tree::new(format!("{key} ({})", diff.action)).with_leaves(attributes)
        });
        Tree::new(module.path.clone()).with_leaves(resources)
    });

    Tree::new(title).with_leaves(modules).to_string()
}

fn describe(attr: &AttributeDiff) -> String {
    if attr.sensitive {
        return SENSITIVE.to_string();
    }
    let new = if attr.new_computed {
        COMPUTED
    } else {
        first_line(&attr.new)
    };
    if attr.old.is_empty() {
        format!("{new:?}")
    } else {
        format!("{:?} => {new:?}", first_line(&attr.old))
    }
}

fn first_line(value: &str) -> &str {
    value.lines().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::parse_plan_json;

    fn sample() -> Plan {
        parse_plan_json(
            r#"{
                "terraform_version": "1.7.5",
                "resource_changes": [{
                    "address": "aws_iam_policy.secrets_policy",
                    "change": {
                        "actions": ["create"],
                        "after": {"name": "test-mycomponent-secrets", "policy": "{\n  \"Version\": \"2012-10-17\"\n}"},
                        "after_unknown": {"arn": true}
                    }
                }, {
                    "address": "module.db.aws_db_instance.main",
                    "module_address": "module.db",
                    "change": {
                        "actions": ["update"],
                        "before": {"password": "old", "instance_class": "db.t3.micro"},
                        "after": {"password": "new", "instance_class": "db.t3.small"},
                        "after_sensitive": {"password": true}
                    }
                }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_render_table_lists_every_resource() {
        let table = render_table(&sample());
        assert!(table.contains("Module"));
        assert!(table.contains("aws_iam_policy.secrets_policy"));
        assert!(table.contains("module.db"));
        assert!(table.contains("update"));
    }

    #[test]
    fn test_render_tree() {
        let tree = render_tree(&sample());
        assert!(tree.starts_with("plan (terraform 1.7.5)"));
        assert!(tree.contains("aws_iam_policy.secrets_policy (create)"));
        assert!(tree.contains(r#"name: "test-mycomponent-secrets""#));
        assert!(tree.contains(r#"policy: "{""#));
        assert!(tree.contains("arn: \"(known after apply)\""));
        assert!(tree.contains(r#"instance_class: "db.t3.micro" => "db.t3.small""#));
        assert!(tree.contains("password: (sensitive)"));
        assert!(!tree.contains("\"new\""));
    }

    #[test]
    fn test_render_tree_hides_children_of_sensitive_map() {
        let plan = parse_plan_json(
            r#"{"resource_changes": [{
                "address": "aws_ssm_parameter.db",
                "change": {
                    "actions": ["create"],
                    "after": {"tags": {"Secret": "hunter2"}},
                    "after_sensitive": {"tags": true}
                }
            }]}"#,
        )
        .unwrap();
        let tree = render_tree(&plan);
        assert!(tree.contains("tags.Secret: (sensitive)"));
        assert!(!tree.contains("hunter2"));
    }
}
