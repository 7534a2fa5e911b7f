use super::{AttributeDiff, InstanceDiff, Plan};

/// Finds `resource_path` in the plan.
///
/// Modules are searched in their stored order and the first module holding
/// the key wins. The path is an opaque key: no segment parsing is done, so a
/// nested resource must be addressed by its module-relative key.
pub fn locate_resource<'a>(plan: &'a Plan, resource_path: &str) -> Option<&'a InstanceDiff> {
    let mut hits = plan
        .modules
        .iter()
        .filter_map(|module| module.resources.get(resource_path).map(|d| (module, d)));

    let (module, diff) = hits.next()?;
    let shadowed: Vec<&str> = hits.map(|(m, _)| m.path.as_str()).collect();
    if !shadowed.is_empty() {
        tracing::warn!(
            resource = resource_path,
            module = %module.path,
            shadowed = ?shadowed,
            "resource path present in several modules, using first"
        );
    }
    Some(diff)
}

pub fn locate_attribute<'a>(
    instance_diff: &'a InstanceDiff,
    attribute_name: &str,
) -> Option<&'a AttributeDiff> {
    instance_diff.attributes.get(attribute_name)
}
