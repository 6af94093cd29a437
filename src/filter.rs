use crate::model::{PanelConfig, PropertyGroup};
use std::sync::Arc;

/// Groups whose properties match `query` (case-insensitive, on label or id).
///
/// An empty query returns every group unchanged. A group survives when it or
/// any nested group has a match; survivors keep only their matching properties.
pub fn filter_groups(config: &PanelConfig, query: &str) -> Vec<Arc<PropertyGroup>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return config.groups.to_vec();
    }
    config
        .groups
        .iter()
        .filter_map(|g| filter_group(g, &needle))
        .collect()
}

fn filter_group(group: &Arc<PropertyGroup>, needle: &str) -> Option<Arc<PropertyGroup>> {
    let properties: Vec<_> = group
        .properties
        .iter()
        .filter(|p| p.label.to_lowercase().contains(needle) || p.id.to_lowercase().contains(needle))
        .cloned()
        .collect();
    let groups: Vec<_> = group
        .groups
        .iter()
        .filter_map(|g| filter_group(g, needle))
        .collect();

    if properties.is_empty() && groups.is_empty() {
        return None;
    }
    if properties.len() == group.properties.len()
        && groups.len() == group.groups.len()
        && groups.iter().zip(group.groups.iter()).all(|(a, b)| Arc::ptr_eq(a, b))
    {
        return Some(Arc::clone(group));
    }
    Some(Arc::new(PropertyGroup {
        properties: properties.into(),
        groups: groups.into(),
        ..PropertyGroup::clone(group)
    }))
}
