use crate::model::{Children, PanelConfig, PropertyGroup, PropertyItem};
use crate::schema::{SchemaError, validate};
use crate::signal::{Publisher, SubscriptionId};
use crate::value::RawValue;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The value published to store subscribers. `None` means no panel is loaded.
pub type Snapshot = Option<Arc<PanelConfig>>;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("panel document is not valid JSON: {0}")]
    Parse(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Owns the current panel tree and republishes it after every change.
///
/// Published trees are never mutated; an edit produces a new tree that shares
/// every subtree off the edited path with its predecessor.
#[derive(Debug)]
pub struct ConfigStore {
    current: Publisher<Snapshot>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            current: Publisher::new(None),
        }
    }

    /// Validate `raw` and install it. On failure the current tree is untouched.
    pub fn load(&mut self, raw: &RawValue) -> Result<Arc<PanelConfig>, SchemaError> {
        let config = match validate(raw) {
            Ok(config) => Arc::new(config),
            Err(err) => {
                warn!(kind = %err.kind, path = %err.path, "Rejected panel document");
                return Err(err);
            }
        };
        info!(panel = %config.id, title = %config.title, "Loaded panel");
        self.current.publish(Some(Arc::clone(&config)));
        Ok(config)
    }

    pub fn load_str(&mut self, text: &str) -> Result<Arc<PanelConfig>, LoadError> {
        let raw = RawValue::parse(text).map_err(|e| LoadError::Parse(e.to_string()))?;
        Ok(self.load(&raw)?)
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&Snapshot) + 'static) -> SubscriptionId {
        self.current.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.current.unsubscribe(id)
    }

    /// Replace the value of property `id`. Returns whether the tree changed.
    ///
    /// Unknown ids, values of the wrong JSON type, and an empty store are
    /// silent no-ops: nothing is published.
    pub fn update_property_value(&mut self, id: &str, value: &RawValue) -> bool {
        let Some(current) = self.current.latest().clone() else {
            debug!(property = %id, "Ignoring property update, no panel loaded");
            return false;
        };
        let next = update_property_value(&current, id, value);
        if Arc::ptr_eq(&next, &current) {
            return false;
        }
        debug!(panel = %next.id, property = %id, "Updated property value");
        self.current.publish(Some(next));
        true
    }

    pub fn reset(&mut self) {
        info!("Reset panel");
        self.current.publish(None);
    }

    pub fn snapshot(&self) -> Snapshot {
        self.current.latest().clone()
    }
}

/// Tree with property `id` holding `value`, rebuilt along the path to it.
///
/// Returns `tree` itself (same `Arc`) when no property has that id or when the
/// property's type cannot hold `value`.
pub fn update_property_value(
    tree: &Arc<PanelConfig>,
    id: &str,
    value: &RawValue,
) -> Arc<PanelConfig> {
    match replace_in_groups(&tree.groups, id, value) {
        Some(groups) => Arc::new(PanelConfig {
            groups,
            ..PanelConfig::clone(tree)
        }),
        None => Arc::clone(tree),
    }
}

fn replace_in_groups(
    groups: &Children<PropertyGroup>,
    id: &str,
    value: &RawValue,
) -> Option<Children<PropertyGroup>> {
    groups.iter().enumerate().find_map(|(i, group)| {
        let replaced = replace_in_group(group, id, value)?;
        Some(with_child(groups, i, replaced))
    })
}

/// Properties are searched before nested groups.
fn replace_in_group(
    group: &Arc<PropertyGroup>,
    id: &str,
    value: &RawValue,
) -> Option<Arc<PropertyGroup>> {
    if let Some(i) = group.properties.iter().position(|p| p.id == id) {
        let prop = &group.properties[i];
        let Some(kind) = prop.kind.with_value(value) else {
            warn!(
                property = %id,
                expected = %prop.property_type(),
                found = value.type_name(),
                "Ignoring property update with mismatched value type"
            );
            return None;
        };
        let updated = Arc::new(PropertyItem {
            kind,
            ..PropertyItem::clone(prop)
        });
        return Some(Arc::new(PropertyGroup {
            properties: with_child(&group.properties, i, updated),
            ..PropertyGroup::clone(group)
        }));
    }

    let groups = replace_in_groups(&group.groups, id, value)?;
    Some(Arc::new(PropertyGroup {
        groups,
        ..PropertyGroup::clone(group)
    }))
}

/// New child array with slot `index` replaced; the other entries are shared.
fn with_child<T>(children: &Children<T>, index: usize, child: Arc<T>) -> Children<T> {
    let mut next = children.to_vec();
    next[index] = child;
    next.into()
}
