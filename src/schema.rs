//! Validation and normalization of untrusted panel documents.
//!
//! [`validate`] is all-or-nothing: it either returns a complete [`PanelConfig`]
//! or the first rule violation it met, with the location of the offending node.

use crate::model::{
    Children, OptionValue, PanelConfig, PropertyGroup, PropertyItem, PropertyKind, PropertyType,
    SelectOption,
};
use crate::statics;
use crate::value::{Number, RawValue};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaErrorKind {
    MissingField,
    InvalidRoot,
    InvalidGroup,
    InvalidProperty,
    UnknownPropertyType,
    InvalidOptionSet,
    InvalidRange,
    DuplicateId,
}

impl SchemaErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaErrorKind::MissingField => "MissingField",
            SchemaErrorKind::InvalidRoot => "InvalidRoot",
            SchemaErrorKind::InvalidGroup => "InvalidGroup",
            SchemaErrorKind::InvalidProperty => "InvalidProperty",
            SchemaErrorKind::UnknownPropertyType => "UnknownPropertyType",
            SchemaErrorKind::InvalidOptionSet => "InvalidOptionSet",
            SchemaErrorKind::InvalidRange => "InvalidRange",
            SchemaErrorKind::DuplicateId => "DuplicateId",
        }
    }
}

impl fmt::Display for SchemaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected panel document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} at {path}: {message} (in {fragment})")]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    /// Location of the offending node, e.g. `$.groups[0].properties[2]`.
    pub path: String,
    pub message: String,
    /// Compact JSON of the offending node, truncated.
    pub fragment: String,
}

impl SchemaError {
    fn new(kind: SchemaErrorKind, path: &str, node: &RawValue, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.to_string(),
            message: message.into(),
            fragment: fragment_of(node),
        }
    }
}

fn fragment_of(node: &RawValue) -> String {
    let full = node.to_json_compact();
    if full.chars().count() <= statics::ERROR_FRAGMENT_MAX_CHARS {
        return full;
    }
    let mut cut: String = full.chars().take(statics::ERROR_FRAGMENT_MAX_CHARS).collect();
    cut.push_str("...");
    cut
}

type Result<T> = std::result::Result<T, SchemaError>;

/// Validate a raw document and build the typed tree.
pub fn validate(raw: &RawValue) -> Result<PanelConfig> {
    let path = "$";
    let Some(root) = raw.as_object() else {
        return Err(SchemaError::new(
            SchemaErrorKind::InvalidRoot,
            path,
            raw,
            format!("expected an object, found {}", raw.type_name()),
        ));
    };

    let id = required_str(root, statics::FIELD_ID, path, raw, SchemaErrorKind::MissingField)?;
    let title = required_str(root, statics::FIELD_TITLE, path, raw, SchemaErrorKind::MissingField)?;
    let icon = optional_str(root, statics::FIELD_ICON, path, raw, SchemaErrorKind::InvalidRoot)?;
    let min_width = optional_width(root, statics::FIELD_MIN_WIDTH, path, raw)?;
    let max_width = optional_width(root, statics::FIELD_MAX_WIDTH, path, raw)?;
    if let (Some(min), Some(max)) = (min_width, max_width) {
        if min > max {
            return Err(SchemaError::new(
                SchemaErrorKind::InvalidRoot,
                path,
                raw,
                format!("minWidth {min} exceeds maxWidth {max}"),
            ));
        }
    }

    let groups_raw = match root.get(statics::FIELD_GROUPS) {
        None | Some(RawValue::Null) => {
            return Err(SchemaError::new(
                SchemaErrorKind::MissingField,
                path,
                raw,
                "missing `groups`",
            ));
        }
        Some(v) => v.as_array().ok_or_else(|| {
            SchemaError::new(
                SchemaErrorKind::InvalidRoot,
                path,
                raw,
                format!("`groups` must be an array, found {}", v.type_name()),
            )
        })?,
    };
    let groups = validate_groups(groups_raw, path)?;

    let config = PanelConfig {
        id,
        title,
        icon,
        min_width,
        max_width,
        groups,
    };
    check_unique_ids(&config)?;

    tracing::debug!(panel = %config.id, groups = config.groups.len(), "Validated panel document");
    Ok(config)
}

fn validate_groups(items: &[RawValue], parent: &str) -> Result<Children<PropertyGroup>> {
    items
        .iter()
        .enumerate()
        .map(|(i, g)| validate_group(g, &format!("{parent}.groups[{i}]")).map(Arc::new))
        .collect()
}

fn validate_group(raw: &RawValue, path: &str) -> Result<PropertyGroup> {
    let kind = SchemaErrorKind::InvalidGroup;
    let Some(obj) = raw.as_object() else {
        return Err(SchemaError::new(
            kind,
            path,
            raw,
            format!("expected an object, found {}", raw.type_name()),
        ));
    };

    let id = required_str(obj, statics::FIELD_ID, path, raw, kind)?;
    let title = required_str(obj, statics::FIELD_TITLE, path, raw, kind)?;
    let expanded = optional_bool(obj, statics::FIELD_EXPANDED, path, raw, kind)?.unwrap_or(true);
    let readonly = optional_bool(obj, statics::FIELD_READONLY, path, raw, kind)?.unwrap_or(false);
    let accordion = optional_bool(obj, statics::FIELD_ACCORDION, path, raw, kind)?.unwrap_or(true);
    let edit = optional_bool(obj, statics::FIELD_EDIT, path, raw, kind)?;

    // A group without `properties` is an empty group, not an error.
    let properties = match optional_array(obj, statics::FIELD_PROPERTIES, path, raw, kind)? {
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(i, p)| {
                validate_property(p, &format!("{path}.properties[{i}]")).map(Arc::new)
            })
            .collect::<Result<Children<PropertyItem>>>()?,
        None => Arc::from(Vec::new()),
    };
    let groups = match optional_array(obj, statics::FIELD_GROUPS, path, raw, kind)? {
        Some(items) => validate_groups(items, path)?,
        None => Arc::from(Vec::new()),
    };

    Ok(PropertyGroup {
        id,
        title,
        expanded,
        readonly,
        accordion,
        edit,
        properties,
        groups,
    })
}

fn validate_property(raw: &RawValue, path: &str) -> Result<PropertyItem> {
    let kind = SchemaErrorKind::InvalidProperty;
    let Some(obj) = raw.as_object() else {
        return Err(SchemaError::new(
            kind,
            path,
            raw,
            format!("expected an object, found {}", raw.type_name()),
        ));
    };

    let id = required_str(obj, statics::FIELD_ID, path, raw, kind)?;
    let label = required_str(obj, statics::FIELD_LABEL, path, raw, kind)?;
    let type_name = required_str(obj, statics::FIELD_TYPE, path, raw, kind)?;
    let Some(property_type) = PropertyType::from_name(&type_name) else {
        return Err(SchemaError::new(
            SchemaErrorKind::UnknownPropertyType,
            path,
            raw,
            format!("unknown property type `{type_name}`"),
        ));
    };
    let disabled = optional_bool(obj, statics::FIELD_DISABLED, path, raw, kind)?.unwrap_or(false);
    let readonly = optional_bool(obj, statics::FIELD_READONLY, path, raw, kind)?.unwrap_or(false);

    let value = obj.get(statics::FIELD_VALUE);
    // Empty strings count as missing, like absent values.
    let string_value = |default: &str| -> String {
        match value.and_then(RawValue::as_str) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => default.to_string(),
        }
    };

    let property_kind = match property_type {
        PropertyType::Text => PropertyKind::Text {
            value: string_value(""),
            placeholder: optional_str(obj, statics::FIELD_PLACEHOLDER, path, raw, kind)?,
        },
        PropertyType::Number => {
            let range = SchemaErrorKind::InvalidRange;
            PropertyKind::Number {
                value: value.and_then(RawValue::as_finite_number).unwrap_or(Number::I64(0)),
                min: optional_number(obj, statics::FIELD_MIN, path, raw, range)?,
                max: optional_number(obj, statics::FIELD_MAX, path, raw, range)?,
                step: optional_number(obj, statics::FIELD_STEP, path, raw, range)?,
                show_buttons: optional_bool(obj, statics::FIELD_SHOW_BUTTONS, path, raw, kind)?,
            }
        }
        PropertyType::Color => PropertyKind::Color {
            value: string_value(statics::DEFAULT_COLOR),
        },
        PropertyType::Date => PropertyKind::Date {
            value: string_value(""),
        },
        PropertyType::Select => {
            let options = validate_options(obj, path, raw)?;
            PropertyKind::Select {
                value: value
                    .and_then(OptionValue::from_raw)
                    .unwrap_or_else(|| OptionValue::String(String::new())),
                options,
            }
        }
        PropertyType::Slider => {
            let range = SchemaErrorKind::InvalidRange;
            let bound = |field: &str| -> Result<Number> {
                optional_number(obj, field, path, raw, range)?.ok_or_else(|| {
                    SchemaError::new(range, path, raw, format!("slider requires numeric `{field}`"))
                })
            };
            let min = bound(statics::FIELD_MIN)?;
            let max = bound(statics::FIELD_MAX)?;
            if min.as_f64() > max.as_f64() {
                return Err(SchemaError::new(
                    range,
                    path,
                    raw,
                    "slider `min` exceeds `max`",
                ));
            }
            let step = optional_number(obj, statics::FIELD_STEP, path, raw, range)?
                .filter(|s| s.as_f64() != 0.0)
                .unwrap_or(Number::I64(1));
            PropertyKind::Slider {
                value: value.and_then(RawValue::as_finite_number).unwrap_or(min),
                min,
                max,
                step,
                show_input: optional_bool(obj, statics::FIELD_SHOW_INPUT, path, raw, kind)?
                    .unwrap_or(false),
            }
        }
        PropertyType::Toggle => PropertyKind::Toggle {
            value: value == Some(&RawValue::Bool(true)),
        },
        PropertyType::Readonly => PropertyKind::Readonly {
            value: string_value(""),
        },
    };

    Ok(PropertyItem {
        id,
        label,
        disabled,
        readonly,
        kind: property_kind,
    })
}

fn validate_options(
    obj: &IndexMap<String, RawValue>,
    path: &str,
    raw: &RawValue,
) -> Result<Vec<SelectOption>> {
    let kind = SchemaErrorKind::InvalidOptionSet;
    let Some(items) = obj.get(statics::FIELD_OPTIONS).and_then(RawValue::as_array) else {
        return Err(SchemaError::new(
            kind,
            path,
            raw,
            "select requires an `options` array",
        ));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, opt)| {
            let opt_path = format!("{path}.options[{i}]");
            let label = opt.get(statics::FIELD_LABEL).and_then(RawValue::as_str);
            let value = opt.get(statics::FIELD_VALUE).and_then(OptionValue::from_raw);
            match (label, value) {
                (Some(label), Some(value)) => Ok(SelectOption {
                    label: label.to_string(),
                    value,
                }),
                _ => Err(SchemaError::new(
                    kind,
                    &opt_path,
                    opt,
                    "option needs a string `label` and a string or number `value`",
                )),
            }
        })
        .collect()
}

// Walks in `PanelConfig::property_ids` order so the error points at the
// second occurrence.
fn check_unique_ids(config: &PanelConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for (i, group) in config.groups.iter().enumerate() {
        check_group_ids(group, &format!("$.groups[{i}]"), &mut seen)?;
    }
    Ok(())
}

fn check_group_ids<'a>(
    group: &'a PropertyGroup,
    path: &str,
    seen: &mut HashSet<&'a str>,
) -> Result<()> {
    claim_id(seen, &group.id, path, || group.to_value())?;
    for (i, prop) in group.properties.iter().enumerate() {
        let prop_path = format!("{path}.properties[{i}]");
        claim_id(seen, &prop.id, &prop_path, || prop.to_value())?;
    }
    for (i, nested) in group.groups.iter().enumerate() {
        check_group_ids(nested, &format!("{path}.groups[{i}]"), seen)?;
    }
    Ok(())
}

fn claim_id<'a>(
    seen: &mut HashSet<&'a str>,
    id: &'a str,
    path: &str,
    node: impl FnOnce() -> RawValue,
) -> Result<()> {
    if seen.insert(id) {
        return Ok(());
    }
    Err(SchemaError::new(
        SchemaErrorKind::DuplicateId,
        path,
        &node(),
        format!("id `{id}` is used more than once"),
    ))
}

// Field helpers. Absent and `null` both mean "not provided".

fn present<'a>(obj: &'a IndexMap<String, RawValue>, field: &str) -> Option<&'a RawValue> {
    obj.get(field).filter(|v| !v.is_null())
}

fn required_str(
    obj: &IndexMap<String, RawValue>,
    field: &str,
    path: &str,
    raw: &RawValue,
    kind: SchemaErrorKind,
) -> Result<String> {
    match present(obj, field).and_then(RawValue::as_str) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(SchemaError::new(
            kind,
            path,
            raw,
            format!("`{field}` must be a non-empty string"),
        )),
    }
}

fn optional_str(
    obj: &IndexMap<String, RawValue>,
    field: &str,
    path: &str,
    raw: &RawValue,
    kind: SchemaErrorKind,
) -> Result<Option<String>> {
    match present(obj, field) {
        None => Ok(None),
        Some(RawValue::String(s)) => Ok(Some(s.clone())),
        Some(v) => Err(SchemaError::new(
            kind,
            path,
            raw,
            format!("`{field}` must be a string, found {}", v.type_name()),
        )),
    }
}

fn optional_bool(
    obj: &IndexMap<String, RawValue>,
    field: &str,
    path: &str,
    raw: &RawValue,
    kind: SchemaErrorKind,
) -> Result<Option<bool>> {
    match present(obj, field) {
        None => Ok(None),
        Some(RawValue::Bool(b)) => Ok(Some(*b)),
        Some(v) => Err(SchemaError::new(
            kind,
            path,
            raw,
            format!("`{field}` must be a boolean, found {}", v.type_name()),
        )),
    }
}

fn optional_number(
    obj: &IndexMap<String, RawValue>,
    field: &str,
    path: &str,
    raw: &RawValue,
    kind: SchemaErrorKind,
) -> Result<Option<Number>> {
    match present(obj, field) {
        None => Ok(None),
        Some(RawValue::Number(n)) if n.is_finite() => Ok(Some(*n)),
        Some(v) => Err(SchemaError::new(
            kind,
            path,
            raw,
            format!("`{field}` must be a finite number, found {}", v.type_name()),
        )),
    }
}

fn optional_array<'a>(
    obj: &'a IndexMap<String, RawValue>,
    field: &str,
    path: &str,
    raw: &RawValue,
    kind: SchemaErrorKind,
) -> Result<Option<&'a [RawValue]>> {
    match present(obj, field) {
        None => Ok(None),
        Some(RawValue::Array(items)) => Ok(Some(items)),
        Some(v) => Err(SchemaError::new(
            kind,
            path,
            raw,
            format!("`{field}` must be an array, found {}", v.type_name()),
        )),
    }
}

fn optional_width(
    obj: &IndexMap<String, RawValue>,
    field: &str,
    path: &str,
    raw: &RawValue,
) -> Result<Option<u32>> {
    match present(obj, field) {
        None => Ok(None),
        Some(v) => v
            .as_number()
            .and_then(|n| n.as_positive_u32())
            .map(Some)
            .ok_or_else(|| {
                SchemaError::new(
                    SchemaErrorKind::InvalidRoot,
                    path,
                    raw,
                    format!("`{field}` must be a positive integer"),
                )
            }),
    }
}
