//! Typed panel tree produced by [`crate::validate`].
//!
//! Every node is immutable once built. Child sequences are `Arc<[Arc<_>]>` so a
//! point-update can rebuild the path to one property and share everything else
//! with the previous tree version.

use crate::statics;
use crate::value::{Number, RawValue};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Ordered, shareable child sequence.
pub type Children<T> = Arc<[Arc<T>]>;

/// The closed vocabulary of property types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Text,
    Number,
    Color,
    Date,
    Select,
    Slider,
    Toggle,
    Readonly,
}

impl PropertyType {
    pub const ALL: [PropertyType; 8] = [
        PropertyType::Text,
        PropertyType::Number,
        PropertyType::Color,
        PropertyType::Date,
        PropertyType::Select,
        PropertyType::Slider,
        PropertyType::Toggle,
        PropertyType::Readonly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PropertyType::Text => "text",
            PropertyType::Number => "number",
            PropertyType::Color => "color",
            PropertyType::Date => "date",
            PropertyType::Select => "select",
            PropertyType::Slider => "slider",
            PropertyType::Toggle => "toggle",
            PropertyType::Readonly => "readonly",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown property type `{0}`")]
pub struct UnknownPropertyType(pub String);

impl FromStr for PropertyType {
    type Err = UnknownPropertyType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownPropertyType(s.to_string()))
    }
}

/// Value of a `select` property or one of its options.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Number(Number),
}

impl OptionValue {
    pub fn from_raw(raw: &RawValue) -> Option<Self> {
        match raw {
            RawValue::String(s) => Some(OptionValue::String(s.clone())),
            RawValue::Number(n) if n.is_finite() => Some(OptionValue::Number(*n)),
            _ => None,
        }
    }

    pub fn to_value(&self) -> RawValue {
        match self {
            OptionValue::String(s) => RawValue::String(s.clone()),
            OptionValue::Number(n) => RawValue::Number(*n),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub label: String,
    pub value: OptionValue,
}

/// Variant-specific payload of a property, including its value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    Text {
        value: String,
        placeholder: Option<String>,
    },
    Number {
        value: Number,
        min: Option<Number>,
        max: Option<Number>,
        step: Option<Number>,
        show_buttons: Option<bool>,
    },
    Color {
        value: String,
    },
    Date {
        value: String,
    },
    Select {
        value: OptionValue,
        options: Vec<SelectOption>,
    },
    Slider {
        value: Number,
        min: Number,
        max: Number,
        step: Number,
        show_input: bool,
    },
    Toggle {
        value: bool,
    },
    Readonly {
        value: String,
    },
}

impl PropertyKind {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyKind::Text { .. } => PropertyType::Text,
            PropertyKind::Number { .. } => PropertyType::Number,
            PropertyKind::Color { .. } => PropertyType::Color,
            PropertyKind::Date { .. } => PropertyType::Date,
            PropertyKind::Select { .. } => PropertyType::Select,
            PropertyKind::Slider { .. } => PropertyType::Slider,
            PropertyKind::Toggle { .. } => PropertyType::Toggle,
            PropertyKind::Readonly { .. } => PropertyType::Readonly,
        }
    }

    pub fn value(&self) -> RawValue {
        match self {
            PropertyKind::Text { value, .. }
            | PropertyKind::Color { value }
            | PropertyKind::Date { value }
            | PropertyKind::Readonly { value } => RawValue::String(value.clone()),
            PropertyKind::Number { value, .. } | PropertyKind::Slider { value, .. } => {
                RawValue::Number(*value)
            }
            PropertyKind::Select { value, .. } => value.to_value(),
            PropertyKind::Toggle { value } => RawValue::Bool(*value),
        }
    }

    /// Copy of this payload with `value` replaced, or `None` when the edit's
    /// JSON type cannot be held by this variant.
    pub fn with_value(&self, value: &RawValue) -> Option<PropertyKind> {
        let mut next = self.clone();
        match &mut next {
            PropertyKind::Text { value: slot, .. }
            | PropertyKind::Color { value: slot }
            | PropertyKind::Date { value: slot }
            | PropertyKind::Readonly { value: slot } => *slot = value.as_str()?.to_owned(),
            PropertyKind::Number { value: slot, .. } | PropertyKind::Slider { value: slot, .. } => {
                *slot = value.as_finite_number()?
            }
            PropertyKind::Select { value: slot, .. } => *slot = OptionValue::from_raw(value)?,
            PropertyKind::Toggle { value: slot } => *slot = value.as_bool()?,
        }
        Some(next)
    }
}

/// One editable field.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyItem {
    pub id: String,
    pub label: String,
    pub disabled: bool,
    pub readonly: bool,
    pub kind: PropertyKind,
}

impl PropertyItem {
    pub fn property_type(&self) -> PropertyType {
        self.kind.property_type()
    }

    pub fn value(&self) -> RawValue {
        self.kind.value()
    }

    /// A `readonly`-typed property is never editable, whatever its flags say.
    pub fn is_editable(&self) -> bool {
        !matches!(self.kind, PropertyKind::Readonly { .. }) && !self.readonly && !self.disabled
    }

    pub fn to_value(&self) -> RawValue {
        let mut map = IndexMap::new();
        map.insert(statics::FIELD_ID.to_string(), RawValue::from(self.id.as_str()));
        map.insert(
            statics::FIELD_LABEL.to_string(),
            RawValue::from(self.label.as_str()),
        );
        map.insert(
            statics::FIELD_TYPE.to_string(),
            RawValue::from(self.property_type().as_str()),
        );
        map.insert(statics::FIELD_VALUE.to_string(), self.value());
        map.insert(statics::FIELD_DISABLED.to_string(), RawValue::Bool(self.disabled));
        map.insert(statics::FIELD_READONLY.to_string(), RawValue::Bool(self.readonly));

        let mut put = |key: &str, value: Option<RawValue>| {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        };
        match &self.kind {
            PropertyKind::Text { placeholder, .. } => {
                put(
                    statics::FIELD_PLACEHOLDER,
                    placeholder.as_deref().map(RawValue::from),
                );
            }
            PropertyKind::Number {
                min,
                max,
                step,
                show_buttons,
                ..
            } => {
                put(statics::FIELD_MIN, min.map(RawValue::from));
                put(statics::FIELD_MAX, max.map(RawValue::from));
                put(statics::FIELD_STEP, step.map(RawValue::from));
                put(statics::FIELD_SHOW_BUTTONS, show_buttons.map(RawValue::from));
            }
            PropertyKind::Select { options, .. } => {
                let options = options
                    .iter()
                    .map(|opt| {
                        let mut o = IndexMap::new();
                        o.insert(
                            statics::FIELD_LABEL.to_string(),
                            RawValue::from(opt.label.as_str()),
                        );
                        o.insert(statics::FIELD_VALUE.to_string(), opt.value.to_value());
                        RawValue::Object(o)
                    })
                    .collect();
                put(statics::FIELD_OPTIONS, Some(RawValue::Array(options)));
            }
            PropertyKind::Slider {
                min,
                max,
                step,
                show_input,
                ..
            } => {
                put(statics::FIELD_MIN, Some(RawValue::from(*min)));
                put(statics::FIELD_MAX, Some(RawValue::from(*max)));
                put(statics::FIELD_STEP, Some(RawValue::from(*step)));
                put(statics::FIELD_SHOW_INPUT, Some(RawValue::from(*show_input)));
            }
            PropertyKind::Color { .. }
            | PropertyKind::Date { .. }
            | PropertyKind::Toggle { .. }
            | PropertyKind::Readonly { .. } => {}
        }
        RawValue::Object(map)
    }
}

/// A titled, optionally collapsible section holding properties and nested groups.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyGroup {
    pub id: String,
    pub title: String,
    pub expanded: bool,
    pub readonly: bool,
    pub accordion: bool,
    /// Only meaningful together with `readonly`.
    pub edit: Option<bool>,
    pub properties: Children<PropertyItem>,
    pub groups: Children<PropertyGroup>,
}

impl PropertyGroup {
    pub fn is_collapsible(&self) -> bool {
        self.accordion
    }

    /// Non-accordion groups are always open.
    pub fn is_expanded_effective(&self) -> bool {
        !self.accordion || self.expanded
    }

    pub fn can_edit(&self) -> bool {
        self.readonly && self.edit.unwrap_or(false)
    }

    pub fn find_property(&self, id: &str) -> Option<&Arc<PropertyItem>> {
        self.properties
            .iter()
            .find(|p| p.id == id)
            .or_else(|| self.groups.iter().find_map(|g| g.find_property(id)))
    }

    pub fn find_group(&self, id: &str) -> Option<&Arc<PropertyGroup>> {
        self.groups
            .iter()
            .find_map(|g| if g.id == id { Some(g) } else { g.find_group(id) })
    }

    fn visit_ids<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        f(&self.id);
        for prop in self.properties.iter() {
            f(&prop.id);
        }
        for group in self.groups.iter() {
            group.visit_ids(f);
        }
    }

    pub fn to_value(&self) -> RawValue {
        let mut map = IndexMap::new();
        map.insert(statics::FIELD_ID.to_string(), RawValue::from(self.id.as_str()));
        map.insert(
            statics::FIELD_TITLE.to_string(),
            RawValue::from(self.title.as_str()),
        );
        map.insert(statics::FIELD_EXPANDED.to_string(), RawValue::Bool(self.expanded));
        map.insert(statics::FIELD_READONLY.to_string(), RawValue::Bool(self.readonly));
        map.insert(statics::FIELD_ACCORDION.to_string(), RawValue::Bool(self.accordion));
        if let Some(edit) = self.edit {
            map.insert(statics::FIELD_EDIT.to_string(), RawValue::Bool(edit));
        }
        map.insert(
            statics::FIELD_PROPERTIES.to_string(),
            RawValue::Array(self.properties.iter().map(|p| p.to_value()).collect()),
        );
        if !self.groups.is_empty() {
            map.insert(
                statics::FIELD_GROUPS.to_string(),
                RawValue::Array(self.groups.iter().map(|g| g.to_value()).collect()),
            );
        }
        RawValue::Object(map)
    }
}

/// Root of a validated panel document. Every group and property id in the
/// tree is unique.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelConfig {
    pub id: String,
    pub title: String,
    pub icon: Option<String>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub groups: Children<PropertyGroup>,
}

impl PanelConfig {
    pub fn find_property(&self, id: &str) -> Option<&Arc<PropertyItem>> {
        self.groups.iter().find_map(|g| g.find_property(id))
    }

    pub fn find_group(&self, id: &str) -> Option<&Arc<PropertyGroup>> {
        self.groups
            .iter()
            .find_map(|g| if g.id == id { Some(g) } else { g.find_group(id) })
    }

    /// Every group and property id, depth-first: a group, then its
    /// properties, then its nested groups.
    pub fn property_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for group in self.groups.iter() {
            group.visit_ids(&mut |id| ids.push(id));
        }
        ids
    }

    /// Clamp a hosting view's width to this panel's bounds.
    pub fn clamp_width(&self, width: u32) -> u32 {
        let min = self.min_width.unwrap_or(statics::FALLBACK_MIN_WIDTH);
        let max = self
            .max_width
            .unwrap_or(statics::FALLBACK_MAX_WIDTH)
            .max(min);
        width.clamp(min, max)
    }

    /// Canonical JSON form; feeding it back through `validate` yields an equal tree.
    pub fn to_value(&self) -> RawValue {
        let mut map = IndexMap::new();
        map.insert(statics::FIELD_ID.to_string(), RawValue::from(self.id.as_str()));
        map.insert(
            statics::FIELD_TITLE.to_string(),
            RawValue::from(self.title.as_str()),
        );
        if let Some(icon) = &self.icon {
            map.insert(statics::FIELD_ICON.to_string(), RawValue::from(icon.as_str()));
        }
        if let Some(w) = self.min_width {
            map.insert(statics::FIELD_MIN_WIDTH.to_string(), RawValue::from(i64::from(w)));
        }
        if let Some(w) = self.max_width {
            map.insert(statics::FIELD_MAX_WIDTH.to_string(), RawValue::from(i64::from(w)));
        }
        map.insert(
            statics::FIELD_GROUPS.to_string(),
            RawValue::Array(self.groups.iter().map(|g| g.to_value()).collect()),
        );
        RawValue::Object(map)
    }

    pub fn to_json_pretty(&self) -> String {
        self.to_value().to_json_pretty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_type_parses_known_names_only() {
        assert_eq!("slider".parse::<PropertyType>(), Ok(PropertyType::Slider));
        assert_eq!(
            "spinner".parse::<PropertyType>(),
            Err(UnknownPropertyType("spinner".to_string()))
        );
    }

    #[test]
    fn with_value_rejects_non_finite_numbers() {
        let slider = PropertyKind::Slider {
            value: Number::I64(1),
            min: Number::I64(0),
            max: Number::I64(5),
            step: Number::I64(1),
            show_input: false,
        };
        assert_eq!(slider.with_value(&RawValue::from(f64::NAN)), None);
        assert_eq!(slider.with_value(&RawValue::from(f64::INFINITY)), None);
        assert_eq!(
            slider.with_value(&RawValue::from(2.5)).map(|k| k.value()),
            Some(RawValue::from(2.5))
        );
    }

    fn toggle(id: &str, value: bool) -> Arc<PropertyItem> {
        Arc::new(PropertyItem {
            id: id.to_string(),
            label: id.to_uppercase(),
            disabled: false,
            readonly: false,
            kind: PropertyKind::Toggle { value },
        })
    }

    fn group(
        id: &str,
        props: Vec<Arc<PropertyItem>>,
        groups: Vec<Arc<PropertyGroup>>,
    ) -> Arc<PropertyGroup> {
        Arc::new(PropertyGroup {
            id: id.to_string(),
            title: id.to_string(),
            expanded: true,
            readonly: false,
            accordion: true,
            edit: None,
            properties: props.into(),
            groups: groups.into(),
        })
    }

    fn panel() -> PanelConfig {
        let inner = group("inner", vec![toggle("deep", false)], vec![]);
        PanelConfig {
            id: "p".to_string(),
            title: "P".to_string(),
            icon: None,
            min_width: Some(200),
            max_width: None,
            groups: vec![
                group("g1", vec![toggle("a", true)], vec![inner]),
                group("g2", vec![toggle("b", false)], vec![]),
            ]
            .into(),
        }
    }

    #[test]
    fn property_type_names_round_trip() {
        for t in PropertyType::ALL {
            assert_eq!(PropertyType::from_name(t.as_str()), Some(t));
        }
        assert_eq!(PropertyType::from_name("checkbox"), None);
    }

    #[test]
    fn find_reaches_nested_groups() {
        let p = panel();
        assert_eq!(p.find_property("deep").unwrap().value(), RawValue::Bool(false));
        assert_eq!(p.find_group("inner").unwrap().title, "inner");
        assert!(p.find_property("nope").is_none());
    }

    #[test]
    fn ids_are_depth_first() {
        assert_eq!(panel().property_ids(), vec!["g1", "a", "inner", "deep", "g2", "b"]);
    }

    #[test]
    fn with_value_checks_json_type() {
        let text = PropertyKind::Text {
            value: "a".to_string(),
            placeholder: None,
        };
        assert_eq!(
            text.with_value(&RawValue::from("b")).unwrap().value(),
            RawValue::from("b")
        );
        assert!(text.with_value(&RawValue::Bool(true)).is_none());

        let select = PropertyKind::Select {
            value: OptionValue::String("x".to_string()),
            options: Vec::new(),
        };
        assert!(select.with_value(&RawValue::from(3_i64)).is_some());
        assert!(select.with_value(&RawValue::Null).is_none());
    }

    #[test]
    fn readonly_type_is_never_editable() {
        let mut item = PropertyItem {
            id: "r".to_string(),
            label: "R".to_string(),
            disabled: false,
            readonly: false,
            kind: PropertyKind::Readonly {
                value: String::new(),
            },
        };
        assert!(!item.is_editable());

        item.kind = PropertyKind::Date {
            value: String::new(),
        };
        assert!(item.is_editable());
        item.disabled = true;
        assert!(!item.is_editable());
    }

    #[test]
    fn non_accordion_group_is_always_expanded() {
        let mut g = (*group("g", vec![], vec![])).clone();
        g.expanded = false;
        assert!(!g.is_expanded_effective());
        g.accordion = false;
        assert!(g.is_expanded_effective());
        assert!(!g.is_collapsible());
    }

    #[test]
    fn clamp_width_uses_fallback_bounds() {
        let p = panel();
        assert_eq!(p.clamp_width(50), 200);
        assert_eq!(p.clamp_width(384), 384);
        assert_eq!(p.clamp_width(5000), statics::FALLBACK_MAX_WIDTH);
    }
}
