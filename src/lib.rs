//! Core library for schema-driven property panels.
//! Validates untrusted JSON panel documents into a typed tree, keeps that tree in
//! a subscribable store with structurally shared point-updates, and resolves the
//! user's theme preference against the OS appearance signal.

mod filter;
mod model;
mod schema;
mod session;
mod signal;
pub mod statics;
mod storage;
mod store;
mod theme;
mod value;

pub use filter::filter_groups;
pub use model::{
    Children, OptionValue, PanelConfig, PropertyGroup, PropertyItem, PropertyKind, PropertyType,
    SelectOption, UnknownPropertyType,
};
pub use schema::{SchemaError, SchemaErrorKind, validate};
pub use session::PanelSession;
pub use signal::{Publisher, SubscriptionId};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{ConfigStore, LoadError, Snapshot, update_property_value};
pub use theme::{
    AppearanceChange, AppearanceProbe, AppliedTheme, RenderContext, ThemePreference,
    ThemeResolver, UnknownTheme,
};
pub use value::{Number, RawValue};
