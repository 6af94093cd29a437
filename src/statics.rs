// Central place for storage keys, document field names and other constants.
// Keep these out of schema.rs/model.rs so the reader and writer stay in sync.

// Durable key-value entries.
pub const KEY_THEME: &str = "theme";
pub const KEY_PANEL_CONFIG: &str = "sidebarConfigJson";
pub const KEY_PANEL_WIDTH: &str = "sidebarWidth";

// Render-context attribute carrying the applied theme.
pub const THEME_ATTRIBUTE: &str = "data-theme";

// Panel width bounds (pixels) used when the document does not set its own.
pub const DEFAULT_PANEL_WIDTH: u32 = 384;
pub const FALLBACK_MIN_WIDTH: u32 = 100;
pub const FALLBACK_MAX_WIDTH: u32 = 800;

// File-backed storage location under the platform config dir.
pub const STORAGE_DIR_NAME: &str = "propsheet";
pub const STORAGE_FILE_NAME: &str = "storage.json";

// Longest offending fragment quoted in a schema error.
pub const ERROR_FRAGMENT_MAX_CHARS: usize = 200;

// Normalized defaults for property values.
pub const DEFAULT_COLOR: &str = "#000000";

// Document field names (camelCase, as they appear in panel JSON).
pub const FIELD_ID: &str = "id";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_ICON: &str = "icon";
pub const FIELD_MIN_WIDTH: &str = "minWidth";
pub const FIELD_MAX_WIDTH: &str = "maxWidth";
pub const FIELD_GROUPS: &str = "groups";
pub const FIELD_PROPERTIES: &str = "properties";
pub const FIELD_EXPANDED: &str = "expanded";
pub const FIELD_READONLY: &str = "readonly";
pub const FIELD_ACCORDION: &str = "accordion";
pub const FIELD_EDIT: &str = "edit";
pub const FIELD_LABEL: &str = "label";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_VALUE: &str = "value";
pub const FIELD_DISABLED: &str = "disabled";
pub const FIELD_PLACEHOLDER: &str = "placeholder";
pub const FIELD_MIN: &str = "min";
pub const FIELD_MAX: &str = "max";
pub const FIELD_STEP: &str = "step";
pub const FIELD_SHOW_BUTTONS: &str = "showButtons";
pub const FIELD_SHOW_INPUT: &str = "showInput";
pub const FIELD_OPTIONS: &str = "options";

// Theme picker labels (EN_ prefix to make future localization easier).
pub const EN_THEME_SYSTEM: &str = "System";
pub const EN_THEME_LIGHT: &str = "Light";
pub const EN_THEME_DARK: &str = "Dark";
pub const EN_THEME_MIDNIGHT: &str = "Midnight";
pub const EN_THEME_DARK_GOLD: &str = "Dark Gold";

// Theme picker icon names from the sprite sheet.
pub const ICON_THEME_SYSTEM: &str = "theme-system";
pub const ICON_THEME_LIGHT: &str = "theme-light";
pub const ICON_THEME_DARK: &str = "theme-dark";
