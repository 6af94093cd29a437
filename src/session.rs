use crate::model::PanelConfig;
use crate::statics;
use crate::storage::KeyValueStore;
use crate::store::{ConfigStore, LoadError};
use crate::value::RawValue;
use std::sync::Arc;
use tracing::{info, warn};

/// A panel editing session: the config store plus the durable entries that
/// let the last applied document and panel width survive a restart.
pub struct PanelSession<S: KeyValueStore> {
    store: ConfigStore,
    storage: S,
    width: u32,
}

impl<S: KeyValueStore> PanelSession<S> {
    pub fn new(storage: S) -> Self {
        Self {
            store: ConfigStore::new(),
            storage,
            width: statics::DEFAULT_PANEL_WIDTH,
        }
    }

    /// Reload the last applied document and width. Missing or corrupt
    /// entries fall back to defaults.
    pub fn restore(&mut self) {
        match self.storage.get(statics::KEY_PANEL_CONFIG) {
            Ok(Some(text)) => {
                if let Err(err) = self.store.load_str(&text) {
                    warn!(error = %err, "Ignoring stored panel document");
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "Could not read stored panel document"),
        }

        match self.storage.get(statics::KEY_PANEL_WIDTH) {
            Ok(Some(text)) => match text.trim().parse::<u32>() {
                Ok(width) => self.width = width,
                Err(_) => warn!(stored = %text, "Ignoring stored panel width"),
            },
            Ok(None) => {}
            Err(err) => warn!(error = %err, "Could not read stored panel width"),
        }
    }

    /// Parse, validate and install `text`. When `persist` is set the canonical
    /// form of the accepted document is stored.
    pub fn apply_json(&mut self, text: &str, persist: bool) -> Result<Arc<PanelConfig>, LoadError> {
        let config = self.store.load_str(text)?;
        if persist {
            self.persist(&config);
        }
        info!(panel = %config.id, persist, "Applied panel document");
        Ok(config)
    }

    /// Apply a view edit; the stored document follows when the tree changed.
    pub fn on_property_change(&mut self, id: &str, value: &RawValue) -> bool {
        if !self.store.update_property_value(id, value) {
            return false;
        }
        if let Some(config) = self.store.snapshot() {
            self.persist(&config);
        }
        true
    }

    /// Panel width clamped to the loaded panel's bounds.
    pub fn width(&self) -> u32 {
        match self.store.snapshot() {
            Some(config) => config.clamp_width(self.width),
            None => self.width,
        }
    }

    pub fn set_width(&mut self, width: u32) -> u32 {
        self.width = match self.store.snapshot() {
            Some(config) => config.clamp_width(width),
            None => width.clamp(statics::FALLBACK_MIN_WIDTH, statics::FALLBACK_MAX_WIDTH),
        };
        if let Err(err) = self
            .storage
            .set(statics::KEY_PANEL_WIDTH, &self.width.to_string())
        {
            warn!(error = %err, "Could not persist panel width");
        }
        self.width
    }

    /// Drop the panel and forget its stored document and width.
    pub fn close(&mut self) {
        self.store.reset();
        for key in [statics::KEY_PANEL_CONFIG, statics::KEY_PANEL_WIDTH] {
            if let Err(err) = self.storage.remove(key) {
                warn!(error = %err, key, "Could not clear stored entry");
            }
        }
        self.width = statics::DEFAULT_PANEL_WIDTH;
        info!("Closed panel");
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConfigStore {
        &mut self.store
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn persist(&mut self, config: &PanelConfig) {
        if let Err(err) = self
            .storage
            .set(statics::KEY_PANEL_CONFIG, &config.to_json_pretty())
        {
            warn!(error = %err, panel = %config.id, "Could not persist panel document");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PanelSession;
    use crate::statics;
    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::value::RawValue;

    const DOC: &str = r#"{ "id": "p", "title": "P", "minWidth": 300, "maxWidth": 500, "groups": [
        { "id": "g", "title": "G", "properties": [ { "id": "name", "label": "Name", "type": "text" } ] }
    ] }"#;

    #[test]
    fn apply_without_persist_leaves_storage_alone() {
        let mut session = PanelSession::new(MemoryStore::new());
        session.apply_json(DOC, false).unwrap();
        assert_eq!(session.storage().get(statics::KEY_PANEL_CONFIG).unwrap(), None);
    }

    #[test]
    fn width_is_clamped_to_panel_bounds() {
        let mut session = PanelSession::new(MemoryStore::new());
        assert_eq!(session.width(), statics::DEFAULT_PANEL_WIDTH);
        session.apply_json(DOC, true).unwrap();
        assert_eq!(session.width(), 384);
        assert_eq!(session.set_width(900), 500);
        assert_eq!(
            session.storage().get(statics::KEY_PANEL_WIDTH).unwrap().as_deref(),
            Some("500")
        );
    }

    #[test]
    fn property_change_updates_stored_document() {
        let mut session = PanelSession::new(MemoryStore::new());
        session.apply_json(DOC, true).unwrap();
        assert!(session.on_property_change("name", &RawValue::from("Ada")));
        let stored = session.storage().get(statics::KEY_PANEL_CONFIG).unwrap().unwrap();
        assert!(stored.contains("\"value\": \"Ada\""));
        assert!(!session.on_property_change("ghost", &RawValue::from("x")));
    }

    #[test]
    fn close_clears_everything() {
        let mut session = PanelSession::new(MemoryStore::new());
        session.apply_json(DOC, true).unwrap();
        session.set_width(450);
        session.close();
        assert!(session.store().snapshot().is_none());
        assert_eq!(session.width(), statics::DEFAULT_PANEL_WIDTH);
        assert_eq!(session.storage().get(statics::KEY_PANEL_CONFIG).unwrap(), None);
        assert_eq!(session.storage().get(statics::KEY_PANEL_WIDTH).unwrap(), None);
    }
}
