use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use propsheet::{
    AppearanceChange, AppearanceProbe, AppliedTheme, KeyValueStore, MemoryStore, RenderContext,
    ThemePreference, ThemeResolver, statics,
};

/// OS appearance the test can flip, plus a record of watch registration.
#[derive(Clone, Default)]
struct FakeOs {
    dark: Rc<Cell<Option<bool>>>,
    watching: Rc<Cell<bool>>,
}

impl FakeOs {
    fn with(dark: Option<bool>) -> Self {
        let os = Self::default();
        os.dark.set(dark);
        os
    }

    fn switch(&self, dark: bool) -> AppearanceChange {
        self.dark.set(Some(dark));
        AppearanceChange { prefers_dark: dark }
    }
}

impl AppearanceProbe for FakeOs {
    fn prefers_dark(&self) -> Option<bool> {
        self.dark.get()
    }

    fn watch(&mut self) {
        self.watching.set(true);
    }

    fn unwatch(&mut self) {
        self.watching.set(false);
    }
}

#[derive(Default)]
struct FakeRoot {
    attribute: Option<String>,
    writes: usize,
}

impl RenderContext for FakeRoot {
    fn theme_attribute(&self) -> Option<String> {
        self.attribute.clone()
    }

    fn set_theme_attribute(&mut self, theme: AppliedTheme) {
        self.attribute = Some(theme.as_str().to_string());
        self.writes += 1;
    }

    fn remove_theme_attribute(&mut self) {
        self.attribute = None;
    }
}

/// Storage that is never available, like a sandboxed browser profile.
struct BrokenStorage;

impl KeyValueStore for BrokenStorage {
    fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        anyhow::bail!("storage disabled")
    }

    fn set(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
        anyhow::bail!("storage disabled")
    }

    fn remove(&mut self, _key: &str) -> anyhow::Result<()> {
        anyhow::bail!("storage disabled")
    }
}

fn stored(theme: &str) -> MemoryStore {
    let mut storage = MemoryStore::new();
    storage.set(statics::KEY_THEME, theme).unwrap();
    storage
}

fn recorder<S: KeyValueStore>(
    resolver: &mut ThemeResolver<S, FakeOs, FakeRoot>,
) -> Rc<RefCell<Vec<AppliedTheme>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    resolver.subscribe(move |theme| sink.borrow_mut().push(*theme));
    seen
}

#[test]
fn initialize_defaults_to_light() {
    let resolver = ThemeResolver::initialize(
        MemoryStore::new(),
        FakeOs::with(Some(true)),
        FakeRoot::default(),
    );
    assert_eq!(resolver.applied(), AppliedTheme::Light);
    assert_eq!(resolver.render_context().attribute.as_deref(), Some("light"));
}

#[test]
fn initialize_with_broken_storage_falls_back_to_light() {
    let resolver = ThemeResolver::initialize(
        BrokenStorage,
        FakeOs::with(Some(true)),
        FakeRoot::default(),
    );
    assert_eq!(resolver.applied(), AppliedTheme::Light);
}

#[test]
fn initialize_resolves_system_from_os_and_replaces_stale_attribute() {
    let root = FakeRoot {
        attribute: Some("midnight".to_string()),
        writes: 0,
    };
    let resolver = ThemeResolver::initialize(stored("system"), FakeOs::with(Some(true)), root);
    assert_eq!(resolver.applied(), AppliedTheme::Dark);
    assert_eq!(resolver.render_context().attribute.as_deref(), Some("dark"));
    assert!(resolver.probe().watching.get());
}

#[test]
fn system_without_os_signal_is_light() {
    let resolver = ThemeResolver::initialize(
        stored("system"),
        FakeOs::with(None),
        FakeRoot::default(),
    );
    assert_eq!(resolver.applied(), AppliedTheme::Light);
}

#[test]
fn unknown_stored_value_is_light() {
    let resolver = ThemeResolver::initialize(
        stored("solarized"),
        FakeOs::default(),
        FakeRoot::default(),
    );
    assert_eq!(resolver.applied(), AppliedTheme::Light);
}

#[test]
fn system_preference_follows_os_changes() {
    let os = FakeOs::with(Some(false));
    let mut resolver = ThemeResolver::initialize(
        MemoryStore::new(),
        os.clone(),
        FakeRoot::default(),
    );
    let seen = recorder(&mut resolver);

    resolver.set_theme(ThemePreference::System, true);
    assert_eq!(resolver.applied(), AppliedTheme::Light);

    resolver.on_os_appearance_change(os.switch(true));
    assert_eq!(resolver.applied(), AppliedTheme::Dark);
    assert_eq!(resolver.render_context().attribute.as_deref(), Some("dark"));
    assert_eq!(resolver.stored_preference(), ThemePreference::System);
    assert_eq!(*seen.borrow(), vec![AppliedTheme::Light, AppliedTheme::Dark]);
}

#[test]
fn explicit_preference_ignores_os_changes() {
    let os = FakeOs::with(Some(false));
    let mut resolver = ThemeResolver::initialize(
        MemoryStore::new(),
        os.clone(),
        FakeRoot::default(),
    );

    resolver.set_theme(ThemePreference::System, true);
    resolver.on_os_appearance_change(os.switch(true));
    assert_eq!(resolver.applied(), AppliedTheme::Dark);

    resolver.set_theme(ThemePreference::Light, true);
    resolver.on_os_appearance_change(os.switch(false));
    resolver.on_os_appearance_change(os.switch(true));
    assert_eq!(resolver.applied(), AppliedTheme::Light);
    assert_eq!(resolver.stored_preference(), ThemePreference::Light);
}

#[test]
fn os_gate_reads_storage_not_memory() {
    let os = FakeOs::with(Some(false));
    let mut resolver = ThemeResolver::initialize(
        MemoryStore::new(),
        os.clone(),
        FakeRoot::default(),
    );

    // Applied in memory only; the durable preference stays `light`.
    resolver.set_theme(ThemePreference::System, false);
    resolver.on_os_appearance_change(os.switch(true));
    assert_eq!(resolver.applied(), AppliedTheme::Light);
}

#[test]
fn same_theme_is_not_republished_but_attribute_is_repaired() {
    let mut resolver = ThemeResolver::initialize(
        stored("dark-gold"),
        FakeOs::default(),
        FakeRoot::default(),
    );
    let seen = recorder(&mut resolver);

    resolver.render_context_mut().attribute = Some("light".to_string());
    resolver.set_theme(ThemePreference::DarkGold, true);

    assert_eq!(resolver.render_context().attribute.as_deref(), Some("dark-gold"));
    assert_eq!(*seen.borrow(), vec![AppliedTheme::DarkGold]);

    let writes = resolver.render_context().writes;
    resolver.set_theme(ThemePreference::DarkGold, true);
    assert_eq!(resolver.render_context().writes, writes);
}

#[test]
fn persist_flag_controls_storage_write() {
    let mut resolver = ThemeResolver::initialize(
        MemoryStore::new(),
        FakeOs::default(),
        FakeRoot::default(),
    );
    resolver.set_theme(ThemePreference::Midnight, false);
    assert_eq!(resolver.applied(), AppliedTheme::Midnight);
    assert_eq!(resolver.storage().get(statics::KEY_THEME).unwrap(), None);

    resolver.set_theme(ThemePreference::Midnight, true);
    assert_eq!(
        resolver.storage().get(statics::KEY_THEME).unwrap().as_deref(),
        Some("midnight")
    );
}

#[test]
fn shutdown_deregisters_and_silences_os_events() {
    let os = FakeOs::with(Some(false));
    let mut resolver = ThemeResolver::initialize(stored("system"), os.clone(), FakeRoot::default());
    assert!(os.watching.get());

    resolver.shutdown();
    assert!(!os.watching.get());
    resolver.on_os_appearance_change(os.switch(true));
    assert_eq!(resolver.applied(), AppliedTheme::Light);
}

#[test]
fn drop_deregisters() {
    let os = FakeOs::with(Some(false));
    {
        let _resolver = ThemeResolver::initialize(
            MemoryStore::new(),
            os.clone(),
            FakeRoot::default(),
        );
        assert!(os.watching.get());
    }
    assert!(!os.watching.get());
}
