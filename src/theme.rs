//! Theme preference resolution.
//!
//! The durable *preference* may be `system`; the *applied* theme never is.
//! The OS appearance signal only matters while the stored preference is
//! `system`, and that check reads storage rather than in-memory state.

use crate::signal::{Publisher, SubscriptionId};
use crate::statics;
use crate::storage::KeyValueStore;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThemePreference {
    System,
    #[default]
    Light,
    Dark,
    Midnight,
    DarkGold,
}

impl ThemePreference {
    /// Picker order.
    pub const ALL: [ThemePreference; 5] = [
        ThemePreference::System,
        ThemePreference::Light,
        ThemePreference::Dark,
        ThemePreference::Midnight,
        ThemePreference::DarkGold,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemePreference::System => "system",
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
            ThemePreference::Midnight => "midnight",
            ThemePreference::DarkGold => "dark-gold",
        }
    }

    pub fn display_text(self) -> &'static str {
        match self {
            ThemePreference::System => statics::EN_THEME_SYSTEM,
            ThemePreference::Light => statics::EN_THEME_LIGHT,
            ThemePreference::Dark => statics::EN_THEME_DARK,
            ThemePreference::Midnight => statics::EN_THEME_MIDNIGHT,
            ThemePreference::DarkGold => statics::EN_THEME_DARK_GOLD,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            ThemePreference::System => statics::ICON_THEME_SYSTEM,
            ThemePreference::Light => statics::ICON_THEME_LIGHT,
            ThemePreference::Dark | ThemePreference::Midnight | ThemePreference::DarkGold => {
                statics::ICON_THEME_DARK
            }
        }
    }

    /// The applied theme for this preference, consulting the OS only for `system`.
    pub fn resolve(self, os_prefers_dark: impl FnOnce() -> Option<bool>) -> AppliedTheme {
        match self {
            ThemePreference::System => match os_prefers_dark() {
                Some(true) => AppliedTheme::Dark,
                Some(false) | None => AppliedTheme::Light,
            },
            ThemePreference::Light => AppliedTheme::Light,
            ThemePreference::Dark => AppliedTheme::Dark,
            ThemePreference::Midnight => AppliedTheme::Midnight,
            ThemePreference::DarkGold => AppliedTheme::DarkGold,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown theme `{0}`")]
pub struct UnknownTheme(pub String);

impl FromStr for ThemePreference {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}

/// A concretely rendered theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppliedTheme {
    Light,
    Dark,
    Midnight,
    DarkGold,
}

impl AppliedTheme {
    pub fn as_str(self) -> &'static str {
        match self {
            AppliedTheme::Light => "light",
            AppliedTheme::Dark => "dark",
            AppliedTheme::Midnight => "midnight",
            AppliedTheme::DarkGold => "dark-gold",
        }
    }
}

impl fmt::Display for AppliedTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppliedTheme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match ThemePreference::from_str(s)? {
            ThemePreference::System => Err(UnknownTheme(s.to_string())),
            pref => Ok(pref.resolve(|| None)),
        }
    }
}

/// Event delivered when the OS light/dark appearance flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppearanceChange {
    pub prefers_dark: bool,
}

/// The OS appearance capability. The resolver registers for change
/// notifications with `watch` and deregisters with `unwatch` on shutdown;
/// the host delivers them through [`ThemeResolver::on_os_appearance_change`].
pub trait AppearanceProbe {
    /// `None` when the platform exposes no appearance signal.
    fn prefers_dark(&self) -> Option<bool>;

    fn watch(&mut self) {}

    fn unwatch(&mut self) {}
}

/// Global rendering root carrying the [`statics::THEME_ATTRIBUTE`] attribute.
pub trait RenderContext {
    fn theme_attribute(&self) -> Option<String>;
    fn set_theme_attribute(&mut self, theme: AppliedTheme);
    fn remove_theme_attribute(&mut self);
}

pub struct ThemeResolver<S, P, R>
where
    S: KeyValueStore,
    P: AppearanceProbe,
    R: RenderContext,
{
    storage: S,
    probe: P,
    render: R,
    applied: Publisher<AppliedTheme>,
    watching: bool,
}

impl<S, P, R> ThemeResolver<S, P, R>
where
    S: KeyValueStore,
    P: AppearanceProbe,
    R: RenderContext,
{
    /// Entry transition: resolve the stored preference, commit it to the
    /// render context, and start watching the OS signal.
    pub fn initialize(storage: S, mut probe: P, mut render: R) -> Self {
        let preference = read_preference(&storage);
        let applied = preference.resolve(|| probe.prefers_dark());

        // Whatever was there before (static markup, a previous run) is stale.
        if render.theme_attribute().is_some() {
            render.remove_theme_attribute();
        }
        render.set_theme_attribute(applied);

        probe.watch();
        info!(
            preference = %preference,
            applied = %applied,
            attribute = statics::THEME_ATTRIBUTE,
            "Theme initialized"
        );
        Self {
            storage,
            probe,
            render,
            applied: Publisher::new(applied),
            watching: true,
        }
    }

    pub fn applied(&self) -> AppliedTheme {
        *self.applied.latest()
    }

    /// The durable preference, re-read from storage.
    pub fn stored_preference(&self) -> ThemePreference {
        read_preference(&self.storage)
    }

    pub fn set_theme(&mut self, preference: ThemePreference, persist: bool) {
        if persist {
            if let Err(err) = self.storage.set(statics::KEY_THEME, preference.as_str()) {
                warn!(error = %err, preference = %preference, "Could not persist theme preference");
            }
        }

        let probe = &self.probe;
        let next = preference.resolve(|| probe.prefers_dark());
        if next != self.applied() {
            self.render.remove_theme_attribute();
            self.render.set_theme_attribute(next);
            self.applied.publish(next);
        } else if self.render.theme_attribute().as_deref() != Some(next.as_str()) {
            // Attribute drifted from outside; put it back without republishing.
            self.render.remove_theme_attribute();
            self.render.set_theme_attribute(next);
        }
        info!(preference = %preference, applied = %next, "Theme set");
    }

    pub fn on_os_appearance_change(&mut self, event: AppearanceChange) {
        if !self.watching {
            return;
        }
        if self.stored_preference() != ThemePreference::System {
            debug!(prefers_dark = event.prefers_dark, "Ignoring OS appearance change");
            return;
        }
        debug!(prefers_dark = event.prefers_dark, "OS appearance changed, re-resolving");
        self.set_theme(ThemePreference::System, false);
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&AppliedTheme) + 'static) -> SubscriptionId {
        self.applied.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.applied.unsubscribe(id)
    }

    pub fn render_context(&self) -> &R {
        &self.render
    }

    pub fn render_context_mut(&mut self) -> &mut R {
        &mut self.render
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Stop listening to the OS signal. Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.watching {
            self.probe.unwatch();
            self.watching = false;
        }
    }
}

impl<S, P, R> Drop for ThemeResolver<S, P, R>
where
    S: KeyValueStore,
    P: AppearanceProbe,
    R: RenderContext,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn read_preference(storage: &impl KeyValueStore) -> ThemePreference {
    match storage.get(statics::KEY_THEME) {
        Ok(Some(stored)) => stored.parse().unwrap_or_else(|err: UnknownTheme| {
            warn!(error = %err, "Ignoring stored theme preference");
            ThemePreference::default()
        }),
        Ok(None) => ThemePreference::default(),
        Err(err) => {
            warn!(error = %err, "Theme storage unavailable, using default");
            ThemePreference::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppliedTheme, ThemePreference};

    #[test]
    fn preference_names_round_trip() {
        for pref in ThemePreference::ALL {
            assert_eq!(pref.as_str().parse::<ThemePreference>(), Ok(pref));
        }
        assert!("sepia".parse::<ThemePreference>().is_err());
    }

    #[test]
    fn system_is_never_applied() {
        assert!("system".parse::<AppliedTheme>().is_err());
        assert_eq!("dark-gold".parse::<AppliedTheme>(), Ok(AppliedTheme::DarkGold));
    }

    #[test]
    fn resolve_consults_os_only_for_system() {
        assert_eq!(
            ThemePreference::System.resolve(|| Some(true)),
            AppliedTheme::Dark
        );
        assert_eq!(ThemePreference::System.resolve(|| None), AppliedTheme::Light);
        assert_eq!(
            ThemePreference::Midnight.resolve(|| panic!("probe queried")),
            AppliedTheme::Midnight
        );
    }

    #[test]
    fn catalogue_has_labels_and_icons() {
        assert_eq!(ThemePreference::DarkGold.display_text(), "Dark Gold");
        assert_eq!(ThemePreference::Midnight.icon(), "theme-dark");
        assert_eq!(ThemePreference::default(), ThemePreference::Light);
    }
}
