use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// User preferences for the overlay. Every field is always populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HudConfig {
    pub show_dynamic: bool,
    pub show_static: bool,
    pub click_through: bool,
}

impl Default for HudConfig {
    fn default() -> Self {
        Self {
            show_dynamic: true,
            show_static: true,
            click_through: true,
        }
    }
}

impl HudConfig {
    pub fn merged(mut self, patch: &ConfigPatch) -> Self {
        if let Some(value) = patch.show_dynamic {
            self.show_dynamic = value;
        }
        if let Some(value) = patch.show_static {
            self.show_static = value;
        }
        if let Some(value) = patch.click_through {
            self.click_through = value;
        }
        self
    }

    /// Fills each field from `object` when it holds a boolean, otherwise from
    /// the defaults.
    fn from_object(object: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        let field = |key: &str, fallback: bool| {
            object.get(key).and_then(Value::as_bool).unwrap_or(fallback)
        };

        Self {
            show_dynamic: field("showDynamic", defaults.show_dynamic),
            show_static: field("showStatic", defaults.show_static),
            click_through: field("clickThrough", defaults.click_through),
        }
    }
}

/// Partial update sent by the tray, a hotkey or the display surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_dynamic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_static: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_through: Option<bool>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.show_dynamic.is_none() && self.show_static.is_none() && self.click_through.is_none()
    }
}

/// One of the three boolean preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    ShowDynamic,
    ShowStatic,
    ClickThrough,
}

impl ConfigField {
    pub const ALL: [ConfigField; 3] = [
        ConfigField::ShowDynamic,
        ConfigField::ShowStatic,
        ConfigField::ClickThrough,
    ];

    /// Stable identifier, identical to the serialized field name.
    pub fn key(self) -> &'static str {
        match self {
            ConfigField::ShowDynamic => "showDynamic",
            ConfigField::ShowStatic => "showStatic",
            ConfigField::ClickThrough => "clickThrough",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    pub fn get(self, config: &HudConfig) -> bool {
        match self {
            ConfigField::ShowDynamic => config.show_dynamic,
            ConfigField::ShowStatic => config.show_static,
            ConfigField::ClickThrough => config.click_through,
        }
    }

    pub fn patch(self, value: bool) -> ConfigPatch {
        let mut patch = ConfigPatch::default();
        match self {
            ConfigField::ShowDynamic => patch.show_dynamic = Some(value),
            ConfigField::ShowStatic => patch.show_static = Some(value),
            ConfigField::ClickThrough => patch.click_through = Some(value),
        }
        patch
    }
}

/// How a load resolved. Callers outside the store only see the record.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(HudConfig),
    /// The file was absent; defaults were written out.
    UsedDefault(HudConfig),
    /// The file was unreadable or corrupt; defaults were written over it.
    Failed {
        config: HudConfig,
        reason: anyhow::Error,
    },
}

impl LoadOutcome {
    pub fn config(&self) -> HudConfig {
        match self {
            LoadOutcome::Loaded(config) | LoadOutcome::UsedDefault(config) => *config,
            LoadOutcome::Failed { config, .. } => *config,
        }
    }
}

/// Durable store for [`HudConfig`]. Holds no cached copy: the file on disk is
/// authoritative and every load goes back to it.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn load(&self) -> HudConfig {
        match self.load_detailed() {
            LoadOutcome::Failed { config, reason } => {
                warn!(
                    "Resetting unreadable settings at {}: {reason:#}",
                    self.path.display()
                );
                config
            }
            outcome => outcome.config(),
        }
    }

    pub fn load_detailed(&self) -> LoadOutcome {
        match self.read() {
            Ok(config) => LoadOutcome::Loaded(config),
            Err(err) => {
                let config = HudConfig::default();
                self.save(&config);

                let missing = err
                    .downcast_ref::<io::Error>()
                    .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound);
                if missing {
                    LoadOutcome::UsedDefault(config)
                } else {
                    LoadOutcome::Failed {
                        config,
                        reason: err,
                    }
                }
            }
        }
    }

    /// Best effort; a failed write leaves the previous file in place.
    pub fn save(&self, config: &HudConfig) {
        if let Err(err) = self.persist(config) {
            warn!("{err:#}");
        }
    }

    fn read(&self) -> Result<HudConfig> {
        let contents = fs::read_to_string(&self.path)?;
        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid JSON in {}", self.path.display()))?;
        let object = value
            .as_object()
            .ok_or_else(|| anyhow!("Settings in {} are not a JSON object", self.path.display()))?;
        Ok(HudConfig::from_object(object))
    }

    /// Writes a sibling temp file and renames it over the record, so a
    /// concurrent reader sees either the old file or the new one.
    fn persist(&self, config: &HudConfig) -> Result<()> {
        let serialized = serde_json::to_string_pretty(config)?;
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to stage settings in {}", dir.display()))?;
        tmp.write_all(serialized.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("config.json"))
    }

    fn default_file_contents() -> String {
        serde_json::to_string_pretty(&HudConfig::default()).unwrap()
    }

    #[test]
    fn absent_file_yields_defaults_and_creates_it() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let outcome = store.load_detailed();
        assert!(matches!(outcome, LoadOutcome::UsedDefault(_)));
        assert_eq!(
            outcome.config(),
            HudConfig {
                show_dynamic: true,
                show_static: true,
                click_through: true,
            }
        );

        let written = fs::read_to_string(store.path()).unwrap();
        assert_eq!(written, default_file_contents());
    }

    #[test]
    fn written_file_is_two_space_pretty_json() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.load();

        let written = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            written,
            "{\n  \"showDynamic\": true,\n  \"showStatic\": true,\n  \"clickThrough\": true\n}"
        );
    }

    #[test]
    fn corrupt_files_reset_to_defaults() {
        for garbage in ["", "{not json", "[1, 2, 3]", "42", "null"] {
            let dir = TempDir::new().unwrap();
            let store = store_in(&dir);
            fs::write(store.path(), garbage).unwrap();

            let outcome = store.load_detailed();
            assert!(
                matches!(outcome, LoadOutcome::Failed { .. }),
                "expected failure for {garbage:?}"
            );
            assert_eq!(outcome.config(), HudConfig::default());
            assert_eq!(fs::read_to_string(store.path()).unwrap(), default_file_contents());
        }
    }

    #[test]
    fn parsed_fields_win_over_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"showStatic": false}"#).unwrap();

        assert_eq!(
            store.load(),
            HudConfig {
                show_dynamic: true,
                show_static: false,
                click_through: true,
            }
        );
    }

    #[test]
    fn malformed_and_unknown_fields_fall_back_per_field() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"{"showDynamic": "no", "clickThrough": false, "opacity": 0.4}"#,
        )
        .unwrap();

        assert_eq!(
            store.load(),
            HudConfig {
                show_dynamic: true,
                show_static: true,
                click_through: false,
            }
        );
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let config = HudConfig {
            show_dynamic: false,
            show_static: true,
            click_through: false,
        };

        store.save(&config);
        assert!(matches!(store.load_detailed(), LoadOutcome::Loaded(c) if c == config));
    }

    #[test]
    fn save_replaces_the_file_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&HudConfig::default());
        store.save(&HudConfig::default().merged(&ConfigField::ShowStatic.patch(false)));

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(!store.load().show_static);
    }

    #[test]
    fn save_into_missing_directory_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("nope").join("config.json"));

        store.save(&HudConfig::default());
        assert_eq!(store.load(), HudConfig::default());
    }

    #[test]
    fn merge_only_touches_patched_fields() {
        let base = HudConfig::default();
        let merged = base.merged(&ConfigField::ClickThrough.patch(false));
        assert_eq!(
            merged,
            HudConfig {
                click_through: false,
                ..base
            }
        );
        assert_eq!(base.merged(&ConfigPatch::default()), base);
    }

    #[test]
    fn patch_deserializes_from_partial_camel_case() {
        let patch: ConfigPatch = serde_json::from_str(r#"{"showStatic": false}"#).unwrap();
        assert_eq!(patch, ConfigField::ShowStatic.patch(false));
        assert!(!patch.is_empty());
    }

    #[test]
    fn field_keys_round_trip() {
        for field in ConfigField::ALL {
            assert_eq!(ConfigField::from_key(field.key()), Some(field));
        }
        assert_eq!(ConfigField::from_key("quit"), None);
    }
}
