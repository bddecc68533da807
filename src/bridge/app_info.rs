use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use log::debug;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub core_tool_version: Option<String>,
    pub ui_version: Option<String>,
}

/// Looks up version strings from the measurement tool's and the display
/// surface's manifests. Each lookup fails independently to `None`.
pub struct AppInfoSource {
    core_manifest: PathBuf,
    ui_manifest: PathBuf,
}

impl AppInfoSource {
    pub fn new(core_manifest: PathBuf, ui_manifest: PathBuf) -> Self {
        Self {
            core_manifest,
            ui_manifest,
        }
    }

    pub fn info(&self) -> AppInfo {
        AppInfo {
            core_tool_version: resolved("core tool", self.core_tool_version()),
            ui_version: resolved("ui", self.ui_version()),
        }
    }

    /// First `version = "..."` in `pyproject.toml`.
    fn core_tool_version(&self) -> Result<String> {
        let contents = fs::read_to_string(&self.core_manifest)
            .with_context(|| format!("Failed to read {}", self.core_manifest.display()))?;
        let pattern = Regex::new(r#"version\s*=\s*"([^"]+)""#)?;
        pattern
            .captures(&contents)
            .and_then(|captures| captures.get(1))
            .map(|version| version.as_str().to_string())
            .ok_or_else(|| anyhow!("No version in {}", self.core_manifest.display()))
    }

    /// `version` field of `package.json`.
    fn ui_version(&self) -> Result<String> {
        let contents = fs::read_to_string(&self.ui_manifest)
            .with_context(|| format!("Failed to read {}", self.ui_manifest.display()))?;
        let manifest: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid JSON in {}", self.ui_manifest.display()))?;
        manifest
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("No version in {}", self.ui_manifest.display()))
    }
}

fn resolved(what: &str, result: Result<String>) -> Option<String> {
    match result {
        Ok(version) => Some(version),
        Err(err) => {
            debug!("No {what} version: {err:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(dir: &TempDir) -> AppInfoSource {
        AppInfoSource::new(
            dir.path().join("pyproject.toml"),
            dir.path().join("package.json"),
        )
    }

    #[test]
    fn both_versions_resolve() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("pyproject.toml"),
            "[project]\nname = \"stress_control\"\nversion = \"0.4.2\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "hud", "version": "1.3.0"}"#,
        )
        .unwrap();

        assert_eq!(
            source(&dir).info(),
            AppInfo {
                core_tool_version: Some("0.4.2".into()),
                ui_version: Some("1.3.0".into()),
            }
        );
    }

    #[test]
    fn failures_are_independent() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{ broken").unwrap();
        fs::write(dir.path().join("pyproject.toml"), "version=\"2.0\"").unwrap();

        let info = source(&dir).info();
        assert_eq!(info.core_tool_version.as_deref(), Some("2.0"));
        assert_eq!(info.ui_version, None);
    }

    #[test]
    fn missing_manifests_give_nulls() {
        let dir = TempDir::new().unwrap();
        let info = source(&dir).info();
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            serde_json::json!({"coreToolVersion": null, "uiVersion": null})
        );
    }

    #[test]
    fn non_string_ui_version_is_null() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"version": 3}"#).unwrap();
        assert_eq!(source(&dir).info().ui_version, None);
    }
}
