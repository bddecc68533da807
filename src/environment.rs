//! Process environment, read once at startup.
//!
//! Nothing else in the crate calls `std::env::var`; components receive the
//! values they need from [`HudEnvironment`].

use std::path::{Path, PathBuf};

use tauri::Url;

use crate::overlay::DebugWindowProfile;

pub const APP_ROOT_VAR: &str = "HUD_APP_ROOT";
pub const DEV_SERVER_URL_VAR: &str = "HUD_DEV_SERVER_URL";
pub const REPORT_PATH_VAR: &str = "STRESS_REPORT_PATH";

#[derive(Debug, Clone)]
pub struct HudEnvironment {
    pub app_root: PathBuf,
    pub is_dev: bool,
    pub dev_server_url: Option<Url>,
    pub report_override: Option<PathBuf>,
    pub profile: DebugWindowProfile,
}

impl HudEnvironment {
    pub fn from_env() -> Self {
        let app_root = std::env::var_os(APP_ROOT_VAR)
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        Self::resolve(app_root, cfg!(debug_assertions), |key| std::env::var(key).ok())
    }

    pub fn resolve<F>(app_root: PathBuf, debug_build: bool, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_dev_url = lookup(DEV_SERVER_URL_VAR).filter(|url| !url.trim().is_empty());
        let dev_server_url = raw_dev_url.as_deref().and_then(|raw| match Url::parse(raw.trim()) {
            Ok(url) => Some(url),
            Err(err) => {
                log::warn!("Ignoring {DEV_SERVER_URL_VAR}={raw}: {err}");
                None
            }
        });
        let is_dev = debug_build || raw_dev_url.is_some();

        let report_override = lookup(REPORT_PATH_VAR)
            .filter(|path| !path.trim().is_empty())
            .map(|path| absolutize(&app_root, Path::new(path.trim())));

        let profile = DebugWindowProfile::resolve(is_dev, &lookup);

        Self {
            app_root,
            is_dev,
            dev_server_url,
            report_override,
            profile,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.app_root.join("config.json")
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_override
            .clone()
            .unwrap_or_else(|| self.app_root.join("..").join("reports").join("latest.json"))
    }

    /// Directory holding the built display surface.
    pub fn bundle_dir(&self) -> PathBuf {
        self.app_root.join("dist").join("renderer")
    }

    pub fn bundle_index(&self) -> PathBuf {
        self.bundle_dir().join("index.html")
    }

    pub fn core_manifest_path(&self) -> PathBuf {
        self.app_root.join("..").join("pyproject.toml")
    }

    pub fn ui_manifest_path(&self) -> PathBuf {
        self.app_root.join("package.json")
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| base.join(path))
    }
}
