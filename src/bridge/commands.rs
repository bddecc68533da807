//! The complete command surface exposed to the display surface.
//!
//! These four commands plus the `config-updated` event are all the webview
//! can reach. None of them reject: failures degrade to defaults or `null`.
//! They are synchronous so Tauri runs them on the event loop, in line with
//! tray clicks and hotkeys.

use serde_json::Value;
use tauri::State;

use crate::{
    bridge::app_info::AppInfo,
    settings::{ConfigPatch, HudConfig},
    AppState,
};

#[tauri::command]
pub fn get_config(state: State<'_, AppState>) -> HudConfig {
    state.coordinator.current()
}

#[tauri::command]
pub fn set_config(state: State<'_, AppState>, partial: ConfigPatch) {
    state.coordinator.update(partial);
}

#[tauri::command]
pub fn read_latest_report(state: State<'_, AppState>) -> Option<Value> {
    state.reports.read_latest()
}

#[tauri::command]
pub fn get_app_info(state: State<'_, AppState>) -> AppInfo {
    state.app_info.info()
}
