fn main() {
    // Only these commands are reachable from the display surface.
    tauri_build::try_build(tauri_build::Attributes::new().app_manifest(
        tauri_build::AppManifest::new().commands(&[
            "get_config",
            "set_config",
            "read_latest_report",
            "get_app_info",
        ]),
    ))
    .expect("failed to run tauri-build");
}
