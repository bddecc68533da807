mod bridge;
mod coordinator;
mod environment;
mod overlay;
mod report;
mod settings;
mod tray;
mod utils;

use std::sync::Arc;

use bridge::{
    commands::{get_app_info, get_config, read_latest_report, set_config},
    AppInfoSource,
};
use coordinator::ConfigCoordinator;
use environment::HudEnvironment;
use log::info;
use overlay::{content::SCHEME, ContentServer, OverlayWindow};
use report::ReportSource;
use settings::SettingsStore;
use tauri::{Manager, RunEvent};
use tray::{hotkeys, TrayController};

pub(crate) struct AppState {
    pub(crate) coordinator: Arc<ConfigCoordinator>,
    pub(crate) reports: ReportSource,
    pub(crate) app_info: AppInfoSource,
}

pub fn run() {
    utils::logging::init();

    info!("Stress Control HUD starting up...");

    let environment = HudEnvironment::from_env();
    info!(
        "App paths: root={} config={} report={} index={}",
        environment.app_root.display(),
        environment.config_path().display(),
        environment.report_path().display(),
        environment.bundle_index().display()
    );
    info!(
        "Mode: {} | window profile: {:?}",
        if environment.is_dev { "dev" } else { "production" },
        environment.profile
    );

    let content = ContentServer::new(environment.dev_server_url.clone(), environment.bundle_dir());
    let protocol_content = content.clone();

    tauri::Builder::default()
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .register_uri_scheme_protocol(SCHEME, move |_ctx, request| {
            protocol_content.respond(&request)
        })
        .setup(move |app| {
            let result = (|| -> anyhow::Result<()> {
                let coordinator = Arc::new(ConfigCoordinator::new(SettingsStore::new(
                    environment.config_path(),
                )));
                let initial = coordinator.current();

                app.manage(AppState {
                    coordinator: Arc::clone(&coordinator),
                    reports: ReportSource::new(environment.report_path()),
                    app_info: AppInfoSource::new(
                        environment.core_manifest_path(),
                        environment.ui_manifest_path(),
                    ),
                });

                // Observers are notified in this order after every update:
                // window first, then tray.
                let overlay = Arc::new(OverlayWindow::create(
                    app.handle(),
                    environment.profile.clone(),
                    &content,
                    &initial,
                )?);
                let overlay_id = coordinator.subscribe(overlay.clone());
                let weak_coordinator = Arc::downgrade(&coordinator);
                overlay.on_destroyed(move || {
                    if let Some(coordinator) = weak_coordinator.upgrade() {
                        coordinator.unsubscribe(overlay_id);
                    }
                });

                let tray = TrayController::create(app.handle(), &initial)?;
                coordinator.subscribe(Arc::new(tray));

                hotkeys::register(app.handle())?;

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            get_config,
            set_config,
            read_latest_report,
            get_app_info,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app, event| match event {
            // The overlay closing must not end the process; the tray stays.
            RunEvent::ExitRequested { code: None, api, .. } => api.prevent_exit(),
            RunEvent::Exit => hotkeys::unregister_all(app),
            _ => {}
        });
}
