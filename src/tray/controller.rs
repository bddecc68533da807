use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use log::{error, info, warn};
use tauri::{
    menu::{CheckMenuItem, Menu, MenuItem, PredefinedMenuItem},
    tray::TrayIcon,
    AppHandle, Manager,
};

use crate::{coordinator::ConfigObserver, settings::HudConfig, AppState};

use super::menu::{MenuAction, MenuEntry, MenuModel, QUIT_ID};

const TRAY_ID: &str = "hud-tray";

type MenuSlot = Arc<Mutex<Option<Menu<tauri::Wry>>>>;

/// Owner of the tray icon. Rebuilds its menu whenever the configuration
/// changes so the checkboxes never drift from the stored record.
pub struct TrayController {
    app: AppHandle,
    tray: TrayIcon,
    menu: MenuSlot,
}

impl TrayController {
    pub fn create(app: &AppHandle, initial: &HudConfig) -> Result<Self> {
        let menu = build_menu(app, &MenuModel::from_config(initial))?;
        let slot: MenuSlot = Arc::new(Mutex::new(Some(menu.clone())));

        // The icon itself is declared in tauri.conf.json and exists before setup runs.
        let tray = app
            .tray_by_id(TRAY_ID)
            .with_context(|| format!("Tray icon '{TRAY_ID}' is missing from the app config"))?;
        tray.set_menu(Some(menu))
            .context("Failed to install tray menu")?;

        let handler_slot = Arc::clone(&slot);
        tray.on_menu_event(move |app, event| {
            handle_menu_event(app, &handler_slot, event.id().as_ref())
        });

        info!("Tray icon ready");
        Ok(Self {
            app: app.clone(),
            tray,
            menu: slot,
        })
    }

    fn refresh(&self, config: &HudConfig) -> Result<()> {
        let menu = build_menu(&self.app, &MenuModel::from_config(config))?;
        self.tray
            .set_menu(Some(menu.clone()))
            .context("Failed to install tray menu")?;
        match self.menu.lock() {
            Ok(mut guard) => *guard = Some(menu),
            Err(poisoned) => *poisoned.into_inner() = Some(menu),
        }
        Ok(())
    }
}

impl ConfigObserver for TrayController {
    fn name(&self) -> &'static str {
        "tray"
    }

    fn config_changed(&self, config: &HudConfig) {
        if let Err(err) = self.refresh(config) {
            error!("{err:#}");
        }
    }
}

fn build_menu(app: &AppHandle, model: &MenuModel) -> Result<Menu<tauri::Wry>> {
    let menu = Menu::new(app).context("Failed to create tray menu")?;
    for entry in &model.entries {
        match entry {
            MenuEntry::Toggle {
                field,
                label,
                checked,
            } => {
                let item =
                    CheckMenuItem::with_id(app, field.key(), *label, true, *checked, None::<&str>)?;
                menu.append(&item)?;
            }
            MenuEntry::Separator => menu.append(&PredefinedMenuItem::separator(app)?)?,
            MenuEntry::Quit => {
                menu.append(&MenuItem::with_id(app, QUIT_ID, "Quit", true, None::<&str>)?)?
            }
        }
    }
    Ok(menu)
}

fn handle_menu_event(app: &AppHandle, menu: &MenuSlot, id: &str) {
    match MenuAction::from_id(id) {
        Some(MenuAction::Quit) => {
            info!("Quit requested from tray");
            app.exit(0);
        }
        Some(MenuAction::Toggle(field)) => {
            let coordinator = &app.state::<AppState>().coordinator;
            // The platform flips the checkbox before we hear about the click.
            let checked = checked_state(menu, id)
                .unwrap_or_else(|| !field.get(&coordinator.current()));
            coordinator.update(field.patch(checked));
        }
        None => warn!("Ignoring unknown tray menu item '{id}'"),
    }
}

fn checked_state(menu: &MenuSlot, id: &str) -> Option<bool> {
    let guard = menu.lock().ok()?;
    let item = guard.as_ref()?.get(id)?;
    item.as_check_menuitem()?.is_checked().ok()
}
