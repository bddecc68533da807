use anyhow::{anyhow, Result};
use log::{info, warn};
use tauri::{AppHandle, Manager};
use tauri_plugin_global_shortcut::{Code, GlobalShortcutExt, Modifiers, Shortcut, ShortcutState};

use crate::{settings::ConfigField, AppState};

#[derive(Debug, Clone, Copy)]
pub struct HotkeyBinding {
    pub accelerator: &'static str,
    pub code: Code,
    pub field: ConfigField,
}

impl HotkeyBinding {
    pub fn shortcut(&self) -> Shortcut {
        Shortcut::new(Some(Modifiers::CONTROL | Modifiers::ALT), self.code)
    }
}

pub const BINDINGS: [HotkeyBinding; 3] = [
    HotkeyBinding {
        accelerator: "Ctrl+Alt+1",
        code: Code::Digit1,
        field: ConfigField::ShowDynamic,
    },
    HotkeyBinding {
        accelerator: "Ctrl+Alt+2",
        code: Code::Digit2,
        field: ConfigField::ShowStatic,
    },
    HotkeyBinding {
        accelerator: "Ctrl+Alt+0",
        code: Code::Digit0,
        field: ConfigField::ClickThrough,
    },
];

/// Binds every hotkey. Any rejection from the OS aborts startup.
pub fn register(app: &AppHandle) -> Result<()> {
    for binding in BINDINGS {
        app.global_shortcut()
            .on_shortcut(binding.shortcut(), move |app, _shortcut, event| {
                if event.state != ShortcutState::Pressed {
                    return;
                }
                // Some backends deliver hotkeys off the event loop; updates
                // stay serialized with tray clicks and bridge calls there.
                let handle = app.clone();
                let dispatched = app.run_on_main_thread(move || {
                    let next = handle.state::<AppState>().coordinator.toggle(binding.field);
                    info!(
                        "{} toggled {} to {}",
                        binding.accelerator,
                        binding.field.key(),
                        binding.field.get(&next)
                    );
                });
                if let Err(err) = dispatched {
                    warn!("Dropped {} press: {err}", binding.accelerator);
                }
            })
            .map_err(|err| anyhow!("Failed to register {}: {err}", binding.accelerator))?;
    }

    info!(
        "Registered hotkeys: {}",
        BINDINGS.map(|binding| binding.accelerator).join(", ")
    );
    Ok(())
}

/// Releases every OS-level binding before the process goes away.
pub fn unregister_all(app: &AppHandle) {
    match app.global_shortcut().unregister_all() {
        Ok(()) => info!("Hotkeys released"),
        Err(err) => warn!("Failed to release hotkeys: {err}"),
    }
}
