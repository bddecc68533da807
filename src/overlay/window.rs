use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use anyhow::{anyhow, Context, Result};
use tauri::{
    webview::PageLoadEvent, window::Color, AppHandle, Emitter, PhysicalPosition, PhysicalSize,
    WebviewUrl, WebviewWindow, WebviewWindowBuilder, WindowEvent,
};

use crate::{
    coordinator::ConfigObserver,
    log_debug, log_error, log_info, log_warn,
    settings::HudConfig,
};

use super::{
    content::{entry_url, ContentServer, ContentSource},
    profile::{effective_click_through, DebugWindowProfile},
};

const ENABLE_LOGS: bool = true;

pub const OVERLAY_LABEL: &str = "overlay";
/// Event carrying the full [`HudConfig`] to the display surface.
pub const CONFIG_UPDATED_EVENT: &str = "config-updated";

type WindowSlot = Arc<Mutex<Option<WebviewWindow>>>;

/// Owner of the one overlay window. The handle is dropped once the window is
/// destroyed; later configuration changes then have nothing to update.
pub struct OverlayWindow {
    slot: WindowSlot,
    profile: DebugWindowProfile,
}

impl OverlayWindow {
    pub fn create(
        app: &AppHandle,
        profile: DebugWindowProfile,
        content: &ContentServer,
        initial: &HudConfig,
    ) -> Result<Self> {
        let source = content.resolve();
        let url = entry_url(&source)?;
        let webview_url = match &source {
            ContentSource::DevServer(dev_url) => {
                log_info!("Loading display surface from dev server {dev_url}");
                WebviewUrl::External(url)
            }
            ContentSource::Bundle(index) => {
                log_info!("Loading display surface bundle {}", index.display());
                WebviewUrl::CustomProtocol(url)
            }
            ContentSource::Fallback => {
                log_warn!("Loading the fallback display surface");
                WebviewUrl::CustomProtocol(url)
            }
        };

        let monitor = app
            .primary_monitor()
            .context("Failed to query the primary monitor")?
            .ok_or_else(|| anyhow!("No primary monitor available"))?;
        let scale = monitor.scale_factor();
        let (width, height) = (
            f64::from(monitor.size().width) / scale,
            f64::from(monitor.size().height) / scale,
        );
        let (red, green, blue, alpha) = profile.background_rgba();

        let first_load = Arc::new(AtomicBool::new(true));
        let window = WebviewWindowBuilder::new(app, OVERLAY_LABEL, webview_url)
            .title("Stress Control HUD")
            .inner_size(width, height)
            .position(0.0, 0.0)
            .transparent(profile.transparent)
            .decorations(profile.frame)
            .resizable(profile.resizable)
            .maximizable(false)
            .always_on_top(profile.always_on_top)
            .skip_taskbar(profile.skip_taskbar)
            .shadow(false)
            .background_color(Color(red, green, blue, alpha))
            .visible(false)
            .on_page_load(move |window, payload| match payload.event() {
                PageLoadEvent::Started => log_debug!("Page load started: {}", payload.url()),
                PageLoadEvent::Finished => {
                    log_info!("Page load finished: {}", payload.url());
                    // First paint is the overlay's "ready to show" moment.
                    if first_load.swap(false, Ordering::SeqCst) {
                        fit_to_primary_work_area(&window);
                        reveal(&window);
                    }
                }
            })
            .build()
            .context("Failed to create the overlay window")?;

        let slot: WindowSlot = Arc::new(Mutex::new(Some(window.clone())));
        attach_telemetry(&window, Arc::clone(&slot));

        let overlay = Self { slot, profile };
        overlay.apply_click_through(initial.click_through);
        overlay.position_on_primary_work_area();
        reveal(&window);

        if overlay.profile.open_devtools {
            open_devtools(&window);
        }

        Ok(overlay)
    }

    /// Runs `f` once the window is destroyed.
    pub fn on_destroyed<F>(&self, f: F)
    where
        F: Fn() + Send + 'static,
    {
        if let Some(window) = self.window() {
            window.on_window_event(move |event| {
                if matches!(event, WindowEvent::Destroyed) {
                    f();
                }
            });
        }
    }

    fn window(&self) -> Option<WebviewWindow> {
        match self.slot.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn apply_click_through(&self, stored: bool) {
        let Some(window) = self.window() else {
            return;
        };
        let ignore = effective_click_through(&self.profile, stored);
        if let Err(err) = window.set_ignore_cursor_events(ignore) {
            log_warn!("Failed to set click-through to {ignore}: {err}");
        } else {
            log_debug!("Click-through {} (stored preference {stored})", if ignore { "on" } else { "off" });
        }
    }

    pub fn position_on_primary_work_area(&self) {
        if let Some(window) = self.window() {
            fit_to_primary_work_area(&window);
        }
    }
}

impl ConfigObserver for OverlayWindow {
    fn name(&self) -> &'static str {
        "overlay-window"
    }

    fn config_changed(&self, config: &HudConfig) {
        let Some(window) = self.window() else {
            return;
        };
        self.apply_click_through(config.click_through);
        if let Err(err) = window.emit(CONFIG_UPDATED_EVENT, config) {
            log_error!("Failed to emit {CONFIG_UPDATED_EVENT}: {err}");
        }
    }
}

/// Covers the primary monitor's work area, leaving the taskbar or dock visible.
fn fit_to_primary_work_area(window: &WebviewWindow) {
    let monitor = match window.primary_monitor() {
        Ok(Some(monitor)) => monitor,
        Ok(None) => {
            log_warn!("No primary monitor; leaving overlay bounds unchanged");
            return;
        }
        Err(err) => {
            log_warn!("Failed to query primary monitor: {err}");
            return;
        }
    };

    let area = monitor.work_area();
    let position = PhysicalPosition::new(area.position.x, area.position.y);
    let size = PhysicalSize::new(area.size.width, area.size.height);

    if let Err(err) = window.set_position(position) {
        log_warn!("Failed to move overlay: {err}");
    }
    if let Err(err) = window.set_size(size) {
        log_warn!("Failed to resize overlay: {err}");
    }
    log_debug!(
        "Overlay bounds set to {}x{} at ({}, {})",
        size.width,
        size.height,
        position.x,
        position.y
    );
}

fn reveal(window: &WebviewWindow) {
    if let Err(err) = window.show() {
        log_warn!("Failed to show overlay: {err}");
    }
    if let Err(err) = window.set_focus() {
        log_warn!("Failed to focus overlay: {err}");
    }
}

#[cfg(any(debug_assertions, feature = "devtools"))]
fn open_devtools(window: &WebviewWindow) {
    window.open_devtools();
}

#[cfg(not(any(debug_assertions, feature = "devtools")))]
fn open_devtools(_window: &WebviewWindow) {
    log_warn!("HUD_DEBUG_DEVTOOLS needs a debug build or the `devtools` feature");
}

/// Window lifecycle logging. Nothing here changes behaviour except dropping
/// the handle once the window is gone.
fn attach_telemetry(window: &WebviewWindow, slot: WindowSlot) {
    window.on_window_event(move |event| match event {
        WindowEvent::Focused(focused) => log_debug!("Overlay focus changed: {focused}"),
        WindowEvent::Resized(size) => {
            log_debug!("Overlay resized to {}x{}", size.width, size.height)
        }
        WindowEvent::Moved(position) => {
            log_debug!("Overlay moved to ({}, {})", position.x, position.y)
        }
        WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
            log_info!("Overlay scale factor changed to {scale_factor}")
        }
        WindowEvent::CloseRequested { .. } => log_info!("Overlay close requested"),
        WindowEvent::Destroyed => {
            log_info!("Overlay destroyed");
            match slot.lock() {
                Ok(mut guard) => *guard = None,
                Err(poisoned) => *poisoned.into_inner() = None,
            }
        }
        _ => {}
    });
}
