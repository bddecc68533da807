use serde::Serialize;

/// Background used while the debug profile is enabled and `HUD_DEBUG_BG` is unset.
pub const DEBUG_BACKGROUND: &str = "#000000D9";
/// Background of the production overlay.
pub const PRODUCTION_BACKGROUND: &str = "#00000000";

/// Window attributes, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugWindowProfile {
    pub enabled: bool,
    pub transparent: bool,
    pub background_color: String,
    pub always_on_top: bool,
    pub skip_taskbar: bool,
    pub frame: bool,
    pub resizable: bool,
    pub open_devtools: bool,
}

impl DebugWindowProfile {
    /// The overlay shape used whenever debugging is off. Individual
    /// `HUD_DEBUG_*` overrides never apply to it.
    pub fn production() -> Self {
        Self {
            enabled: false,
            transparent: true,
            background_color: PRODUCTION_BACKGROUND.into(),
            always_on_top: true,
            skip_taskbar: true,
            frame: false,
            resizable: false,
            open_devtools: false,
        }
    }

    pub fn resolve<F>(is_dev: bool, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str, default: bool| parse_bool(lookup(key).as_deref(), default);

        if !(is_dev && flag("HUD_DEBUG", true)) {
            return Self::production();
        }

        Self {
            enabled: true,
            transparent: flag("HUD_DEBUG_TRANSPARENT", false),
            background_color: lookup("HUD_DEBUG_BG").unwrap_or_else(|| DEBUG_BACKGROUND.into()),
            always_on_top: flag("HUD_DEBUG_ALWAYS_ON_TOP", true),
            skip_taskbar: flag("HUD_DEBUG_SKIP_TASKBAR", false),
            frame: flag("HUD_DEBUG_FRAME", true),
            resizable: flag("HUD_DEBUG_RESIZABLE", true),
            open_devtools: flag("HUD_DEBUG_DEVTOOLS", false),
        }
    }

    /// Parses `background_color` as `#RRGGBB` or `#RRGGBBAA`. Anything else
    /// gives opaque black.
    pub fn background_rgba(&self) -> (u8, u8, u8, u8) {
        parse_hex_color(&self.background_color).unwrap_or((0, 0, 0, 255))
    }
}

/// Whether the window should let mouse input fall through. An enabled debug
/// profile always keeps the window interactive.
pub fn effective_click_through(profile: &DebugWindowProfile, stored: bool) -> bool {
    !profile.enabled && stored
}

/// Accepts `1`, `0`, `true` and `false` in any case; anything else is `default`.
pub fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(str::trim) {
        Some("1") => true,
        Some("0") => false,
        Some(other) if other.eq_ignore_ascii_case("true") => true,
        Some(other) if other.eq_ignore_ascii_case("false") => false,
        _ => default,
    }
}

fn parse_hex_color(value: &str) -> Option<(u8, u8, u8, u8)> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
        return None;
    }
    let channel = |index: usize| u8::from_str_radix(&hex[index..index + 2], 16).ok();

    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Some((channel(0)?, channel(2)?, channel(4)?, alpha))
}
