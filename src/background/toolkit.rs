//! GTK and Qt settings probes.
//!
//! Only the user's own settings files are read: `~/.gtkrc-2.0` for GTK2,
//! `settings.ini` under the config home for GTK3 and GTK4, and `kdeglobals`
//! for Qt.

use super::ProbeEnv;
use std::fs;
use std::path::Path;
use strum::Display;
use tracing::debug;

/// GTK major versions that are probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum GtkVersion {
    /// GTK 2.
    #[strum(serialize = "GTK2")]
    Gtk2,
    /// GTK 3.
    #[strum(serialize = "GTK3")]
    Gtk3,
    /// GTK 4.
    #[strum(serialize = "GTK4")]
    Gtk4,
}

/// Theme settings of one toolkit. Empty when nothing is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolkitSettings {
    /// Widget theme name.
    pub theme: Option<String>,
    /// Icon theme name.
    pub icons: Option<String>,
}

const GTK_THEME_KEY: &str = "gtk-theme-name";
const GTK_ICONS_KEY: &str = "gtk-icon-theme-name";

pub(crate) fn detect_gtk2(env: &ProbeEnv) -> ToolkitSettings {
    let path = env.home.join(".gtkrc-2.0");
    let Some(content) = read_settings(&path) else {
        return ToolkitSettings::default();
    };
    ToolkitSettings {
        theme: find_value(&content, None, GTK_THEME_KEY),
        icons: find_value(&content, None, GTK_ICONS_KEY),
    }
}

pub(crate) fn detect_gtk3(env: &ProbeEnv) -> ToolkitSettings {
    gtk_settings_ini(env, "gtk-3.0")
}

pub(crate) fn detect_gtk4(env: &ProbeEnv) -> ToolkitSettings {
    gtk_settings_ini(env, "gtk-4.0")
}

fn gtk_settings_ini(env: &ProbeEnv, dir: &str) -> ToolkitSettings {
    let path = env.config_home().join(dir).join("settings.ini");
    let Some(content) = read_settings(&path) else {
        return ToolkitSettings::default();
    };
    ToolkitSettings {
        theme: find_value(&content, Some("Settings"), GTK_THEME_KEY),
        icons: find_value(&content, Some("Settings"), GTK_ICONS_KEY),
    }
}

pub(crate) fn detect_qt(env: &ProbeEnv) -> ToolkitSettings {
    let path = env.config_home().join("kdeglobals");
    let Some(content) = read_settings(&path) else {
        return ToolkitSettings::default();
    };
    ToolkitSettings {
        theme: find_value(&content, Some("KDE"), "widgetStyle"),
        icons: find_value(&content, Some("Icons"), "Theme"),
    }
}

fn read_settings(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "toolkit settings unavailable");
            None
        }
    }
}

/// Look up `key` in INI-style `content`.
///
/// With `section` set only lines below that `[section]` header count;
/// without it the file is treated as flat (gtkrc). Values are trimmed and
/// unquoted; empty values count as absent.
fn find_value(content: &str, section: Option<&str>, key: &str) -> Option<String> {
    let mut in_section = section.is_none();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = section.map_or(true, |wanted| header.trim() == wanted);
            continue;
        }
        if !in_section {
            continue;
        }
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        if name.trim() != key {
            continue;
        }
        let value = value.trim().trim_matches('"').trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}
