//! Display server connection and connected outputs.

use super::ProbeEnv;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// One connected output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayOutput {
    /// Connector name, e.g. `eDP-1`.
    pub name: String,
    /// Preferred mode width in pixels.
    pub width: u32,
    /// Preferred mode height in pixels.
    pub height: u32,
}

/// What the display server probe found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayServer {
    /// `Wayland`, `X11`, `TTY`, ...
    pub protocol: Option<String>,
    /// Connected outputs, sorted by name.
    pub outputs: Vec<DisplayOutput>,
}

pub(crate) fn detect(env: &ProbeEnv) -> DisplayServer {
    let server = DisplayServer {
        protocol: protocol(env),
        outputs: drm_outputs(&env.sys_path("class/drm")),
    };
    debug!(
        protocol = ?server.protocol,
        outputs = server.outputs.len(),
        "display server probed"
    );
    server
}

fn protocol(env: &ProbeEnv) -> Option<String> {
    if env.var("WAYLAND_DISPLAY").is_some() {
        return Some("Wayland".to_string());
    }
    if let Some(session) = env.var("XDG_SESSION_TYPE") {
        let name = match session.to_ascii_lowercase().as_str() {
            "wayland" => "Wayland",
            "x11" => "X11",
            "tty" => "TTY",
            "mir" => "Mir",
            _ => return Some(session.to_string()),
        };
        return Some(name.to_string());
    }
    env.var("DISPLAY").map(|_| "X11".to_string())
}

fn drm_outputs(drm: &Path) -> Vec<DisplayOutput> {
    let entries = match fs::read_dir(drm) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(path = %drm.display(), error = %e, "no drm class directory");
            return Vec::new();
        }
    };

    let mut outputs: Vec<DisplayOutput> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| read_output(&entry.path()))
        .collect();
    outputs.sort_by(|a, b| a.name.cmp(&b.name));
    outputs
}

fn read_output(dir: &Path) -> Option<DisplayOutput> {
    let status = fs::read_to_string(dir.join("status")).ok()?;
    if status.trim() != "connected" {
        return None;
    }
    let modes = fs::read_to_string(dir.join("modes")).ok()?;
    let (width, height) = parse_mode(modes.lines().next()?)?;

    let entry = dir.file_name()?.to_string_lossy();
    // card0-eDP-1 -> eDP-1
    let name = match entry.split_once('-') {
        Some((card, connector)) if card.starts_with("card") => connector.to_string(),
        _ => entry.into_owned(),
    };
    Some(DisplayOutput {
        name,
        width,
        height,
    })
}

/// `2560x1600` or `1920x1080i`.
fn parse_mode(line: &str) -> Option<(u32, u32)> {
    let (width, height) = line.trim().split_once('x')?;
    let height: String = height.chars().take_while(char::is_ascii_digit).collect();
    Some((width.parse().ok()?, height.parse().ok()?))
}
