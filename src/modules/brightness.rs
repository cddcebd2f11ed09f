//! Screen brightness from the kernel backlight class.

use crate::error::ModuleFailure;
use crate::format::{self, FormatArg};
use crate::module::{warn_degraded, Context, Detector};
use crate::options::{ModuleArgs, OptionField, OptionTarget, Setter};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Default wait, in milliseconds, granted to DDC/CI monitors.
pub const DEFAULT_DDCCI_SLEEP: u32 = 10;

/// One backlight device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrightnessReading {
    /// Connector or device name.
    pub name: String,
    /// Maximum raw brightness.
    pub max: f64,
    /// Minimum raw brightness.
    pub min: f64,
    /// Current raw brightness.
    pub current: f64,
}

impl BrightnessReading {
    fn percent(&self) -> Result<f64, crate::error::FormatError> {
        format::percent(self.current, self.min, self.max)
    }
}

/// Options of the brightness module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brightness {
    /// Label and format templates.
    pub args: ModuleArgs,
    /// Milliseconds to wait for DDC/CI monitors to answer.
    pub ddcci_sleep: u32,
}

impl Default for Brightness {
    fn default() -> Self {
        Self {
            args: ModuleArgs::default(),
            ddcci_sleep: DEFAULT_DDCCI_SLEEP,
        }
    }
}

fn set_ddcci_sleep(module: &mut Brightness, value: u32) {
    module.ddcci_sleep = value;
}

const BRIGHTNESS_FIELDS: &[OptionField<Brightness>] = &[OptionField {
    cli_key: "ddcci-sleep",
    json_key: "ddcciSleep",
    setter: Setter::UInt(set_ddcci_sleep),
}];

impl OptionTarget for Brightness {
    const NAME: &'static str = "Brightness";

    fn module_args(&self) -> &ModuleArgs {
        &self.args
    }

    fn module_args_mut(&mut self) -> &mut ModuleArgs {
        &mut self.args
    }

    fn option_fields() -> &'static [OptionField<Self>] {
        BRIGHTNESS_FIELDS
    }
}

impl Detector for Brightness {
    type Item = BrightnessReading;

    const FORMAT_HELP: &'static [&'static str] = &[
        "Screen brightness (percentage)",
        "Screen name",
        "Maximum brightness value",
        "Minimum brightness value",
        "Current brightness value",
    ];

    fn detect(&self, ctx: &Context<'_>) -> Result<Vec<BrightnessReading>, ModuleFailure> {
        let class = ctx.state.sys_root.join("class/backlight");
        if !class.is_dir() {
            return Err(ModuleFailure::detection("no backlight device found"));
        }
        Ok(read_backlights(&class))
    }

    fn default_key(&self, item: &BrightnessReading, _index: usize, _count: usize) -> String {
        format!("{} ({})", Self::NAME, item.name)
    }

    fn key_args<'i>(&self, item: &'i BrightnessReading) -> Vec<FormatArg<'i>> {
        vec![FormatArg::from(&item.name)]
    }

    fn default_value(&self, item: &BrightnessReading, ctx: &Context<'_>) -> String {
        match item.percent() {
            Ok(percent) => format::percent_value(percent, ctx.config.percent_type()),
            Err(e) => {
                warn_degraded(Self::NAME, &e);
                String::new()
            }
        }
    }

    fn format_args<'i>(&self, item: &'i BrightnessReading, _ctx: &Context<'_>) -> Vec<FormatArg<'i>> {
        let percent = match item.percent() {
            Ok(percent) => FormatArg::Double(percent),
            Err(e) => {
                warn_degraded(Self::NAME, &e);
                FormatArg::Str("")
            }
        };
        vec![
            percent,
            FormatArg::from(&item.name),
            FormatArg::Double(item.max),
            FormatArg::Double(item.min),
            FormatArg::Double(item.current),
        ]
    }
}

/// Read every device under a `class/backlight` directory, sorted by name.
fn read_backlights(class: &Path) -> Vec<BrightnessReading> {
    let entries = match fs::read_dir(class) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(path = %class.display(), error = %e, "cannot list backlight devices");
            return Vec::new();
        }
    };

    let mut readings: Vec<BrightnessReading> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| read_backlight(&entry.path()))
        .collect();
    readings.sort_by(|a, b| a.name.cmp(&b.name));
    readings
}

fn read_backlight(device: &Path) -> Option<BrightnessReading> {
    let max = read_number(&device.join("max_brightness"))?;
    let current = read_number(&device.join("actual_brightness"))
        .or_else(|| read_number(&device.join("brightness")))?;
    Some(BrightnessReading {
        name: device_name(device)?,
        max,
        min: 0.0,
        current,
    })
}

fn read_number(path: &Path) -> Option<f64> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// The DRM connector owning the device (`card0-eDP-1` gives `eDP-1`), else
/// the device's own name.
fn device_name(device: &Path) -> Option<String> {
    let own = device.file_name()?.to_string_lossy().into_owned();
    let Ok(resolved) = fs::canonicalize(device) else {
        return Some(own);
    };
    let connector = resolved.components().rev().find_map(|component| {
        let part = component.as_os_str().to_str()?;
        let (card, connector) = part.split_once('-')?;
        let is_card = card
            .strip_prefix("card")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
        is_card.then(|| connector.to_string())
    });
    Some(connector.unwrap_or(own))
}
