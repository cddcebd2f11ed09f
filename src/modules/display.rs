//! Connected displays, from the display server background probe.

use crate::error::ModuleFailure;
use crate::format::FormatArg;
use crate::module::{Context, Detector};
use crate::options::{ModuleArgs, OptionTarget};
use serde::Serialize;

/// One connected display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayInfo {
    /// Connector name.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Session protocol, if known.
    pub protocol: Option<String>,
}

/// Options of the display module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Display {
    /// Label and format templates.
    pub args: ModuleArgs,
}

impl OptionTarget for Display {
    const NAME: &'static str = "Display";

    fn module_args(&self) -> &ModuleArgs {
        &self.args
    }

    fn module_args_mut(&mut self) -> &mut ModuleArgs {
        &mut self.args
    }
}

impl Detector for Display {
    type Item = DisplayInfo;

    const FORMAT_HELP: &'static [&'static str] = &[
        "Screen width (in pixels)",
        "Screen height (in pixels)",
        "Screen name",
        "Display server protocol",
    ];

    fn detect(&self, ctx: &Context<'_>) -> Result<Vec<DisplayInfo>, ModuleFailure> {
        let server = ctx.background.display_server();
        if server.outputs.is_empty() {
            return Err(ModuleFailure::detection("no connected display found"));
        }
        Ok(server
            .outputs
            .iter()
            .map(|output| DisplayInfo {
                name: output.name.clone(),
                width: output.width,
                height: output.height,
                protocol: server.protocol.clone(),
            })
            .collect())
    }

    fn default_key(&self, item: &DisplayInfo, _index: usize, _count: usize) -> String {
        format!("{} ({})", Self::NAME, item.name)
    }

    fn key_args<'i>(&self, item: &'i DisplayInfo) -> Vec<FormatArg<'i>> {
        vec![FormatArg::from(&item.name)]
    }

    fn default_value(&self, item: &DisplayInfo, _ctx: &Context<'_>) -> String {
        format!("{}x{}", item.width, item.height)
    }

    fn format_args<'i>(&self, item: &'i DisplayInfo, _ctx: &Context<'_>) -> Vec<FormatArg<'i>> {
        vec![
            FormatArg::from(item.width),
            FormatArg::from(item.height),
            FormatArg::from(&item.name),
            FormatArg::Str(item.protocol.as_deref().unwrap_or_default()),
        ]
    }
}
