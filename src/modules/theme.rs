//! Widget theme of the desktop toolkits.

use super::ToolkitValues;
use crate::background::ToolkitSettings;
use crate::error::ModuleFailure;
use crate::format::FormatArg;
use crate::module::{Context, Detector};
use crate::options::{ModuleArgs, OptionTarget};

/// Options of the theme module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Theme {
    /// Label and format templates.
    pub args: ModuleArgs,
}

fn theme_of(settings: &ToolkitSettings) -> Option<&String> {
    settings.theme.as_ref()
}

impl OptionTarget for Theme {
    const NAME: &'static str = "Theme";

    fn module_args(&self) -> &ModuleArgs {
        &self.args
    }

    fn module_args_mut(&mut self) -> &mut ModuleArgs {
        &mut self.args
    }
}

impl Detector for Theme {
    type Item = ToolkitValues;

    const CACHEABLE: bool = true;

    const FORMAT_HELP: &'static [&'static str] =
        &["Qt theme", "GTK2 theme", "GTK3 theme", "GTK4 theme"];

    fn detect(&self, ctx: &Context<'_>) -> Result<Vec<ToolkitValues>, ModuleFailure> {
        let values = ToolkitValues::collect(ctx.background, theme_of);
        if values.is_empty() {
            return Err(ModuleFailure::detection("no GTK or Qt theme found"));
        }
        Ok(vec![values])
    }

    fn default_value(&self, item: &ToolkitValues, _ctx: &Context<'_>) -> String {
        item.pretty()
    }

    fn format_args<'i>(&self, item: &'i ToolkitValues, _ctx: &Context<'_>) -> Vec<FormatArg<'i>> {
        item.format_args()
    }
}
