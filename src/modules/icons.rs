//! Icon theme of the desktop toolkits.

use super::ToolkitValues;
use crate::background::ToolkitSettings;
use crate::error::ModuleFailure;
use crate::format::FormatArg;
use crate::module::{Context, Detector};
use crate::options::{ModuleArgs, OptionTarget};

/// Options of the icons module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Icons {
    /// Label and format templates.
    pub args: ModuleArgs,
}

fn icons_of(settings: &ToolkitSettings) -> Option<&String> {
    settings.icons.as_ref()
}

impl OptionTarget for Icons {
    const NAME: &'static str = "Icons";

    fn module_args(&self) -> &ModuleArgs {
        &self.args
    }

    fn module_args_mut(&mut self) -> &mut ModuleArgs {
        &mut self.args
    }
}

impl Detector for Icons {
    type Item = ToolkitValues;

    const CACHEABLE: bool = true;

    const FORMAT_HELP: &'static [&'static str] = &["Qt icons", "GTK2 icons", "GTK3 icons", "GTK4 icons"];

    fn detect(&self, ctx: &Context<'_>) -> Result<Vec<ToolkitValues>, ModuleFailure> {
        let values = ToolkitValues::collect(ctx.background, icons_of);
        if values.is_empty() {
            return Err(ModuleFailure::detection("no GTK or Qt icon theme found"));
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
