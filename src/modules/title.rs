//! `user@host`, from the process state snapshot.

use crate::error::ModuleFailure;
use crate::format::FormatArg;
use crate::module::{Context, Detector};
use crate::options::{ModuleArgs, OptionTarget};
use serde::Serialize;

/// Host name used when the system reports none.
const FALLBACK_HOSTNAME: &str = "localhost";

/// Who is logged in where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleInfo {
    /// Login name.
    pub user_name: String,
    /// Network host name.
    pub host_name: String,
    /// Home directory.
    pub home_dir: String,
}

/// Options of the title module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Title {
    /// Label and format templates.
    pub args: ModuleArgs,
}

impl OptionTarget for Title {
    const NAME: &'static str = "Title";

    fn module_args(&self) -> &ModuleArgs {
        &self.args
    }

    fn module_args_mut(&mut self) -> &mut ModuleArgs {
        &mut self.args
    }
}

impl Detector for Title {
    type Item = TitleInfo;

    const FORMAT_HELP: &'static [&'static str] = &["User name", "Host name", "Home directory"];

    fn detect(&self, ctx: &Context<'_>) -> Result<Vec<TitleInfo>, ModuleFailure> {
        let user = &ctx.state.user;
        if user.name.is_empty() {
            return Err(ModuleFailure::detection("cannot determine user name"));
        }
        Ok(vec![TitleInfo {
            user_name: user.name.clone(),
            host_name: ctx
                .state
                .host
                .hostname
                .clone()
                .unwrap_or_else(|| FALLBACK_HOSTNAME.to_string()),
            home_dir: user.home.display().to_string(),
        }])
    }

    fn default_value(&self, item: &TitleInfo, _ctx: &Context<'_>) -> String {
        format!("{}@{}", item.user_name, item.host_name)
    }

    fn format_args<'i>(&self, item: &'i TitleInfo, _ctx: &Context<'_>) -> Vec<FormatArg<'i>> {
        vec![
            FormatArg::from(&item.user_name),
            FormatArg::from(&item.host_name),
            FormatArg::from(&item.home_dir),
        ]
    }
}
