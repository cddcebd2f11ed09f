//! Logged-in users.

use crate::error::ModuleFailure;
use crate::format::{FormatArg, LIST_SEPARATOR};
use crate::module::{Context, Detector};
use crate::options::{ModuleArgs, OptionTarget};
use crate::process;
use serde::Serialize;

/// Everyone with an open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedInUsers {
    /// Login names in first-seen order, without duplicates.
    pub users: Vec<String>,
}

/// Options of the users module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Users {
    /// Label and format templates.
    pub args: ModuleArgs,
}

impl OptionTarget for Users {
    const NAME: &'static str = "Users";

    fn module_args(&self) -> &ModuleArgs {
        &self.args
    }

    fn module_args_mut(&mut self) -> &mut ModuleArgs {
        &mut self.args
    }
}

impl Detector for Users {
    type Item = LoggedInUsers;

    const FORMAT_HELP: &'static [&'static str] = &["User names"];

    fn detect(&self, _ctx: &Context<'_>) -> Result<Vec<LoggedInUsers>, ModuleFailure> {
        let who = process::find_program("who").map_err(|e| ModuleFailure::detection(e.to_string()))?;
        let output = process::block_on(process::run(&who, &[], process::DEFAULT_TIMEOUT))
            .map_err(|e| ModuleFailure::detection(format!("failed to start runtime: {e}")))?
            .map_err(|e| ModuleFailure::detection(format!("who: {e}")))?;

        let users = parse_who(&output);
        if users.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![LoggedInUsers { users }])
    }

    fn default_value(&self, item: &LoggedInUsers, _ctx: &Context<'_>) -> String {
        item.users.join(LIST_SEPARATOR)
    }

    fn format_args<'i>(&self, item: &'i LoggedInUsers, _ctx: &Context<'_>) -> Vec<FormatArg<'i>> {
        let names = item.users.iter().map(FormatArg::from).collect();
        vec![FormatArg::List(names)]
    }
}

/// First column of every `who` line, de-duplicated.
fn parse_who(output: &str) -> Vec<String> {
    let mut users: Vec<String> = Vec::new();
    for name in output.lines().filter_map(|line| line.split_whitespace().next()) {
        if !users.iter().any(|seen| seen == name) {
            users.push(name.to_string());
        }
    }
    users
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_who_unique_in_order() {
        let output = "\
alice    tty2         2024-05-01 08:00 (tty2)
bob      pts/0        2024-05-01 09:12 (10.0.0.2)
alice    pts/1        2024-05-01 09:30 (:0)
";
        assert_eq!(parse_who(output), vec!["alice", "bob"]);
    }

    #[test]
    fn test_parse_who_empty() {
        assert!(parse_who("").is_empty());
        assert!(parse_who("\n   \n").is_empty());
    }

    #[test]
    fn test_no_options_beyond_common_args() {
        let mut module = Users::default();
        assert_eq!(
            crate::options::parse_cli_option(&mut module, "Users-format", "{1}"),
            Ok(true)
        );
        assert_eq!(
            crate::options::parse_cli_option(&mut module, "Users-ddcci-sleep", "1"),
            Ok(false)
        );
    }
}
