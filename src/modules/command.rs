//! Output of user-configured shell commands.

use crate::error::ModuleFailure;
use crate::format::FormatArg;
use crate::module::{numbered_key, Context, Detector};
use crate::options::{ModuleArgs, OptionField, OptionTarget, Setter};
use crate::process;
use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Shell used when none is configured.
pub const DEFAULT_SHELL: &str = "sh";

/// One command's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Label of the command.
    pub key: String,
    /// Trimmed standard output.
    pub output: String,
}

/// Options of the command module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Label and format templates.
    pub args: ModuleArgs,
    /// Shell the command texts are passed to with `-c`.
    pub shell: String,
    /// Label per command, matched to `texts` by position.
    pub keys: Vec<String>,
    /// Command lines.
    pub texts: Vec<String>,
    /// How long each command may run.
    pub timeout_ms: u32,
}

impl Default for Command {
    fn default() -> Self {
        Self {
            args: ModuleArgs::default(),
            shell: DEFAULT_SHELL.to_string(),
            keys: Vec::new(),
            texts: Vec::new(),
            timeout_ms: process::DEFAULT_TIMEOUT.as_millis() as u32,
        }
    }
}

fn set_shell(module: &mut Command, value: String) {
    module.shell = value;
}

fn add_keys(module: &mut Command, values: Vec<String>) {
    module.keys.extend(values);
}

fn add_texts(module: &mut Command, values: Vec<String>) {
    module.texts.extend(values);
}

fn set_timeout(module: &mut Command, value: u32) {
    module.timeout_ms = value;
}

const COMMAND_FIELDS: &[OptionField<Command>] = &[
    OptionField {
        cli_key: "shell",
        json_key: "shell",
        setter: Setter::Str(set_shell),
    },
    OptionField {
        // `Command-key` is the label template; per-command labels use `keys`
        cli_key: "keys",
        json_key: "keys",
        setter: Setter::StrList(add_keys),
    },
    OptionField {
        cli_key: "text",
        json_key: "texts",
        setter: Setter::StrList(add_texts),
    },
    OptionField {
        cli_key: "timeout",
        json_key: "timeoutMs",
        setter: Setter::UInt(set_timeout),
    },
];

impl OptionTarget for Command {
    const NAME: &'static str = "Command";

    fn module_args(&self) -> &ModuleArgs {
        &self.args
    }

    fn module_args_mut(&mut self) -> &mut ModuleArgs {
        &mut self.args
    }

    fn option_fields() -> &'static [OptionField<Self>] {
        COMMAND_FIELDS
    }
}

impl Command {
    fn label(&self, index: usize) -> String {
        match self.keys.get(index) {
            Some(key) if !key.is_empty() => key.clone(),
            _ => numbered_key(Self::NAME, index, self.texts.len()),
        }
    }
}

impl Detector for Command {
    type Item = CommandOutput;

    const FORMAT_HELP: &'static [&'static str] = &["Command output"];

    fn detect(&self, _ctx: &Context<'_>) -> Result<Vec<CommandOutput>, ModuleFailure> {
        if self.texts.is_empty() {
            return Ok(Vec::new());
        }

        let shell = process::find_program(&self.shell)
            .map_err(|e| ModuleFailure::detection(e.to_string()))?;
        let limit = Duration::from_millis(u64::from(self.timeout_ms));

        let shell = shell.as_path();
        let runs = self.texts.iter().map(|text| async move {
            process::run(shell, &["-c", text.as_str()], limit).await
        });
        let results = process::block_on(join_all(runs))
            .map_err(|e| ModuleFailure::detection(format!("failed to start runtime: {e}")))?;

        let outputs = results
            .into_iter()
            .enumerate()
            .filter_map(|(index, result)| match result {
                Ok(output) if !output.is_empty() => Some(CommandOutput {
                    key: self.label(index),
                    output,
                }),
                Ok(_) => {
                    debug!(index, "command printed nothing");
                    None
                }
                Err(e) => {
                    debug!(index, error = %e, "command failed");
                    None
                }
            })
            .collect();
        Ok(outputs)
    }

    fn default_key(&self, item: &CommandOutput, _index: usize, _count: usize) -> String {
        item.key.clone()
    }

    fn key_args<'i>(&self, item: &'i CommandOutput) -> Vec<FormatArg<'i>> {
        vec![FormatArg::from(&item.key)]
    }

    fn default_value(&self, item: &CommandOutput, _ctx: &Context<'_>) -> String {
        item.output.clone()
    }

    fn format_args<'i>(&self, item: &'i CommandOutput, _ctx: &Context<'_>) -> Vec<FormatArg<'i>> {
        vec![FormatArg::from(&item.output)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{parse_cli_option, parse_json_object};
    use serde_json::json;

    #[test]
    fn test_cli_options() {
        let mut module = Command::default();
        assert_eq!(parse_cli_option(&mut module, "Command-shell", "/bin/bash"), Ok(true));
        assert_eq!(parse_cli_option(&mut module, "Command-keys", "Kernel"), Ok(true));
        assert_eq!(parse_cli_option(&mut module, "Command-text", "uname -r"), Ok(true));
        assert_eq!(parse_cli_option(&mut module, "Command-key", "{2}"), Ok(true));
        assert_eq!(module.shell, "/bin/bash");
        assert_eq!(module.keys, vec!["Kernel"]);
        assert_eq!(module.texts, vec!["uname -r"]);
        assert_eq!(module.args.key, "{2}");
    }

    #[test]
    fn test_json_block() {
        let mut module = Command::default();
        let block = json!({
            "type": "Command",
            "keys": ["A", "B"],
            "texts": ["echo a", "echo b"],
            "timeoutMs": 500
        });
        assert!(parse_json_object(&mut module, block.as_object().unwrap()).is_empty());
        assert_eq!(module.texts.len(), 2);
        assert_eq!(module.timeout_ms, 500);
    }

    #[test]
    fn test_labels_fall_back_to_numbering() {
        let module = Command {
            keys: vec!["First".to_string()],
            texts: vec!["a".to_string(), "b".to_string()],
            ..Command::default()
        };
        assert_eq!(module.label(0), "First");
        assert_eq!(module.label(1), "Command 2");

        let single = Command {
            texts: vec!["a".to_string()],
            ..Command::default()
        };
        assert_eq!(single.label(0), "Command");
    }
}
