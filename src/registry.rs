//! The statically known set of modules and the ordered registry driving them.

use crate::config::Config;
use crate::error::OptionError;
use crate::module::{Context, Module};
use crate::modules::{Brightness, Command, Display, Icons, Theme, Title, Users};
use serde_json::Value;
use std::io::{self, Write};
use std::str::FromStr;
use strum::IntoEnumIterator;
use tracing::warn;

/// Every module this program knows about.
///
/// Declaration order is the default print order.
///
/// # Example
///
/// ```rust
/// use hostfetch::ModuleKind;
/// use std::str::FromStr;
///
/// assert_eq!(ModuleKind::from_str("brightness"), Ok(ModuleKind::Brightness));
/// assert_eq!(ModuleKind::Brightness.name(), "Brightness");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum ModuleKind {
    /// `user@host` line.
    Title,
    /// Connected displays.
    Display,
    /// Widget theme.
    Theme,
    /// Icon theme.
    Icons,
    /// Backlight brightness.
    Brightness,
    /// Logged-in users.
    Users,
    /// User-configured commands.
    Command,
}

impl ModuleKind {
    /// All kinds, in registry order.
    pub fn all() -> impl Iterator<Item = ModuleKind> {
        Self::iter()
    }

    /// The module name, also the CLI option prefix.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// A module instance with default options.
    pub fn create(self) -> Box<dyn Module> {
        match self {
            Self::Title => Box::new(Title::default()),
            Self::Display => Box::new(Display::default()),
            Self::Theme => Box::new(Theme::default()),
            Self::Icons => Box::new(Icons::default()),
            Self::Brightness => Box::new(Brightness::default()),
            Self::Users => Box::new(Users::default()),
            Self::Command => Box::new(Command::default()),
        }
    }
}

/// One configured instance of every module, plus the print order.
pub struct Registry {
    modules: Vec<(ModuleKind, Box<dyn Module>)>,
    order: Vec<ModuleKind>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Every module with default options, printed in registry order.
    pub fn new() -> Self {
        Self {
            modules: ModuleKind::all().map(|kind| (kind, kind.create())).collect(),
            order: ModuleKind::all().collect(),
        }
    }

    /// The print order.
    pub fn order(&self) -> &[ModuleKind] {
        &self.order
    }

    /// The instance of `kind`.
    pub fn module(&self, kind: ModuleKind) -> &dyn Module {
        let index = self.index_of(kind);
        self.modules[index].1.as_ref()
    }

    fn module_mut(&mut self, kind: ModuleKind) -> &mut dyn Module {
        let index = self.index_of(kind);
        self.modules[index].1.as_mut()
    }

    fn index_of(&self, kind: ModuleKind) -> usize {
        // `modules` is built from `ModuleKind::all()`, so the discriminant is the index
        kind as usize
    }

    /// Offer a CLI option to each module in registry order.
    ///
    /// Returns the module that claimed the key, or `None` if none did.
    ///
    /// # Errors
    ///
    /// The claiming module's error if the value is invalid.
    pub fn parse_cli_option(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<Option<ModuleKind>, OptionError> {
        for (kind, module) in &mut self.modules {
            if module.parse_cli_option(key, value)? {
                return Ok(Some(*kind));
            }
        }
        Ok(None)
    }

    /// Replace the print order with a `:`-separated list of module names.
    ///
    /// Unknown names are skipped and reported.
    pub fn parse_structure(&mut self, structure: &str) -> Vec<OptionError> {
        let mut warnings = Vec::new();
        self.order = structure
            .split(':')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| match ModuleKind::from_str(name) {
                Ok(kind) => Some(kind),
                Err(_) => {
                    warnings.push(OptionError::UnknownModule(name.to_string()));
                    None
                }
            })
            .collect();
        warnings
    }

    /// Apply the `modules` list and the CLI module options of `config`.
    ///
    /// Nothing here is fatal; every problem is returned as a warning and the
    /// remaining entries are still applied.
    pub fn apply_config(&mut self, config: &Config) -> Vec<OptionError> {
        let mut warnings = Vec::new();

        if let Some(entries) = &config.modules {
            self.order.clear();
            for entry in entries {
                match self.apply_module_entry(entry) {
                    Ok((kind, entry_warnings)) => {
                        self.order.push(kind);
                        warnings.extend(entry_warnings);
                    }
                    Err(e) => warnings.push(e),
                }
            }
        }

        for (key, value) in &config.cli_options {
            match self.parse_cli_option(key, value) {
                Ok(Some(_)) => {}
                Ok(None) => warnings.push(OptionError::UnclaimedKey(key.clone())),
                Err(e) => warnings.push(e),
            }
        }

        warnings
    }

    fn apply_module_entry(
        &mut self,
        entry: &Value,
    ) -> Result<(ModuleKind, Vec<OptionError>), OptionError> {
        match entry {
            Value::String(name) => {
                let kind = ModuleKind::from_str(name)
                    .map_err(|_| OptionError::UnknownModule(name.clone()))?;
                Ok((kind, Vec::new()))
            }
            Value::Object(object) => {
                let name = object
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case("type"))
                    .and_then(|(_, value)| value.as_str())
                    .ok_or(OptionError::MissingType)?;
                let kind = ModuleKind::from_str(name)
                    .map_err(|_| OptionError::UnknownModule(name.to_string()))?;
                let warnings = self.module_mut(kind).parse_json_object(object);
                Ok((kind, warnings))
            }
            _ => Err(OptionError::MissingType),
        }
    }

    /// Print every module in order.
    ///
    /// A failing module never stops the ones after it; only write errors
    /// on `out` are returned.
    pub fn print_all(&self, ctx: &Context<'_>, out: &mut dyn Write) -> io::Result<()> {
        for &kind in &self.order {
            self.module(kind).print(ctx, out)?;
        }
        Ok(())
    }

    /// The JSON document: one entry per module in order.
    pub fn generate_json(&self, ctx: &Context<'_>) -> Value {
        Value::Array(
            self.order
                .iter()
                .map(|&kind| self.module(kind).generate_json(ctx))
                .collect(),
        )
    }

    /// Write the placeholder legend of `kind`.
    pub fn print_help_format(&self, kind: ModuleKind, out: &mut dyn Write) -> io::Result<()> {
        self.module(kind).print_help_format(out)
    }
}

/// Log configuration warnings.
pub fn report_warnings(warnings: &[OptionError]) {
    for warning in warnings {
        warn!("{warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_names_match_modules() {
        let registry = Registry::new();
        for kind in ModuleKind::all() {
            assert_eq!(registry.module(kind).name(), kind.name());
        }
    }

    #[test]
    fn test_only_brightness_claims_its_option() {
        for kind in ModuleKind::all() {
            let mut module = kind.create();
            let claimed = module.parse_cli_option("Brightness-ddcci-sleep", "5");
            assert_eq!(claimed, Ok(kind == ModuleKind::Brightness), "{kind}");
        }

        let mut registry = Registry::new();
        assert_eq!(
            registry.parse_cli_option("Brightness-ddcci-sleep", "5"),
            Ok(Some(ModuleKind::Brightness))
        );
        assert_eq!(registry.parse_cli_option("Nothing-at-all", "5"), Ok(None));
    }

    #[test]
    fn test_parse_structure() {
        let mut registry = Registry::new();
        let warnings = registry.parse_structure("theme:Bogus::Brightness");
        assert_eq!(registry.order(), [ModuleKind::Theme, ModuleKind::Brightness]);
        assert_eq!(warnings, vec![OptionError::UnknownModule("Bogus".to_string())]);
    }

    #[test]
    fn test_apply_config_modules_and_cli_options() {
        let mut registry = Registry::new();
        let config = Config {
            modules: Some(vec![
                json!("Users"),
                json!({"type": "Brightness", "ddcciSleep": 2, "colour": "red"}),
                json!({"noType": true}),
                json!("Nope"),
            ]),
            cli_options: vec![
                ("Theme-format".to_string(), "{2}".to_string()),
                ("Mystery-key".to_string(), "x".to_string()),
            ],
            ..Config::default()
        };

        let warnings = registry.apply_config(&config);
        assert_eq!(registry.order(), [ModuleKind::Users, ModuleKind::Brightness]);
        assert_eq!(
            warnings,
            vec![
                OptionError::UnknownKey {
                    module: "Brightness".to_string(),
                    key: "colour".to_string(),
                },
                OptionError::MissingType,
                OptionError::UnknownModule("Nope".to_string()),
                OptionError::UnclaimedKey("Mystery-key".to_string()),
            ]
        );
    }

    #[test]
    fn test_default_order_is_every_module() {
        let registry = Registry::new();
        assert_eq!(registry.order().len(), ModuleKind::all().count());
    }
}
