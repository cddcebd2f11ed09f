//! Module options.
//!
//! Every module carries a [`ModuleArgs`] block plus its own options. Instead
//! of a hand-written parse function per module, each module publishes a
//! table of [`OptionField`]s and the generic parsers in this file apply CLI
//! `key value` pairs and JSON module blocks against that table.

use crate::error::OptionError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Label and output templates shared by every module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleArgs {
    /// Template for the printed label. Empty means the module's default.
    pub key: String,
    /// Template for the printed value. Empty means the module's default
    /// rendering.
    pub output_format: String,
    /// Template applied to error messages (`{1}` is the message).
    pub error_format: String,
}

/// How a raw option value is interpreted, paired with the setter receiving it.
pub enum Setter<T> {
    /// Unsigned 32-bit integer.
    UInt(fn(&mut T, u32)),
    /// Boolean; on the command line `true/false`, `yes/no`, `1/0` or empty.
    Bool(fn(&mut T, bool)),
    /// Free text.
    Str(fn(&mut T, String)),
    /// List of strings. A CLI occurrence appends one element, a JSON array
    /// appends all of its elements.
    StrList(fn(&mut T, Vec<String>)),
}

impl<T> Setter<T> {
    fn expected(&self) -> &'static str {
        match self {
            Self::UInt(_) => "an unsigned integer",
            Self::Bool(_) => "a boolean",
            Self::Str(_) => "a string",
            Self::StrList(_) => "a string or an array of strings",
        }
    }
}

/// One entry of a module's option table.
pub struct OptionField<T> {
    /// Sub-key on the command line, after the `<Module>-` prefix.
    pub cli_key: &'static str,
    /// Key inside the module's JSON block.
    pub json_key: &'static str,
    /// Value kind and setter.
    pub setter: Setter<T>,
}

/// Implemented by every module so the generic parsers can reach its options.
pub trait OptionTarget: Sized + 'static {
    /// Module name, also the CLI prefix.
    const NAME: &'static str;

    /// The shared label/format block.
    fn module_args(&self) -> &ModuleArgs;

    /// Mutable access to the shared label/format block.
    fn module_args_mut(&mut self) -> &mut ModuleArgs;

    /// Module-specific option table.
    fn option_fields() -> &'static [OptionField<Self>] {
        &[]
    }
}

/// Strip `<module>-` from `key`, ignoring ASCII case.
pub fn strip_module_prefix<'k>(key: &'k str, module: &str) -> Option<&'k str> {
    let head = key.get(..module.len())?;
    if !head.eq_ignore_ascii_case(module) {
        return None;
    }
    key[module.len()..].strip_prefix('-')
}

/// Apply a command-line option to `target`.
///
/// Returns `Ok(false)` without touching `target` when `key` does not belong
/// to this module, `Ok(true)` when it was applied.
///
/// # Errors
///
/// [`OptionError::InvalidValue`] when the key belongs to this module but the
/// value cannot be interpreted. The key counts as claimed.
pub fn parse_cli_option<T: OptionTarget>(
    target: &mut T,
    key: &str,
    value: &str,
) -> Result<bool, OptionError> {
    let Some(sub_key) = strip_module_prefix(key, T::NAME) else {
        return Ok(false);
    };

    let args = target.module_args_mut();
    if sub_key.eq_ignore_ascii_case("key") {
        args.key = value.to_string();
        return Ok(true);
    }
    if sub_key.eq_ignore_ascii_case("format") {
        args.output_format = value.to_string();
        return Ok(true);
    }
    if sub_key.eq_ignore_ascii_case("error") {
        args.error_format = value.to_string();
        return Ok(true);
    }

    let Some(field) = T::option_fields()
        .iter()
        .find(|field| field.cli_key.eq_ignore_ascii_case(sub_key))
    else {
        return Ok(false);
    };

    let invalid = || OptionError::InvalidValue {
        module: T::NAME.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        expected: field.setter.expected(),
    };

    match &field.setter {
        Setter::UInt(set) => set(target, value.trim().parse().map_err(|_| invalid())?),
        Setter::Bool(set) => set(target, parse_bool(value).ok_or_else(invalid)?),
        Setter::Str(set) => set(target, value.to_string()),
        Setter::StrList(set) => set(target, vec![value.to_string()]),
    }
    Ok(true)
}

/// Apply a JSON module block to `target`.
///
/// `type` is skipped, the common `key`/`outputFormat`/`errorFormat` keys go
/// to [`ModuleArgs`], everything else is looked up in the option table.
/// Problems are returned as warnings; valid keys are applied regardless.
pub fn parse_json_object<T: OptionTarget>(
    target: &mut T,
    object: &Map<String, Value>,
) -> Vec<OptionError> {
    let mut warnings = Vec::new();

    for (key, value) in object {
        if key.eq_ignore_ascii_case("type") {
            continue;
        }

        let invalid = |expected: &'static str| OptionError::InvalidValue {
            module: T::NAME.to_string(),
            key: key.clone(),
            value: value.to_string(),
            expected,
        };

        let common = if key.eq_ignore_ascii_case("key") {
            Some(&mut target.module_args_mut().key)
        } else if key.eq_ignore_ascii_case("outputFormat") || key.eq_ignore_ascii_case("format") {
            Some(&mut target.module_args_mut().output_format)
        } else if key.eq_ignore_ascii_case("errorFormat") {
            Some(&mut target.module_args_mut().error_format)
        } else {
            None
        };
        if let Some(slot) = common {
            match value.as_str() {
                Some(text) => *slot = text.to_string(),
                None => warnings.push(invalid("a string")),
            }
            continue;
        }

        let Some(field) = T::option_fields()
            .iter()
            .find(|field| field.json_key.eq_ignore_ascii_case(key))
        else {
            warnings.push(OptionError::UnknownKey {
                module: T::NAME.to_string(),
                key: key.clone(),
            });
            continue;
        };

        let applied = match &field.setter {
            Setter::UInt(set) => value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(|v| set(target, v)),
            Setter::Bool(set) => value.as_bool().map(|v| set(target, v)),
            Setter::Str(set) => value.as_str().map(|v| set(target, v.to_string())),
            Setter::StrList(set) => json_string_list(value).map(|v| set(target, v)),
        };
        if applied.is_none() {
            warnings.push(invalid(field.setter.expected()));
        }
    }

    warnings
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn json_string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(text) => Some(vec![text.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}
