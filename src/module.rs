//! The module contract and the presentation pipeline.
//!
//! A concrete module implements the typed [`Detector`] trait. Every
//! `Detector` is also a [`Module`], the object-safe descriptor the registry
//! stores and drives; the blanket impl here is the whole pipeline, so the
//! registry never needs to know anything about a particular module.
//!
//! Per module invocation:
//!
//! ```text
//! START -> CACHE_LOOKUP -> HIT  -> EMIT_CACHED -> DONE
//!                       -> MISS -> DETECT -> ERROR -> EMIT_ERROR -> DONE
//!                                         -> OK -> FORMAT -> CACHE_STORE -> EMIT -> DONE
//! ```

use crate::background::Background;
use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::{ModuleFailure, OptionError};
use crate::format::{render, FormatArg, Rendered};
use crate::options::{self, ModuleArgs, OptionTarget};
use crate::state::ProcessState;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::io::{self, Write};
use tracing::warn;

const TEXT_BOLD: &str = "\x1b[1m";
const TEXT_RESET: &str = "\x1b[0m";
const TEXT_ERROR: &str = "\x1b[1;31m";

/// Everything a module may consult while running.
pub struct Context<'a> {
    /// Process-wide state.
    pub state: &'a ProcessState,
    /// General configuration.
    pub config: &'a Config,
    /// Disk cache.
    pub cache: &'a CacheStore,
    /// Results of the background subsystems.
    pub background: &'a Background,
}

/// A detector plus the knowledge of how to present its results.
///
/// `Default` is the module's init: it must produce the module's default
/// options. Owned buffers are released on drop.
pub trait Detector: OptionTarget + Default {
    /// One detected value; one printed line.
    type Item: Serialize;

    /// Whether rendered values go through the disk cache.
    ///
    /// Labels of cacheable modules are derived from the result index only,
    /// so they can be reproduced on a cache hit without detecting.
    const CACHEABLE: bool = false;

    /// Template shown as the default in the format legend.
    const DEFAULT_FORMAT: &'static str = "{1}";

    /// Meaning of each format placeholder, `{1}` first.
    const FORMAT_HELP: &'static [&'static str];

    /// Probe the system.
    fn detect(&self, ctx: &Context<'_>) -> Result<Vec<Self::Item>, ModuleFailure>;

    /// Label used when no custom key template is configured.
    fn default_key(&self, _item: &Self::Item, index: usize, count: usize) -> String {
        numbered_key(Self::NAME, index, count)
    }

    /// Arguments after the index for a custom key template.
    fn key_args<'i>(&self, _item: &'i Self::Item) -> Vec<FormatArg<'i>> {
        Vec::new()
    }

    /// Value rendered when no output format is configured.
    fn default_value(&self, item: &Self::Item, ctx: &Context<'_>) -> String;

    /// Positional arguments for the output format.
    fn format_args<'i>(&self, item: &'i Self::Item, ctx: &Context<'_>) -> Vec<FormatArg<'i>>;
}

/// The module descriptor: the uniform surface the registry drives.
pub trait Module {
    /// Stable module name.
    fn name(&self) -> &'static str;

    /// Apply a CLI option if it belongs to this module.
    fn parse_cli_option(&mut self, key: &str, value: &str) -> Result<bool, OptionError>;

    /// Apply a JSON module block; returns non-fatal warnings.
    fn parse_json_object(&mut self, object: &Map<String, Value>) -> Vec<OptionError>;

    /// Run the full pipeline and write the module's lines to `out`.
    fn print(&self, ctx: &Context<'_>, out: &mut dyn Write) -> io::Result<()>;

    /// Detect and describe the result as JSON. Never touches the cache.
    fn generate_json(&self, ctx: &Context<'_>) -> Value;

    /// Write the format placeholder legend.
    fn print_help_format(&self, out: &mut dyn Write) -> io::Result<()>;
}

impl<D: Detector> Module for D {
    fn name(&self) -> &'static str {
        D::NAME
    }

    fn parse_cli_option(&mut self, key: &str, value: &str) -> Result<bool, OptionError> {
        options::parse_cli_option(self, key, value)
    }

    fn parse_json_object(&mut self, object: &Map<String, Value>) -> Vec<OptionError> {
        options::parse_json_object(self, object)
    }

    fn print(&self, ctx: &Context<'_>, out: &mut dyn Write) -> io::Result<()> {
        present(self, ctx, out)
    }

    fn generate_json(&self, ctx: &Context<'_>) -> Value {
        present_json(self, ctx)
    }

    fn print_help_format(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{} output format (default: {}):", D::NAME, D::DEFAULT_FORMAT)?;
        for (index, meaning) in D::FORMAT_HELP.iter().enumerate() {
            writeln!(out, "    {{{}}}: {}", index + 1, meaning)?;
        }
        Ok(())
    }
}

/// `Name` for a single result, `Name N` (1-based) when there are several.
pub fn numbered_key(name: &str, index: usize, count: usize) -> String {
    if count <= 1 {
        name.to_string()
    } else {
        format!("{} {}", name, index + 1)
    }
}

/// Index passed as `{1}` to custom key templates: 0 for a lone result.
fn key_index(index: usize, count: usize) -> usize {
    if count == 1 {
        0
    } else {
        index + 1
    }
}

fn detect_items<D: Detector>(module: &D, ctx: &Context<'_>) -> Result<Vec<D::Item>, ModuleFailure> {
    let items = module.detect(ctx)?;
    if items.is_empty() {
        return Err(ModuleFailure::NoResult);
    }
    Ok(items)
}

fn item_key<D: Detector>(module: &D, item: &D::Item, index: usize, count: usize) -> String {
    let args = OptionTarget::module_args(module);
    if D::CACHEABLE {
        return index_key::<D>(args, index, count);
    }
    let mut key_args = vec![FormatArg::from(key_index(index, count))];
    key_args.extend(module.key_args(item));
    match render(&args.key, &key_args) {
        Rendered::UseDefault => module.default_key(item, index, count),
        Rendered::Text(text) => text,
    }
}

fn index_key<D: Detector>(args: &ModuleArgs, index: usize, count: usize) -> String {
    let key_args = [FormatArg::from(key_index(index, count))];
    render(&args.key, &key_args)
        .text()
        .unwrap_or_else(|| numbered_key(D::NAME, index, count))
}

fn item_value<D: Detector>(module: &D, item: &D::Item, ctx: &Context<'_>) -> String {
    let args = OptionTarget::module_args(module);
    match render(&args.output_format, &module.format_args(item, ctx)) {
        Rendered::UseDefault => module.default_value(item, ctx),
        Rendered::Text(text) => text,
    }
}

/// Run the print pipeline for one module.
///
/// Only write failures on `out` are returned; detection problems are
/// printed (if enabled) or swallowed.
pub fn present<D: Detector>(module: &D, ctx: &Context<'_>, out: &mut dyn Write) -> io::Result<()> {
    let args = OptionTarget::module_args(module);

    if D::CACHEABLE {
        if let Some(values) = lookup_cached(ctx.cache, D::NAME) {
            let count = values.len();
            for (index, value) in values.iter().enumerate() {
                print_line(ctx.config, out, &index_key::<D>(args, index, count), value)?;
            }
            return Ok(());
        }
    }

    let items = match detect_items(module, ctx) {
        Ok(items) => items,
        Err(failure) => return print_error(ctx.config, out, D::NAME, args, &failure),
    };

    let count = items.len();
    let lines: Vec<(String, String)> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            (
                item_key(module, item, index, count),
                item_value(module, item, ctx),
            )
        })
        .collect();

    if D::CACHEABLE {
        let values: Vec<&str> = lines.iter().map(|(_, value)| value.as_str()).collect();
        store_cached(ctx.cache, D::NAME, &values);
    }

    for (key, value) in &lines {
        print_line(ctx.config, out, key, value)?;
    }
    Ok(())
}

/// Run the JSON pipeline for one module.
///
/// Produces `{"type": ..., "result": [...]}` or `{"type": ..., "error": ...}`.
pub fn present_json<D: Detector>(module: &D, ctx: &Context<'_>) -> Value {
    match detect_items(module, ctx) {
        Ok(items) => match serde_json::to_value(&items) {
            Ok(result) => json!({ "type": D::NAME, "result": result }),
            Err(e) => json!({ "type": D::NAME, "error": e.to_string() }),
        },
        Err(failure) => json!({ "type": D::NAME, "error": failure.description() }),
    }
}

/// Cached values for a module: `<name>` alone, else `<name>-1`, `<name>-2`, ...
fn lookup_cached(cache: &CacheStore, name: &str) -> Option<Vec<String>> {
    if let Some(value) = cache.lookup(name) {
        return Some(vec![value]);
    }
    let values: Vec<String> = (1..)
        .map(|index| cache.lookup(&format!("{name}-{index}")))
        .take_while(Option::is_some)
        .flatten()
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn store_cached(cache: &CacheStore, name: &str, values: &[&str]) {
    if let [value] = values {
        cache.store(name, value);
        cache.remove(&format!("{name}-1"));
        return;
    }
    cache.remove(name);
    for (index, value) in values.iter().enumerate() {
        cache.store(&format!("{name}-{}", index + 1), value);
    }
    cache.remove(&format!("{name}-{}", values.len() + 1));
}

fn write_key(config: &Config, out: &mut dyn Write, key: &str) -> io::Result<()> {
    if config.pipe {
        write!(out, "{}{}", key, config.separator)
    } else {
        let color = if config.key_color.is_empty() {
            String::new()
        } else {
            format!("\x1b[{}m", config.key_color)
        };
        write!(
            out,
            "{TEXT_BOLD}{color}{key}{TEXT_RESET}{}",
            config.separator
        )
    }
}

/// Print `key`, the separator and `value` as one line.
pub fn print_line(config: &Config, out: &mut dyn Write, key: &str, value: &str) -> io::Result<()> {
    write_key(config, out, key)?;
    writeln!(out, "{value}")
}

/// Print a module failure, if error display is enabled.
pub fn print_error(
    config: &Config,
    out: &mut dyn Write,
    name: &str,
    args: &ModuleArgs,
    failure: &ModuleFailure,
) -> io::Result<()> {
    if !config.show_errors {
        return Ok(());
    }

    let key = render(&args.key, &[FormatArg::UInt(0)])
        .text()
        .unwrap_or_else(|| name.to_string());
    let message = render(&args.error_format, &[FormatArg::Str(failure.description())])
        .text()
        .unwrap_or_else(|| failure.description().to_string());

    write_key(config, out, &key)?;
    if config.pipe {
        writeln!(out, "{message}")
    } else {
        writeln!(out, "{TEXT_ERROR}{message}{TEXT_RESET}")
    }
}

/// Log a rendering problem that was degraded to an empty value.
pub(crate) fn warn_degraded(module: &str, error: &dyn std::fmt::Display) {
    warn!(module, %error, "rendering value as empty");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::{Background, ProbeEnv};
    use crate::cache::CachePolicy;
    use crate::options::{OptionField, Setter};
    use serde::Serialize;
    use std::cell::Cell;

    #[derive(Debug, Clone, Serialize)]
    struct Reading {
        label: String,
        value: u64,
    }

    #[derive(Default)]
    struct Fake {
        args: ModuleArgs,
        readings: Vec<(String, u64)>,
        failure: Option<String>,
        detections: Cell<u32>,
    }

    fn add_reading(fake: &mut Fake, values: Vec<String>) {
        fake.readings
            .extend(values.into_iter().map(|label| (label, 1)));
    }

    const FAKE_FIELDS: &[OptionField<Fake>] = &[OptionField {
        cli_key: "reading",
        json_key: "readings",
        setter: Setter::StrList(add_reading),
    }];

    impl OptionTarget for Fake {
        const NAME: &'static str = "Fake";

        fn module_args(&self) -> &ModuleArgs {
            &self.args
        }

        fn module_args_mut(&mut self) -> &mut ModuleArgs {
            &mut self.args
        }

        fn option_fields() -> &'static [OptionField<Self>] {
            FAKE_FIELDS
        }
    }

    impl Detector for Fake {
        type Item = Reading;
        const FORMAT_HELP: &'static [&'static str] = &["Reading value", "Reading label"];

        fn detect(&self, _ctx: &Context<'_>) -> Result<Vec<Reading>, ModuleFailure> {
            self.detections.set(self.detections.get() + 1);
            if let Some(message) = &self.failure {
                return Err(ModuleFailure::detection(message.clone()));
            }
            Ok(self
                .readings
                .iter()
                .map(|(label, value)| Reading {
                    label: label.clone(),
                    value: *value,
                })
                .collect())
        }

        fn key_args<'i>(&self, item: &'i Reading) -> Vec<FormatArg<'i>> {
            vec![FormatArg::from(&item.label)]
        }

        fn default_value(&self, item: &Reading, _ctx: &Context<'_>) -> String {
            format!("{} units", item.value)
        }

        fn format_args<'i>(&self, item: &'i Reading, _ctx: &Context<'_>) -> Vec<FormatArg<'i>> {
            vec![FormatArg::UInt(item.value), FormatArg::from(&item.label)]
        }
    }

    #[derive(Default)]
    struct CachedFake {
        args: ModuleArgs,
        values: Vec<String>,
        detections: Cell<u32>,
    }

    impl OptionTarget for CachedFake {
        const NAME: &'static str = "Cached";

        fn module_args(&self) -> &ModuleArgs {
            &self.args
        }

        fn module_args_mut(&mut self) -> &mut ModuleArgs {
            &mut self.args
        }
    }

    impl Detector for CachedFake {
        type Item = String;
        const CACHEABLE: bool = true;
        const FORMAT_HELP: &'static [&'static str] = &["Value"];

        fn detect(&self, _ctx: &Context<'_>) -> Result<Vec<String>, ModuleFailure> {
            self.detections.set(self.detections.get() + 1);
            Ok(self.values.clone())
        }

        fn default_value(&self, item: &String, _ctx: &Context<'_>) -> String {
            item.clone()
        }

        fn format_args<'i>(&self, item: &'i String, _ctx: &Context<'_>) -> Vec<FormatArg<'i>> {
            vec![FormatArg::from(item)]
        }
    }

    struct Harness {
        _tmp: tempfile::TempDir,
        state: ProcessState,
        config: Config,
        cache: CacheStore,
        background: Background,
    }

    impl Harness {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let state = ProcessState::with_home(tmp.path());
            let config = Config {
                pipe: true,
                ..Config::default()
            };
            let cache = CacheStore::new(state.cache_dir.clone(), CachePolicy::default());
            let background = Background::start(ProbeEnv::from_state(&state), false);
            Self {
                _tmp: tmp,
                state,
                config,
                cache,
                background,
            }
        }

        fn ctx(&self) -> Context<'_> {
            Context {
                state: &self.state,
                config: &self.config,
                cache: &self.cache,
                background: &self.background,
            }
        }

        fn print(&self, module: &dyn Module) -> String {
            let mut out = Vec::new();
            module.print(&self.ctx(), &mut out).unwrap();
            String::from_utf8(out).unwrap()
        }
    }

    fn fake(readings: &[(&str, u64)]) -> Fake {
        Fake {
            readings: readings
                .iter()
                .map(|(label, value)| (label.to_string(), *value))
                .collect(),
            ..Fake::default()
        }
    }

    #[test]
    fn test_numbered_key() {
        assert_eq!(numbered_key("Display", 0, 1), "Display");
        assert_eq!(numbered_key("Display", 0, 2), "Display 1");
        assert_eq!(numbered_key("Display", 1, 2), "Display 2");
    }

    #[test]
    fn test_default_rendering() {
        let harness = Harness::new();
        let output = harness.print(&fake(&[("a", 3)]));
        assert_eq!(output, "Fake: 3 units\n");
    }

    #[test]
    fn test_multiple_results_are_numbered() {
        let harness = Harness::new();
        let output = harness.print(&fake(&[("a", 3), ("b", 4)]));
        assert_eq!(output, "Fake 1: 3 units\nFake 2: 4 units\n");
    }

    #[test]
    fn test_custom_key_and_format() {
        let harness = Harness::new();
        let mut module = fake(&[("a", 3), ("b", 4)]);
        module.args.key = "#{1} {2}".to_string();
        module.args.output_format = "{2}={1}".to_string();
        let output = harness.print(&module);
        assert_eq!(output, "#1 a: a=3\n#2 b: b=4\n");
    }

    #[test]
    fn test_custom_key_single_result_index_is_zero() {
        let harness = Harness::new();
        let mut module = fake(&[("a", 3)]);
        module.args.key = "#{1} {2}".to_string();
        assert_eq!(harness.print(&module), "#0 a: 3 units\n");
    }

    #[test]
    fn test_errors_hidden_by_default() {
        let harness = Harness::new();
        let module = Fake {
            failure: Some("sensor missing".to_string()),
            ..Fake::default()
        };
        assert_eq!(harness.print(&module), "");
        assert_eq!(harness.print(&Fake::default()), "");
    }

    #[test]
    fn test_errors_shown_when_enabled() {
        let mut harness = Harness::new();
        harness.config.show_errors = true;
        let module = Fake {
            failure: Some("sensor missing".to_string()),
            ..Fake::default()
        };
        assert_eq!(harness.print(&module), "Fake: sensor missing\n");
        assert_eq!(harness.print(&Fake::default()), "Fake: No result is detected.\n");
    }

    #[test]
    fn test_error_format_applies() {
        let mut harness = Harness::new();
        harness.config.show_errors = true;
        let mut module = Fake {
            failure: Some("sensor missing".to_string()),
            ..Fake::default()
        };
        module.args.error_format = "<{1}>".to_string();
        assert_eq!(harness.print(&module), "Fake: <sensor missing>\n");
    }

    #[test]
    fn test_colored_output_when_not_piped() {
        let mut harness = Harness::new();
        harness.config.pipe = false;
        let output = harness.print(&fake(&[("a", 3)]));
        assert_eq!(output, "\x1b[1mFake\x1b[0m: 3 units\n");
    }

    #[test]
    fn test_json_result_and_error() {
        let harness = Harness::new();
        let value = fake(&[("a", 3)]).generate_json(&harness.ctx());
        assert_eq!(
            value,
            json!({"type": "Fake", "result": [{"label": "a", "value": 3}]})
        );

        let value = Fake::default().generate_json(&harness.ctx());
        assert_eq!(value, json!({"type": "Fake", "error": "No result is detected."}));
    }

    #[test]
    fn test_json_field_order_is_stable() {
        let harness = Harness::new();
        let value = fake(&[("a", 3)]).generate_json(&harness.ctx());
        let keys: Vec<&String> = value["result"][0].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["label", "value"]);
    }

    #[test]
    fn test_cacheable_module_hits_cache_second_time() {
        let harness = Harness::new();
        let module = CachedFake {
            values: vec!["Adwaita".to_string()],
            ..CachedFake::default()
        };
        assert_eq!(harness.print(&module), "Cached: Adwaita\n");
        assert_eq!(harness.print(&module), "Cached: Adwaita\n");
        assert_eq!(module.detections.get(), 1);
    }

    #[test]
    fn test_cacheable_module_multiple_values() {
        let harness = Harness::new();
        let module = CachedFake {
            values: vec!["one".to_string(), "two".to_string()],
            ..CachedFake::default()
        };
        let first = harness.print(&module);
        assert_eq!(first, "Cached 1: one\nCached 2: two\n");
        assert_eq!(harness.print(&module), first);
        assert_eq!(module.detections.get(), 1);
    }

    #[test]
    fn test_cache_shrinking_result_set_drops_stale_entries() {
        let harness = Harness::new();
        store_cached(&harness.cache, "Cached", &["one", "two", "three"]);
        store_cached(&harness.cache, "Cached", &["only"]);
        assert_eq!(lookup_cached(&harness.cache, "Cached"), Some(vec!["only".to_string()]));

        store_cached(&harness.cache, "Cached", &["x", "y"]);
        assert_eq!(
            lookup_cached(&harness.cache, "Cached"),
            Some(vec!["x".to_string(), "y".to_string()])
        );
    }

    #[test]
    fn test_json_bypasses_cache() {
        let harness = Harness::new();
        let module = CachedFake {
            values: vec!["Adwaita".to_string()],
            ..CachedFake::default()
        };
        harness.print(&module);
        module.generate_json(&harness.ctx());
        module.generate_json(&harness.ctx());
        assert_eq!(module.detections.get(), 3);
    }

    #[test]
    fn test_help_format_legend() {
        let mut out = Vec::new();
        Fake::default().print_help_format(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Fake output format (default: {1}):\n    {1}: Reading value\n    {2}: Reading label\n"
        );
    }

    #[test]
    fn test_descriptor_routes_options() {
        let mut module = Fake::default();
        let descriptor: &mut dyn Module = &mut module;
        assert_eq!(descriptor.parse_cli_option("Fake-reading", "x"), Ok(true));
        assert_eq!(descriptor.parse_cli_option("Other-reading", "x"), Ok(false));
        assert_eq!(module.readings.len(), 1);
    }
}
