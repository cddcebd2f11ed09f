//! General configuration and config file discovery.

use crate::error::ConfigError;
use crate::format::PercentType;
use crate::state::APP_DIR_NAME;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in `<config dir>/hostfetch/`.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// General toggles plus the ordered module list.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Print module failures instead of skipping the line.
    pub show_errors: bool,
    /// Ignore cached values and detect everything again.
    pub recache: bool,
    /// Write rendered values to the cache.
    pub cache_save: bool,
    /// Run slow subsystem probes on background threads.
    pub multithreading: bool,
    /// Plain output without escape sequences.
    pub pipe: bool,
    /// Disable terminal line wrapping while printing.
    pub disable_linewrap: bool,
    /// Hide the cursor while printing.
    pub hide_cursor: bool,
    /// Text between a label and its value.
    pub separator: String,
    /// Bit set selecting percentage renderings, see [`PercentType`].
    pub percent_type: u8,
    /// SGR parameters applied to labels, e.g. `34` for blue.
    pub key_color: String,
    /// Module names or module blocks, in print order. `None` prints every
    /// registered module.
    pub modules: Option<Vec<Value>>,
    /// Module options given on the command line, in order.
    #[serde(skip_deserializing)]
    pub cli_options: Vec<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_errors: false,
            recache: false,
            cache_save: true,
            multithreading: true,
            pipe: false,
            disable_linewrap: true,
            hide_cursor: true,
            separator: ": ".to_string(),
            percent_type: PercentType::NUM_BIT | PercentType::BAR_BIT,
            key_color: String::new(),
            modules: None,
            cli_options: Vec::new(),
        }
    }
}

impl Config {
    /// Decoded `percent_type`.
    pub fn percent_type(&self) -> PercentType {
        PercentType::from_bits(self.percent_type)
    }

    /// Parse a config from JSON text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if `text` is not a valid config; `path` is only
    /// used for the message.
    pub fn from_json(text: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the config file at `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    /// Load the first `hostfetch/config.json` found in `config_dirs`.
    ///
    /// Returns the default config and no path when there is none.
    ///
    /// # Errors
    ///
    /// As [`Config::load`], for the first file that exists.
    pub fn discover(config_dirs: &[PathBuf]) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match find_config_file(config_dirs) {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                let config = Self::load(&path)?;
                Ok((config, Some(path)))
            }
            None => {
                debug!("no config file found, using defaults");
                Ok((Self::default(), None))
            }
        }
    }

    /// Canonical text of everything that shapes rendered values.
    ///
    /// Only values are cached; labels, colours and error lines are added at
    /// print time. Settings that only affect those, or whether the cache is
    /// read or written, are left out so changing them keeps the cache.
    pub fn fingerprint_input(&self) -> String {
        let defaults = Self::default();
        let mut shaping = self.clone();
        shaping.recache = defaults.recache;
        shaping.cache_save = defaults.cache_save;
        shaping.multithreading = defaults.multithreading;
        shaping.disable_linewrap = defaults.disable_linewrap;
        shaping.hide_cursor = defaults.hide_cursor;
        shaping.pipe = defaults.pipe;
        shaping.show_errors = defaults.show_errors;
        shaping.separator = defaults.separator;
        shaping.key_color = defaults.key_color;
        serde_json::to_string(&shaping).unwrap_or_default()
    }
}

/// First existing `<dir>/hostfetch/config.json`.
pub fn find_config_file(config_dirs: &[PathBuf]) -> Option<PathBuf> {
    config_dirs
        .iter()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_is_default() {
        let config = Config::from_json("{}", Path::new("c.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.percent_type(), PercentType { num: true, bar: true });
    }

    #[test]
    fn test_camel_case_fields() {
        let config = Config::from_json(
            r#"{
                "showErrors": true,
                "cacheSave": false,
                "percentType": 1,
                "separator": " -> ",
                "modules": ["Theme", {"type": "Brightness", "ddcciSleep": 3}]
            }"#,
            Path::new("c.json"),
        )
        .unwrap();
        assert!(config.show_errors);
        assert!(!config.cache_save);
        assert_eq!(config.separator, " -> ");
        assert_eq!(config.percent_type(), PercentType { num: true, bar: false });
        assert_eq!(
            config.modules,
            Some(vec![json!("Theme"), json!({"type": "Brightness", "ddcciSleep": 3})])
        );
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let result = Config::from_json("{\"showErrors\": \"yes\"}", Path::new("c.json"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_discover_first_match_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("a");
        let second = tmp.path().join("b");
        for (dir, separator) in [(&first, "1"), (&second, "2")] {
            fs::create_dir_all(dir.join(APP_DIR_NAME)).unwrap();
            fs::write(
                dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME),
                format!("{{\"separator\": \"{separator}\"}}"),
            )
            .unwrap();
        }

        let missing = tmp.path().join("missing");
        let (config, path) = Config::discover(&[missing, second.clone(), first]).unwrap();
        assert_eq!(config.separator, "2");
        assert_eq!(path, Some(second.join(APP_DIR_NAME).join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_discover_nothing_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let (config, path) = Config::discover(&[tmp.path().to_path_buf()]).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.is_none());
    }

    #[test]
    fn test_fingerprint_input_ignores_cache_toggles() {
        let base = Config::default();
        let toggled = Config {
            recache: true,
            cache_save: false,
            multithreading: false,
            ..Config::default()
        };
        assert_eq!(base.fingerprint_input(), toggled.fingerprint_input());

        let piped = Config {
            pipe: true,
            show_errors: true,
            separator: " | ".to_string(),
            key_color: "1;34".to_string(),
            ..Config::default()
        };
        assert_eq!(base.fingerprint_input(), piped.fingerprint_input());

        let reformatted = Config {
            percent_type: 1,
            ..Config::default()
        };
        assert_ne!(base.fingerprint_input(), reformatted.fingerprint_input());

        let with_option = Config {
            cli_options: vec![("Theme-format".to_string(), "{1}".to_string())],
            ..Config::default()
        };
        assert_ne!(base.fingerprint_input(), with_option.fingerprint_input());
    }
}
