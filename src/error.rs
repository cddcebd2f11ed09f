//! Error types shared by every component.
//!
//! Errors here are always local to one module's pipeline iteration, with the
//! exception of [`StateError`], which is raised while building the
//! process-wide state and is fatal at startup.

use std::path::PathBuf;
use thiserror::Error;

/// Why a module produced no value.
///
/// A module either returns a non-empty result sequence or fails with one of
/// these. Both variants are rendered the same way (a message after the
/// module's label) and both are hidden unless error display is enabled.
///
/// # Example
///
/// ```rust
/// use hostfetch::ModuleFailure;
///
/// let failure = ModuleFailure::NoResult;
/// assert_eq!(failure.description(), "No result is detected.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ModuleFailure {
    /// The detector reported an error message.
    #[error("{0}")]
    Detection(String),

    /// Detection ran to completion but found nothing to report.
    #[error("No result is detected.")]
    NoResult,
}

impl ModuleFailure {
    /// Shorthand for a detector-reported message.
    pub fn detection(message: impl Into<String>) -> Self {
        Self::Detection(message.into())
    }

    /// Human-readable description, as printed after the module label.
    pub fn description(&self) -> &str {
        match self {
            Self::Detection(message) => message,
            Self::NoResult => "No result is detected.",
        }
    }
}

/// Malformed input reaching the Format Engine.
///
/// These never abort the run: the pipeline logs them and renders an empty
/// value for the affected slot.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum FormatError {
    /// `max == min`, so no percentage can be computed.
    #[error("degenerate percentage range: min {min} equals max {max}")]
    DegenerateRange {
        /// Lower bound of the range.
        min: f64,
        /// Upper bound of the range.
        max: f64,
    },

    /// The computation produced NaN or an infinity.
    #[error("percentage is not a finite number")]
    NotFinite,
}

/// A module option that could not be applied.
///
/// Reported as a warning; the rest of the configuration is still applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum OptionError {
    /// The key does not belong to any known option of the module.
    #[error("{module}: unknown option key `{key}`")]
    UnknownKey {
        /// Module whose block contained the key.
        module: String,
        /// The offending key.
        key: String,
    },

    /// The key is known but the value has the wrong shape.
    #[error("{module}: invalid value `{value}` for `{key}`, expected {expected}")]
    InvalidValue {
        /// Module that owns the option.
        module: String,
        /// Option key as given by the user.
        key: String,
        /// The rejected value, rendered as text.
        value: String,
        /// What the option accepts.
        expected: &'static str,
    },

    /// A JSON module block without a usable `type` field.
    #[error("module block has no valid `type` field")]
    MissingType,

    /// A JSON module block naming a module that does not exist.
    #[error("unknown module `{0}`")]
    UnknownModule(String),

    /// A command-line module option no module claimed.
    #[error("no module accepts option `{0}`")]
    UnclaimedKey(String),
}

/// Failures while constructing the process-wide state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StateError {
    /// Neither `$HOME` nor the password database yielded a home directory.
    #[error("could not determine the home directory of the current user")]
    NoHomeDirectory,
}

/// Failures while loading a configuration file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for the configuration schema.
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Failures running an external command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProcessError {
    /// The program is not on `PATH`.
    #[error("command not found: {0}")]
    NotFound(String),

    /// The program did not finish within the allowed time.
    #[error("command timed out after {0} ms")]
    Timeout(u64),

    /// The program exists but may not be executed.
    #[error("permission denied")]
    PermissionDenied,

    /// Spawning or waiting failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The program exited unsuccessfully.
    #[error("command exited with status {}", .code.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    Failed {
        /// Exit code, if the program was not killed by a signal.
        code: Option<i32>,
    },

    /// Output was not valid UTF-8.
    #[error("command output is not valid UTF-8")]
    NotUtf8,
}
