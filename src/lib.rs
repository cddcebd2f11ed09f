//! # hostfetch
//!
//! System information fetching built from independent detection modules.
//!
//! Each module detects one kind of fact (displays, brightness, themes, ...)
//! and is printed through a shared pipeline: optional disk cache, a small
//! `{N}` template language for labels and values, and a JSON mode for
//! scripting. Slow subsystems are probed on background threads while the
//! pipeline runs; a module blocks only on the one result it needs.
//!
//! ## Features
//!
//! - [`format`]: the template engine and percentage helpers
//! - [`CacheStore`]: flat-file cache with fingerprint invalidation
//! - [`Detector`] / [`Module`]: the module contract and the print pipeline
//! - [`Registry`]: the ordered set of modules driven by the binary
//! - [`Background`]: detached background probes with per-subsystem joins
//!
//! ## Example
//!
//! ```rust,no_run
//! use hostfetch::{Background, CachePolicy, CacheStore, Config, Context, ProbeEnv, ProcessState, Registry};
//!
//! let state = ProcessState::from_env().expect("home directory");
//! let config = Config::default();
//! let background = Background::start(ProbeEnv::from_state(&state), config.multithreading);
//! let cache = CacheStore::new(state.cache_dir.clone(), CachePolicy::default());
//! let ctx = Context {
//!     state: &state,
//!     config: &config,
//!     cache: &cache,
//!     background: &background,
//! };
//!
//! Registry::new()
//!     .print_all(&ctx, &mut std::io::stdout())
//!     .expect("stdout");
//! ```

pub mod background;
pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod module;
pub mod modules;
pub mod options;
pub mod process;
pub mod registry;
pub mod signals;
pub mod state;

pub use background::{Background, ProbeEnv};
pub use cache::{CachePolicy, CacheStore};
pub use config::Config;
pub use error::{ConfigError, FormatError, ModuleFailure, OptionError, ProcessError, StateError};
pub use format::{render, FormatArg, Rendered};
pub use module::{Context, Detector, Module};
pub use options::ModuleArgs;
pub use registry::{ModuleKind, Registry};
pub use state::{ProcessState, TerminalModes};
