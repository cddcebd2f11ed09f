//! Process-wide state.
//!
//! [`ProcessState`] is built once at startup and passed by reference to every
//! component that needs it. [`TerminalModes`] is the one piece of it shared
//! with the signal handler, so it is reference counted and only ever touched
//! through atomics.

use crate::error::StateError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sysinfo::System;

/// Directory name used under every config and cache root.
pub const APP_DIR_NAME: &str = "hostfetch";

/// Where sysfs is mounted.
pub const DEFAULT_SYS_ROOT: &str = "/sys";

/// Who is running the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    /// Login name, empty if it could not be determined.
    pub name: String,
    /// Home directory.
    pub home: PathBuf,
}

/// Host facts taken once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    /// Network host name.
    pub hostname: Option<String>,
}

impl HostInfo {
    /// Query the running system.
    pub fn detect() -> Self {
        Self {
            hostname: System::host_name(),
        }
    }
}

/// Everything that is resolved once per process.
#[derive(Debug)]
pub struct ProcessState {
    /// The current user.
    pub user: UserInfo,
    /// Host snapshot.
    pub host: HostInfo,
    /// Ordered, de-duplicated config directory search path.
    pub config_dirs: Vec<PathBuf>,
    /// Cache directory for this program. Not created until first use.
    pub cache_dir: PathBuf,
    /// Root of the sysfs tree hardware detectors read from.
    pub sys_root: PathBuf,
    /// Terminal modes shared with the signal handler.
    pub terminal: Arc<TerminalModes>,
}

impl ProcessState {
    /// Resolve state from the environment of the running process.
    ///
    /// # Errors
    ///
    /// [`StateError::NoHomeDirectory`] if no home directory can be found;
    /// nothing else in the program can work without one.
    pub fn from_env() -> Result<Self, StateError> {
        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        let name = std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .unwrap_or_default();

        let config_dirs = config_search_path(
            &home,
            std::env::var("XDG_CONFIG_HOME").ok().as_deref(),
            std::env::var("XDG_CONFIG_DIRS").ok().as_deref(),
        );
        let cache_dir = cache_dir_path(&home, std::env::var("XDG_CACHE_HOME").ok().as_deref());

        Ok(Self {
            user: UserInfo { name, home },
            host: HostInfo::detect(),
            config_dirs,
            cache_dir,
            sys_root: PathBuf::from(DEFAULT_SYS_ROOT),
            terminal: Arc::new(TerminalModes::default()),
        })
    }

    /// Build state for an explicit home directory, without touching the
    /// environment. Used by tests and embedders.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            config_dirs: config_search_path(&home, None, None),
            cache_dir: cache_dir_path(&home, None),
            sys_root: PathBuf::from(DEFAULT_SYS_ROOT),
            user: UserInfo {
                name: String::new(),
                home,
            },
            host: HostInfo::default(),
            terminal: Arc::new(TerminalModes::default()),
        }
    }
}

/// Config directory search path, most specific first.
///
/// Order: `$XDG_CONFIG_HOME`, `~/.config`, `~`, each `$XDG_CONFIG_DIRS`
/// entry, `/etc/xdg`, `/etc`. Later duplicates are dropped.
pub fn config_search_path(
    home: &Path,
    xdg_config_home: Option<&str>,
    xdg_config_dirs: Option<&str>,
) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(dir) = xdg_config_home.filter(|s| !s.is_empty()) {
        candidates.push(PathBuf::from(dir));
    }
    candidates.push(home.join(".config"));
    candidates.push(home.to_path_buf());

    if let Some(dirs) = xdg_config_dirs {
        candidates.extend(
            dirs.split(':')
                .filter(|entry| !entry.is_empty())
                .map(PathBuf::from),
        );
    }
    candidates.push(PathBuf::from("/etc/xdg"));
    candidates.push(PathBuf::from("/etc"));

    let mut unique: Vec<PathBuf> = Vec::with_capacity(candidates.len());
    for dir in candidates {
        // Compare without trailing separators so "/a/" and "/a" collapse
        let dir: PathBuf = dir.components().collect();
        if !unique.contains(&dir) {
            unique.push(dir);
        }
    }
    unique
}

/// `$XDG_CACHE_HOME/hostfetch`, falling back to `~/.cache/hostfetch`.
pub fn cache_dir_path(home: &Path, xdg_cache_home: Option<&str>) -> PathBuf {
    let root = match xdg_cache_home.filter(|s| !s.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => home.join(".cache"),
    };
    root.join(APP_DIR_NAME)
}

const LINEWRAP_DISABLE: &str = "\x1b[?7l";
const LINEWRAP_ENABLE: &str = "\x1b[?7h";
const CURSOR_HIDE: &str = "\x1b[?25l";
const CURSOR_SHOW: &str = "\x1b[?25h";

/// Line-wrap and cursor modes changed for the duration of a run.
///
/// Both the normal completion path and the signal handler call
/// [`TerminalModes::restore`]. The modes stay marked as applied until the
/// restore sequences have been flushed, so a signal arriving mid-restore
/// still writes them; the sequences are idempotent.
#[derive(Debug, Default)]
pub struct TerminalModes {
    disable_linewrap: AtomicBool,
    hide_cursor: AtomicBool,
    applied: AtomicBool,
}

impl TerminalModes {
    /// Record which modes to change. Call once, before [`Self::apply`].
    pub fn configure(&self, disable_linewrap: bool, hide_cursor: bool) {
        self.disable_linewrap.store(disable_linewrap, Ordering::SeqCst);
        self.hide_cursor.store(hide_cursor, Ordering::SeqCst);
    }

    /// Emit the escape sequences switching the configured modes on.
    pub fn apply(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let linewrap = self.disable_linewrap.load(Ordering::SeqCst);
        let cursor = self.hide_cursor.load(Ordering::SeqCst);
        if !linewrap && !cursor {
            return Ok(());
        }
        self.applied.store(true, Ordering::SeqCst);
        if cursor {
            out.write_all(CURSOR_HIDE.as_bytes())?;
        }
        if linewrap {
            out.write_all(LINEWRAP_DISABLE.as_bytes())?;
        }
        out.flush()
    }

    /// Emit the sequences undoing [`Self::apply`]. No-op once a restore
    /// has been flushed.
    pub fn restore(&self, out: &mut dyn Write) -> std::io::Result<()> {
        if !self.applied.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.disable_linewrap.load(Ordering::SeqCst) {
            out.write_all(LINEWRAP_ENABLE.as_bytes())?;
        }
        if self.hide_cursor.load(Ordering::SeqCst) {
            out.write_all(CURSOR_SHOW.as_bytes())?;
        }
        out.flush()?;
        self.applied.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Whether modes are applied and not yet restored.
    pub fn is_applied(&self) -> bool {
        self.applied.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_search_path_order() {
        let dirs = config_search_path(
            Path::new("/home/u"),
            Some("/xdg/config"),
            Some("/opt/a:/opt/b"),
        );
        let expected: Vec<PathBuf> = [
            "/xdg/config",
            "/home/u/.config",
            "/home/u",
            "/opt/a",
            "/opt/b",
            "/etc/xdg",
            "/etc",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(dirs, expected);
    }

    #[test]
    fn test_config_search_path_deduplicates_keeping_first() {
        let dirs = config_search_path(
            Path::new("/home/u"),
            Some("/home/u/.config/"),
            Some("/etc/xdg::/home/u/.config:/srv"),
        );
        let expected: Vec<PathBuf> = ["/home/u/.config", "/home/u", "/etc/xdg", "/srv", "/etc"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(dirs, expected);
    }

    #[test]
    fn test_config_search_path_ignores_empty_env() {
        let dirs = config_search_path(Path::new("/home/u"), Some(""), Some(""));
        assert_eq!(dirs.first(), Some(&PathBuf::from("/home/u/.config")));
        assert_eq!(dirs.len(), 4);
    }

    #[test]
    fn test_cache_dir_path() {
        assert_eq!(
            cache_dir_path(Path::new("/home/u"), None),
            PathBuf::from("/home/u/.cache/hostfetch")
        );
        assert_eq!(
            cache_dir_path(Path::new("/home/u"), Some("/tmp/c")),
            PathBuf::from("/tmp/c/hostfetch")
        );
        assert_eq!(
            cache_dir_path(Path::new("/home/u"), Some("")),
            PathBuf::from("/home/u/.cache/hostfetch")
        );
    }

    #[test]
    fn test_terminal_modes_apply_and_restore_once() {
        let modes = TerminalModes::default();
        modes.configure(true, true);

        let mut out = Vec::new();
        modes.apply(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\x1b[?25l\x1b[?7l");

        let mut out = Vec::new();
        modes.restore(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\x1b[?7h\x1b[?25h");

        // Second restore (e.g. signal after normal completion) writes nothing
        let mut out = Vec::new();
        modes.restore(&mut out).unwrap();
        assert!(out.is_empty());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_terminal_modes_stay_applied_until_restore_is_written() {
        let modes = TerminalModes::default();
        modes.configure(true, false);
        modes.apply(&mut Vec::new()).unwrap();

        // An interrupted restore leaves the work to the next caller
        assert!(modes.restore(&mut BrokenPipe).is_err());
        assert!(modes.is_applied());

        let mut out = Vec::new();
        modes.restore(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\x1b[?7h");
        assert!(!modes.is_applied());
    }

    #[test]
    fn test_terminal_modes_disabled_writes_nothing() {
        let modes = TerminalModes::default();
        modes.configure(false, false);

        let mut out = Vec::new();
        modes.apply(&mut out).unwrap();
        modes.restore(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_with_home_resolves_paths() {
        let state = ProcessState::with_home("/home/u");
        assert_eq!(state.cache_dir, PathBuf::from("/home/u/.cache/hostfetch"));
        assert_eq!(state.config_dirs[0], PathBuf::from("/home/u/.config"));
    }
}
