//! Key-addressed disk cache of rendered values.
//!
//! One flat file per key lives in the program's cache directory; its content
//! is the already-rendered display string. Every I/O failure degrades to a
//! miss (on read) or a no-op (on write) and is only logged at `debug` level.
//!
//! The whole tree is invalidated at once by [`CacheStore::validate`], which
//! compares a stored fingerprint against the current one.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Bumped whenever the meaning of cached values changes.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// File holding the fingerprint the cache was written under.
const FINGERPRINT_FILE: &str = ".fingerprint";

/// When the cache is read and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Ignore existing entries; every lookup misses.
    pub recache: bool,
    /// Persist freshly rendered values.
    pub save: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            recache: false,
            save: true,
        }
    }
}

/// Fingerprint of everything that influences rendered values.
///
/// `config` is the canonical serialization of the effective configuration.
pub fn fingerprint(config: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(CACHE_SCHEMA_VERSION.to_le_bytes());
    hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
    hasher.update([0u8]);
    hasher.update(config.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The disk cache.
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    policy: CachePolicy,
    ready: OnceLock<bool>,
}

impl CacheStore {
    /// A store rooted at `dir`. Nothing is created until first use.
    pub fn new(dir: impl Into<PathBuf>, policy: CachePolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
            ready: OnceLock::new(),
        }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The active policy.
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Create the directory on first call; later calls return the memoized
    /// outcome.
    fn ensure_dir(&self) -> bool {
        *self.ready.get_or_init(|| match create_cache_dir(&self.dir) {
            Ok(()) => true,
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "cache directory unavailable");
                false
            }
        })
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        // Keys are flat file names
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            debug!(key, "rejecting cache key");
            return None;
        }
        Some(self.dir.join(key))
    }

    /// The cached value for `key`, if there is a usable one.
    ///
    /// Misses when recache mode is on, or the entry is missing, unreadable
    /// or empty after trimming trailing whitespace.
    pub fn lookup(&self, key: &str) -> Option<String> {
        if self.policy.recache {
            return None;
        }
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => {
                let value = content.trim_end();
                if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!(key, error = %e, "cache read failed");
                }
                None
            }
        }
    }

    /// Persist `value` under `key`. A no-op when saving is disabled.
    ///
    /// A failed write removes whatever part of the file was written.
    pub fn store(&self, key: &str, value: &str) {
        if !self.policy.save || !self.ensure_dir() {
            return;
        }
        let Some(path) = self.entry_path(key) else {
            return;
        };
        if let Err(e) = write_entry(&path, value) {
            debug!(key, error = %e, "cache write failed");
            let _ = fs::remove_file(&path);
        }
    }

    /// Remove the entry for `key`, if any.
    pub fn remove(&self, key: &str) {
        if !self.policy.save {
            return;
        }
        if let Some(path) = self.entry_path(key) {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => debug!(key, error = %e, "cache remove failed"),
            }
        }
    }

    /// Compare the stored fingerprint with `current` and clear the whole
    /// cache on mismatch. Returns `true` if the cache was cleared.
    ///
    /// Call once near startup, and not at all in recache mode.
    pub fn validate(&self, current: &str) -> bool {
        self.validate_with(current, remove_entry)
    }

    fn validate_with(&self, current: &str, remove: fn(&Path) -> io::Result<()>) -> bool {
        if !self.ensure_dir() {
            return false;
        }
        let marker = self.dir.join(FINGERPRINT_FILE);
        let stored = fs::read_to_string(&marker).unwrap_or_default();
        if stored.trim_end() == current {
            return false;
        }

        debug!(dir = %self.dir.display(), "cache fingerprint changed, clearing cache");
        if let Err(e) = clear_dir(&self.dir, remove) {
            // Stale entries may survive; leave no marker so the next run retries
            debug!(error = %e, "failed to clear cache directory");
            let _ = fs::remove_file(&marker);
            return true;
        }
        if let Err(e) = write_entry(&marker, current) {
            debug!(error = %e, "failed to write cache fingerprint");
            let _ = fs::remove_file(&marker);
        }
        true
    }
}

fn create_cache_dir(dir: &Path) -> io::Result<()> {
    if let Some(parent) = dir.parent() {
        if !parent.as_os_str().is_empty() {
            let mut builder = fs::DirBuilder::new();
            builder.recursive(true);
            set_dir_mode(&mut builder, 0o755);
            builder.create(parent)?;
        }
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    set_dir_mode(&mut builder, 0o700);
    builder.create(dir)
}

/// Remove everything in `dir`, continuing past failures.
///
/// Returns the first error once every entry has been attempted.
fn clear_dir(dir: &Path, remove: fn(&Path) -> io::Result<()>) -> io::Result<()> {
    let mut first_error = None;
    for entry in fs::read_dir(dir)? {
        let removed = entry.and_then(|entry| remove(&entry.path()));
        if let Err(e) = removed {
            debug!(error = %e, "failed to remove cache entry");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn remove_entry(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn write_entry(path: &Path, value: &str) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    set_file_mode(&mut options, 0o600);
    let mut file = options.open(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

#[cfg(unix)]
fn set_dir_mode(builder: &mut fs::DirBuilder, mode: u32) {
    use std::os::unix::fs::DirBuilderExt;
    builder.mode(mode);
}

#[cfg(not(unix))]
fn set_dir_mode(_builder: &mut fs::DirBuilder, _mode: u32) {}

#[cfg(unix)]
fn set_file_mode(options: &mut fs::OpenOptions, mode: u32) {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(mode);
}

#[cfg(not(unix))]
fn set_file_mode(_options: &mut fs::OpenOptions, _mode: u32) {}
