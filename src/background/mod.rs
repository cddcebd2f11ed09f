//! Background detection of slow subsystems.
//!
//! At startup a supervising thread fans out one detached worker per slow
//! subsystem (display server, GTK2/3/4 and Qt settings). Each worker sends its
//! result through a one-shot channel and exits; nobody joins the workers.
//! Consumers block on the one subsystem they need via [`Pending::wait`], so a
//! module depending on the display server never waits for the GTK probes.
//!
//! With multithreading disabled the same probes run synchronously on the
//! calling thread, in the same order, and produce the same values.

mod display_server;
mod toolkit;

pub use display_server::{DisplayOutput, DisplayServer};
pub use toolkit::{GtkVersion, ToolkitSettings};

use crate::state::ProcessState;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// The system state probes read from.
///
/// Captured once so that every probe, in any thread and in either
/// concurrency mode, sees the same inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeEnv {
    /// Home directory.
    pub home: PathBuf,
    /// Root of the sysfs tree, normally `/sys`.
    pub sys_root: PathBuf,
    /// Environment variables.
    pub vars: HashMap<String, String>,
}

impl ProbeEnv {
    /// Capture the environment of the running process.
    pub fn from_state(state: &ProcessState) -> Self {
        Self {
            home: state.user.home.clone(),
            sys_root: state.sys_root.clone(),
            vars: std::env::vars().collect(),
        }
    }

    /// A non-empty environment variable.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// `$XDG_CONFIG_HOME`, falling back to `~/.config`.
    pub fn config_home(&self) -> PathBuf {
        match self.var("XDG_CONFIG_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => self.home.join(".config"),
        }
    }

    /// A path inside the sysfs tree.
    pub fn sys_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.sys_root.join(relative)
    }
}

type Probe<T> = fn(&ProbeEnv) -> T;

enum Slot<T> {
    Waiting(Option<oneshot::Receiver<T>>),
    Ready(Arc<T>),
}

/// The eventual result of one background subsystem.
pub struct Pending<T> {
    slot: Mutex<Slot<T>>,
    probe: Probe<T>,
    env: Arc<ProbeEnv>,
}

impl<T: Send + 'static> Pending<T> {
    fn computed(probe: Probe<T>, env: Arc<ProbeEnv>) -> Self {
        let value = probe(&env);
        Self {
            slot: Mutex::new(Slot::Ready(Arc::new(value))),
            probe,
            env,
        }
    }

    fn channel(probe: Probe<T>, env: Arc<ProbeEnv>) -> (oneshot::Sender<T>, Self) {
        let (tx, rx) = oneshot::channel();
        let pending = Self {
            slot: Mutex::new(Slot::Waiting(Some(rx))),
            probe,
            env,
        };
        (tx, pending)
    }

    /// Block until this subsystem's result is published, then return it.
    ///
    /// If the worker died without publishing, the probe is run on the calling
    /// thread instead.
    pub fn wait(&self) -> Arc<T> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let received = match &mut *slot {
            Slot::Ready(value) => return Arc::clone(value),
            Slot::Waiting(rx) => rx.take().and_then(|rx| rx.blocking_recv().ok()),
        };
        let value = match received {
            Some(value) => Arc::new(value),
            None => {
                warn!("background worker exited without a result, probing inline");
                Arc::new((self.probe)(&self.env))
            }
        };
        *slot = Slot::Ready(Arc::clone(&value));
        value
    }
}

type Job = Box<dyn FnOnce() + Send>;

fn job<T: Send + 'static>(
    name: &'static str,
    probe: Probe<T>,
    env: &Arc<ProbeEnv>,
    tx: oneshot::Sender<T>,
) -> (&'static str, Job) {
    let env = Arc::clone(env);
    let run = move || {
        // The receiver may already be gone when the run is over; that is fine
        let _ = tx.send(probe(&env));
    };
    (name, Box::new(run))
}

/// Whether this platform probes desktop toolkits at all.
const fn probes_toolkits() -> bool {
    cfg!(all(unix, not(target_os = "macos"), not(target_os = "android")))
}

/// Handles to every background subsystem.
pub struct Background {
    display_server: Pending<DisplayServer>,
    gtk2: Pending<ToolkitSettings>,
    gtk3: Pending<ToolkitSettings>,
    gtk4: Pending<ToolkitSettings>,
    qt: Pending<ToolkitSettings>,
}

impl Background {
    /// Start every subsystem probe.
    ///
    /// With `multithreading` the probes run on detached threads and this
    /// returns immediately; otherwise they run here, in order, before
    /// returning.
    pub fn start(env: ProbeEnv, multithreading: bool) -> Self {
        let env = Arc::new(env);

        if !multithreading {
            return Self {
                display_server: Pending::computed(display_server::detect, Arc::clone(&env)),
                gtk2: Pending::computed(toolkit::detect_gtk2, Arc::clone(&env)),
                gtk3: Pending::computed(toolkit::detect_gtk3, Arc::clone(&env)),
                gtk4: Pending::computed(toolkit::detect_gtk4, Arc::clone(&env)),
                qt: Pending::computed(toolkit::detect_qt, env),
            };
        }

        let mut jobs: Vec<(&'static str, Job)> = Vec::with_capacity(5);

        let (tx, display_server) = Pending::channel(display_server::detect, Arc::clone(&env));
        jobs.push(job("display-server", display_server::detect, &env, tx));

        let toolkits: [(&'static str, Probe<ToolkitSettings>); 4] = [
            ("gtk2", toolkit::detect_gtk2),
            ("gtk3", toolkit::detect_gtk3),
            ("gtk4", toolkit::detect_gtk4),
            ("qt", toolkit::detect_qt),
        ];
        let [gtk2, gtk3, gtk4, qt] = toolkits.map(|(name, probe)| {
            if probes_toolkits() {
                let (tx, pending) = Pending::channel(probe, Arc::clone(&env));
                jobs.push(job(name, probe, &env, tx));
                pending
            } else {
                Pending::computed(probe, Arc::clone(&env))
            }
        });

        spawn_supervisor(jobs);

        Self {
            display_server,
            gtk2,
            gtk3,
            gtk4,
            qt,
        }
    }

    /// Display server connection and outputs. Blocks until published.
    pub fn display_server(&self) -> Arc<DisplayServer> {
        self.display_server.wait()
    }

    /// Settings of one GTK major version. Blocks until published.
    pub fn gtk(&self, version: GtkVersion) -> Arc<ToolkitSettings> {
        match version {
            GtkVersion::Gtk2 => self.gtk2.wait(),
            GtkVersion::Gtk3 => self.gtk3.wait(),
            GtkVersion::Gtk4 => self.gtk4.wait(),
        }
    }

    /// Qt / KDE settings. Blocks until published.
    pub fn qt(&self) -> Arc<ToolkitSettings> {
        self.qt.wait()
    }
}

/// Spawn the supervising thread, which spawns one detached worker per job.
///
/// If any spawn fails the job is dropped, which closes its channel; the
/// consumer then probes inline.
fn spawn_supervisor(jobs: Vec<(&'static str, Job)>) {
    let supervisor = thread::Builder::new()
        .name("hostfetch-start".to_string())
        .spawn(move || {
            for (name, run) in jobs {
                let spawned = thread::Builder::new()
                    .name(format!("hostfetch-{name}"))
                    .spawn(run);
                match spawned {
                    Ok(_detached) => debug!(worker = name, "background worker started"),
                    Err(e) => warn!(worker = name, error = %e, "failed to start background worker"),
                }
            }
        });
    if let Err(e) = supervisor {
        warn!(error = %e, "failed to start background supervisor");
    }
}
