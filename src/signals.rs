//! Terminal teardown when a run is ended by a signal.

use crate::state::TerminalModes;
use futures::future::select_all;
use std::io;
use std::sync::Arc;
use std::thread;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, warn};

/// Signals that end a run early, by name.
pub fn termination_signals() -> [(&'static str, SignalKind); 4] {
    [
        ("SIGINT", SignalKind::interrupt()),
        ("SIGTERM", SignalKind::terminate()),
        ("SIGQUIT", SignalKind::quit()),
        ("SIGHUP", SignalKind::hangup()),
    ]
}

/// Restore `terminal` on the first termination signal, then call `then`
/// with the signal name.
///
/// Handlers are registered before this returns; the wait happens on a
/// dedicated thread.
///
/// # Errors
///
/// If the runtime, a handler, or the thread cannot be created.
pub fn on_termination<F>(terminal: Arc<TerminalModes>, then: F) -> io::Result<()>
where
    F: FnOnce(&'static str) + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let streams = {
        let _guard = runtime.enter();
        termination_signals()
            .into_iter()
            .map(|(name, kind)| signal(kind).map(|stream| (name, stream)))
            .collect::<io::Result<Vec<(&'static str, Signal)>>>()?
    };

    thread::Builder::new()
        .name("hostfetch-signals".to_string())
        .spawn(move || {
            let name = runtime.block_on(first_signal(streams));
            debug!(signal = name, "terminating");
            if let Err(e) = terminal.restore(&mut io::stdout()) {
                warn!(error = %e, "failed to restore terminal modes");
            }
            then(name);
        })?;
    Ok(())
}

async fn first_signal(streams: Vec<(&'static str, Signal)>) -> &'static str {
    let waits = streams.into_iter().map(|(name, mut stream)| {
        Box::pin(async move {
            stream.recv().await;
            name
        })
    });
    select_all(waits).await.0
}
