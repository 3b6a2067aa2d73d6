//! Ctrl-C watcher
//!
//! The first interrupt stops the topology cooperatively. A second one exits
//! the process, for sources that do not honour `stop`.
//!
//! Signal handling needs a reactor, so the watcher drives a current-thread
//! tokio runtime on its own thread. It is cancelled when the topology has
//! drained.

use std::io;
use std::thread::{self, JoinHandle};

use tokio_util::sync::CancellationToken;

use crate::topology::StopHandle;

/// Exit status after a forced second interrupt (128 + SIGINT)
const FORCED_EXIT_CODE: i32 = 130;

/// Running interrupt watcher
pub(crate) struct InterruptWatcher {
    token: CancellationToken,
    thread: JoinHandle<()>,
}

impl InterruptWatcher {
    /// Spawn the watcher thread
    pub(crate) fn spawn(handle: StopHandle) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let token = CancellationToken::new();
        let cancelled = token.clone();

        let thread = thread::Builder::new()
            .name("sluice-interrupt".into())
            .spawn(move || {
                runtime.block_on(watch(handle, cancelled));
            })?;

        Ok(Self { token, thread })
    }

    /// Stop watching and wait for the thread
    pub(crate) fn shutdown(self) {
        self.token.cancel();
        if self.thread.join().is_err() {
            tracing::warn!("interrupt watcher panicked");
        }
    }
}

async fn watch(handle: StopHandle, cancelled: CancellationToken) {
    let mut interrupts = 0u32;
    loop {
        tokio::select! {
            _ = cancelled.cancelled() => return,
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "cannot listen for interrupts");
                    return;
                }
                interrupts += 1;
                if interrupts == 1 {
                    tracing::info!("interrupt received, draining (interrupt again to exit)");
                    handle.stop();
                } else {
                    tracing::warn!("second interrupt, exiting without draining");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
        }
    }
}
