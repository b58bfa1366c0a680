//! Background `while_waiting` work between server messages.
//!
//! After every dispatched frame the session hands the logic to a blocking
//! worker that calls [`GameLogic::while_waiting`]. When the next frame
//! arrives, or the connection drops, the worker is cancelled through a
//! [`WaitSignal`] before the session touches the logic again.
//!
//! Cancellation is cooperative. The worker runs on tokio's blocking pool
//! and cannot be aborted; the session signals it and then waits for the
//! logic lock, so a `while_waiting` that never checks its signal holds up
//! dispatch until it returns.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::GameLogic;

/// Tells a running `while_waiting` call that the session needs the logic
/// back.
#[derive(Debug, Clone)]
pub struct WaitSignal {
    rx: watch::Receiver<bool>,
}

impl WaitSignal {
    /// Returns `true` once a new server message is waiting to be
    /// dispatched. Long computations should poll this and return.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// A signal that is never cancelled, for calling `while_waiting`
    /// directly in tests.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // Keeping the value readable does not need a live sender.
        drop(tx);
        Self { rx }
    }
}

/// The currently running worker, if any.
#[derive(Debug, Default)]
pub(crate) struct Waiter {
    current: Option<(watch::Sender<bool>, JoinHandle<()>)>,
}

impl Waiter {
    /// Cancels any previous worker and starts a new one.
    pub(crate) fn spawn<G: GameLogic>(&mut self, logic: Arc<Mutex<G>>) {
        self.cancel();

        let (tx, rx) = watch::channel(false);
        let signal = WaitSignal { rx };
        let handle = tokio::task::spawn_blocking(move || {
            let mut logic = logic.blocking_lock();
            // The next frame may have arrived while we waited for the lock.
            if signal.is_cancelled() {
                return;
            }
            logic.while_waiting(&signal);
        });
        self.current = Some((tx, handle));
    }

    /// Signals the running worker, if any. Does not wait for it.
    pub(crate) fn cancel(&mut self) {
        if let Some((tx, handle)) = self.current.take() {
            tx.send_replace(true);
            if !handle.is_finished() {
                tracing::trace!("while_waiting still running, signalled");
            }
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        self.cancel();
    }
}
