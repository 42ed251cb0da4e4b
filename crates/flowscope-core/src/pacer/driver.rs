//! Runs a pacer on the tokio clock.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use super::{Delivery, Pacer};

/// Spawns pacers onto the current tokio runtime.
pub struct PacerDriver;

impl PacerDriver {
    /// Starts `pacer` at the current instant and calls `on_batch` for every
    /// delivery, in order, from a background task.
    ///
    /// Lines pushed into the pacer before spawning are paced from now on.
    /// Must be called from within a tokio runtime.
    pub fn spawn<P, F>(mut pacer: P, mut on_batch: F) -> PacerHandle
    where
        P: Pacer + 'static,
        F: FnMut(Delivery) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let stopped = Arc::new(Mutex::new(false));
        let gate = Arc::clone(&stopped);

        let task = tokio::spawn(async move {
            let origin = Instant::now();
            let now_ms = || origin.elapsed().as_millis() as u64;
            pacer.start(0);
            let mut closed = false;

            loop {
                // A deadline past the clock's range never fires
                let wake = pacer
                    .next_deadline()
                    .and_then(|ms| origin.checked_add(Duration::from_millis(ms)));
                if closed && wake.is_none() {
                    break;
                }

                let deliveries = tokio::select! {
                    line = rx.recv(), if !closed => match line {
                        Some(line) => pacer.push(line, now_ms()),
                        None => {
                            closed = true;
                            Vec::new()
                        }
                    },
                    () = sleep_until(wake.unwrap_or(origin)), if wake.is_some() => {
                        pacer.poll(now_ms())
                    }
                };
                if !deliver(&gate, deliveries, &mut on_batch) {
                    return;
                }
            }
            debug!("Pacer drained");
        });

        PacerHandle {
            tx: Some(tx),
            task,
            stopped,
        }
    }
}

/// Hands `deliveries` to `on_batch` unless the pacer was stopped.
///
/// The gate is held for the whole batch, so once `stop` returns no callback
/// is running and none will start.
fn deliver<F: FnMut(Delivery)>(
    gate: &Mutex<bool>,
    deliveries: Vec<Delivery>,
    on_batch: &mut F,
) -> bool {
    let stopped = gate.lock().unwrap_or_else(PoisonError::into_inner);
    if *stopped {
        return false;
    }
    for delivery in deliveries {
        on_batch(delivery);
    }
    true
}

/// Handle to a running pacer task.
#[derive(Debug)]
pub struct PacerHandle {
    tx: Option<mpsc::UnboundedSender<String>>,
    task: JoinHandle<()>,
    stopped: Arc<Mutex<bool>>,
}

impl PacerHandle {
    /// Queues a line. Returns false once the input is closed or the pacer
    /// has been stopped.
    pub fn push(&self, line: impl Into<String>) -> bool {
        self.tx
            .as_ref()
            .is_some_and(|tx| tx.send(line.into()).is_ok())
    }

    /// Closes the input; the task exits once everything queued was delivered.
    pub fn close(&mut self) {
        self.tx = None;
    }

    /// Cancels the timer task and discards every undelivered line.
    ///
    /// Waits for a batch that is being delivered right now; after that no
    /// further batch reaches the callback.
    pub fn stop(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        if !self.task.is_finished() {
            debug!("Stopping pacer");
        }
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) || self.task.is_finished()
    }

    /// Closes the input and waits until every queued line was delivered.
    pub async fn finish(self) {
        let Self { tx, task, .. } = self;
        drop(tx);
        // An aborted task simply has nothing left to deliver
        let _ = task.await;
    }
}
