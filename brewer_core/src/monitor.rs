//! Background status monitor.
//!
//! Spawns one thread that owns the link's reading half, feeds every status
//! line into the controller and sleeps one tick between reads. The tick
//! sleep waits on a stop channel, so shutdown is observed within a tick and
//! never waits a full period.
//!
//! Each `Monitor` is shut down and joined when dropped, so the thread never
//! outlives its handle.
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use brewer_traits::LineReader;
use crossbeam_channel as xch;

use crate::controller::{OrderController, Transition};
use crate::error::{BrewError, Result};
use crate::hw_error::map_link_error;

pub struct Monitor {
    stop_tx: Option<xch::Sender<()>>,
    running: Arc<AtomicBool>,
    /// Error that made the worker give up, if it did.
    failure: Arc<Mutex<Option<BrewError>>>,
    join_handle: Option<JoinHandle<()>>,
    controller: OrderController,
}

impl OrderController {
    /// Start polling the device through `reader`.
    pub fn spawn_monitor<R: LineReader + Send + 'static>(&self, reader: R) -> Monitor {
        let (stop_tx, stop_rx) = xch::bounded::<()>(1);
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let failure = Arc::new(Mutex::new(None));
        let failure_clone = failure.clone();
        let controller = self.clone();

        let join_handle = std::thread::spawn(move || {
            if let Some(e) = run(&controller, reader, &stop_rx) {
                *failure_clone.lock().unwrap_or_else(PoisonError::into_inner) = Some(e);
            }
            running_clone.store(false, Ordering::Release);
            tracing::trace!("monitor thread exiting cleanly");
        });

        Monitor {
            stop_tx: Some(stop_tx),
            running,
            failure,
            join_handle: Some(join_handle),
            controller: self.clone(),
        }
    }
}

/// Wait up to `d` for a stop request. True means stop.
fn stop_requested(stop_rx: &xch::Receiver<()>, d: std::time::Duration) -> bool {
    !matches!(
        stop_rx.recv_timeout(d),
        Err(xch::RecvTimeoutError::Timeout)
    )
}

fn read_once<R: LineReader>(controller: &OrderController, reader: &mut R) -> Result<Transition> {
    let read_at = controller.generation();
    let timeout = controller.settings().read_timeout;
    let line = reader
        .read_line(timeout)
        .map_err(|e| BrewError::Link(map_link_error(e.as_ref())))?;
    tracing::trace!(line = %line, "status line");
    controller.process_line(&line, Some(read_at))
}

/// Poll until stopped. Returns the error that exhausted the failure limit.
fn run<R: LineReader>(
    controller: &OrderController,
    mut reader: R,
    stop_rx: &xch::Receiver<()>,
) -> Option<BrewError> {
    let settings = controller.settings().clone();
    let mut failures: u32 = 0;
    tracing::debug!(
        tick_ms = settings.tick.as_millis() as u64,
        limit = settings.read_failure_limit,
        "monitor started"
    );
    loop {
        if stop_requested(stop_rx, std::time::Duration::ZERO) {
            tracing::debug!("monitor received shutdown signal");
            break;
        }
        match read_once(controller, &mut reader) {
            Ok(transition) => {
                failures = 0;
                if transition != Transition::None {
                    tracing::debug!(?transition, "order transition");
                }
            }
            Err(e) => {
                let Some(err) = e.downcast_ref::<BrewError>().filter(|b| b.is_read_failure())
                else {
                    tracing::warn!(error = %e, "monitor tick failed; not a link or decode failure");
                    if stop_requested(stop_rx, settings.tick) {
                        break;
                    }
                    continue;
                };
                failures += 1;
                let phase = controller.phase();
                tracing::warn!(
                    error = %e,
                    phase = phase.name(),
                    failures,
                    limit = settings.read_failure_limit,
                    "monitor tick failed"
                );
                if failures >= settings.read_failure_limit {
                    tracing::error!(
                        error = %e,
                        failures,
                        "giving up on the device link; stopping the order"
                    );
                    if let Err(stop_err) = controller.stop_order() {
                        tracing::error!(error = %stop_err, "failed to force the device idle");
                    }
                    controller.close_log();
                    return Some(err.clone());
                }
                if stop_requested(stop_rx, settings.read_failure_backoff) {
                    break;
                }
            }
        }
        if stop_requested(stop_rx, settings.tick) {
            tracing::debug!("monitor received shutdown signal");
            break;
        }
    }
    None
}

impl Monitor {
    /// True until the worker exits (shutdown or escalation after repeated
    /// read failures).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The error that made the worker give up, once it has.
    pub fn failure(&self) -> Option<BrewError> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Signal the worker, wait for it to exit, then close the order log.
    /// Calling it again is a no-op.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.join_handle.take() else {
            return;
        };
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if handle.join().is_err() {
            tracing::warn!("monitor thread panicked");
        }
        self.running.store(false, Ordering::Release);
        self.controller.close_log();
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
