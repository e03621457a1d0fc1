//! Periodic stale-person sweep running beside the detection loop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};
use log::{debug, warn};
use parking_lot::Mutex;

use crate::error::Error;
use crate::tracker::CountingEngine;

/// Engine handle shared by the detection loop and the cleanup sweep. Both
/// take the same lock, which serializes every mutation.
pub type SharedEngine = Arc<Mutex<CountingEngine>>;

pub fn shared(engine: CountingEngine) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}

/// Millisecond time source for the sweep. Must agree with the timestamps
/// passed to `process_detections`.
pub trait Clock: Send + 'static {
    fn now_ms(&self) -> u64;
}

impl<F> Clock for F
where
    F: Fn() -> u64 + Send + 'static,
{
    fn now_ms(&self) -> u64 {
        self()
    }
}

/// Milliseconds elapsed since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Background thread calling `cleanup_stale` every `cleanup_interval_ms`.
///
/// The interval is read from the engine before every wait, so a
/// `set_config` takes effect after the wait in progress. Stops when `stop`
/// is called or the task is dropped.
pub struct CleanupTask {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CleanupTask {
    pub fn spawn(engine: SharedEngine, clock: impl Clock) -> Result<Self, Error> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("linecount-cleanup".into())
            .spawn(move || {
                loop {
                    let interval = current_interval(&engine);
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let now = clock.now_ms();
                            let removed = engine.lock().cleanup_stale(now);
                            if removed > 0 {
                                debug!("cleanup at {now}ms removed {removed} people");
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Signal the sweep to stop and wait for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("cleanup thread panicked");
            }
        }
    }
}

fn current_interval(engine: &SharedEngine) -> Duration {
    Duration::from_millis(engine.lock().config().cleanup_interval_ms)
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}
