//! Auto-off timer — at most one pending "all off" deadline.
//!
//! A single worker thread owns the deadline slot. Scheduling replaces the
//! deadline in place and wakes the worker; nothing is spawned per request.
//!
//! Cancellation is best effort. If the worker has already taken the deadline
//! and is writing the all-off frame when `cancel` or `schedule_off` runs,
//! that write still completes. An extra all-off is harmless, and a caller
//! that lights an LED afterwards goes through the same bus lock, so the
//! newer frame lands last.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::bus::LedBus;
use crate::error::Result;

#[derive(Debug, Default)]
struct Slot {
    deadline: Option<Instant>,
    fired: u64,
    shutdown: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owned single-slot auto-off timer for one [`LedBus`].
pub struct AutoOff {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl AutoOff {
    /// Start the worker thread.
    pub fn new(bus: Arc<LedBus>) -> Result<Self> {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::default()),
            wake: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("binled-auto-off".into())
            .spawn(move || run_worker(&worker_shared, &bus))?;
        Ok(AutoOff {
            shared,
            worker: Some(worker),
        })
    }

    /// Turn everything off after `after`, replacing any pending deadline. Never blocks
    /// beyond the slot lock.
    pub fn schedule_off(&self, after: Duration) {
        let mut slot = self.shared.lock();
        if slot.deadline.is_some() {
            log::debug!("auto-off: superseding pending deadline");
        }
        slot.deadline = Some(Instant::now() + after);
        self.shared.wake.notify_all();
    }

    /// Drop the pending deadline, if any. Idempotent.
    pub fn cancel(&self) {
        let mut slot = self.shared.lock();
        if slot.deadline.take().is_some() {
            log::debug!("auto-off: cancelled");
            self.shared.wake.notify_all();
        }
    }

    /// Time left on the pending deadline, or `None` if nothing is pending.
    pub fn pending(&self) -> Option<Duration> {
        self.shared
            .lock()
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Number of times the timer has fired.
    pub fn fired(&self) -> u64 {
        self.shared.lock().fired
    }
}

impl Drop for AutoOff {
    fn drop(&mut self) {
        {
            let mut slot = self.shared.lock();
            slot.shutdown = true;
            self.shared.wake.notify_all();
        }
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::warn!("auto-off: worker thread panicked");
        }
    }
}

fn run_worker(shared: &Shared, bus: &LedBus) {
    let mut slot = shared.lock();
    loop {
        if slot.shutdown {
            return;
        }
        match slot.deadline {
            None => {
                slot = shared.wake.wait(slot).unwrap_or_else(PoisonError::into_inner);
            }
            Some(deadline) => {
                let now = Instant::now();
                if now < deadline {
                    slot = shared
                        .wake
                        .wait_timeout(slot, deadline - now)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|e| e.into_inner().0);
                    continue;
                }
                slot.deadline = None;
                slot.fired += 1;
                // Release the slot before touching the bus so scheduling never waits on I/O.
                drop(slot);
                log::debug!("auto-off: firing");
                if let Err(e) = bus.all_off() {
                    log::warn!("auto-off: {e}");
                }
                slot = shared.lock();
            }
        }
    }
}
