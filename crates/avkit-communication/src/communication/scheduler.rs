//! Cancellable scheduled tasks
//!
//! Every timer in the communication layer (pacing, idle auto-disconnect,
//! watchdog polling) goes through `ScheduledTask` so that
//! cancel-then-recreate is a single operation under one lock, never a
//! scattered stop/forget pattern that can double-fire.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// One cancellable timer slot, holding at most one scheduled task at a time.
///
/// Scheduling always aborts whatever was previously in the slot before
/// spawning the replacement. Dropping the slot cancels it. Creation captures
/// the current tokio runtime (and panics outside one, like `tokio::spawn`);
/// scheduling may then happen from any thread, including blocking I/O
/// threads delivering device responses.
pub struct ScheduledTask {
    runtime: Handle,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledTask {
    /// Create an empty slot with nothing scheduled, bound to the current
    /// tokio runtime.
    pub fn new() -> Self {
        Self {
            runtime: Handle::current(),
            handle: Mutex::new(None),
        }
    }

    /// Run `action` once after `delay`, replacing any scheduled task.
    pub fn schedule_once<F>(&self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut guard = self.handle.lock();
        if let Some(old) = guard.take() {
            old.abort();
        }
        *guard = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        }));
    }

    /// Run `tick` after `initial_delay` and then every `interval` until it
    /// returns `false`, replacing any scheduled task.
    pub fn schedule_repeating<F>(&self, initial_delay: Duration, interval: Duration, mut tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let mut guard = self.handle.lock();
        if let Some(old) = guard.take() {
            old.abort();
        }
        *guard = Some(self.runtime.spawn(async move {
            tokio::time::sleep(initial_delay).await;
            loop {
                if !tick() {
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        }));
    }

    /// Cancel whatever is scheduled. Safe to call repeatedly or when empty.
    pub fn cancel(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }

    /// Whether a task is currently scheduled and not yet finished.
    pub fn is_scheduled(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Default for ScheduledTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
