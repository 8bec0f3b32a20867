//! Reconnection watchdog
//!
//! A single timer services every registered component round-robin: each tick
//! examines exactly one component and, if it is `NotConnected`, asks it to
//! connect. One attempt per tick caps reconnection storms on shared network
//! or serial infrastructure; the trade-off is up to `(N-1) * poll_interval`
//! of latency before a given disconnected component gets its turn.

use avkit_core::{thread_safe, ThreadSafe};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::communication::scheduler::ScheduledTask;
use crate::communication::{Connectable, ConnectionState};

/// Configuration for a [`ConnectionWatchdog`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionWatchdogConfig {
    /// Delay before the first check, in milliseconds.
    pub start_delay_ms: u64,
    /// Interval between checks, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ConnectionWatchdogConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: 5000,
            poll_interval_ms: 10_000,
        }
    }
}

struct WatchdogState {
    components: Vec<Arc<dyn Connectable>>,
    cursor: usize,
}

/// Polls registered components and reconnects whichever is currently
/// disconnected, one per tick.
///
/// Connect attempts are fire-and-forget: no backoff, no success
/// confirmation. Components that stay disconnected simply come around again
/// on a later pass.
pub struct ConnectionWatchdog {
    config: ConnectionWatchdogConfig,
    state: ThreadSafe<WatchdogState>,
    task: ScheduledTask,
}

impl ConnectionWatchdog {
    /// Create a watchdog with the given polling configuration. Must be
    /// created inside a tokio runtime, which its timer binds to.
    pub fn new(config: ConnectionWatchdogConfig) -> Self {
        Self {
            config,
            state: thread_safe(WatchdogState {
                components: Vec::new(),
                cursor: 0,
            }),
            task: ScheduledTask::new(),
        }
    }

    /// Register a component for monitoring. Resets the round-robin cursor
    /// so the scan restarts from the front. May be called while running;
    /// the tick recomputes its bounds each time.
    pub fn add(&self, component: Arc<dyn Connectable>) {
        let mut state = self.state.lock();
        state.components.push(component);
        state.cursor = 0;
    }

    /// Number of registered components.
    pub fn component_count(&self) -> usize {
        self.state.lock().components.len()
    }

    /// Begin periodic checking after `start_delay_ms`, repeating every
    /// `poll_interval_ms`. Starting with nothing registered is a traced
    /// warning and a no-op.
    pub fn start(&self) {
        if self.state.lock().components.is_empty() {
            tracing::warn!("watchdog started with no components registered, ignoring");
            return;
        }

        let state = self.state.clone();
        self.task.schedule_repeating(
            Duration::from_millis(self.config.start_delay_ms),
            Duration::from_millis(self.config.poll_interval_ms),
            move || {
                let target = {
                    let mut state = state.lock();
                    if state.components.is_empty() {
                        return true;
                    }
                    let index = state.cursor % state.components.len();
                    state.cursor = (index + 1) % state.components.len();
                    state.components[index].clone()
                };
                // List lock released before touching the component, so a
                // connect that completes synchronously cannot deadlock.
                if target.connection_state() == ConnectionState::NotConnected {
                    tracing::debug!("watchdog reconnecting a disconnected component");
                    target.connect();
                }
                true
            },
        );
    }

    /// Whether the watchdog is currently running.
    pub fn is_running(&self) -> bool {
        self.task.is_scheduled()
    }

    /// Stop checking. Safe to call repeatedly; also runs on drop.
    pub fn stop(&self) {
        self.task.cancel();
    }
}

impl Drop for ConnectionWatchdog {
    fn drop(&mut self) {
        self.stop();
    }
}
