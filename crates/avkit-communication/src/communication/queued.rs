//! Command-queue pacing decorator
//!
//! Many AV devices choke when commands arrive back-to-back: matrix switchers
//! that need inter-command gaps, displays that answer one request at a time,
//! codecs that want an explicit go-ahead between commands.
//! [`QueuedTransport`] wraps any inner transport with an outbound FIFO and
//! one of three pacing policies, while presenting the same [`Transport`]
//! contract so callers cannot tell the difference.
//!
//! Ordering is guaranteed; delivery is not. A send the inner transport
//! rejects is traced and dropped, never requeued, and the queue keeps moving
//! under its pacing policy.

use avkit_core::{thread_safe, thread_safe_rw, Result, ThreadSafe, ThreadSafeRw, TransportError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::communication::scheduler::ScheduledTask;
use crate::communication::{Connectable, ConnectionState, Transport, TransportListener};

/// Policy governing when the next queued message may be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PacingMode {
    /// A recurring timer sends the queue head every `timer_delay_ms`,
    /// regardless of responses.
    #[default]
    DelayInterval,
    /// Send the head, then wait for a response (or `response_timeout_ms`)
    /// before sending the next. A timeout still advances the queue so a
    /// device that silently drops a reply cannot stall it.
    AdvanceOnResponse,
    /// `send` only enqueues; each message goes out on an explicit
    /// [`QueuedTransport::advance_queue`] call.
    ManualAdvance,
}

/// Configuration for a [`QueuedTransport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedTransportConfig {
    /// Pacing policy, fixed at construction.
    pub mode: PacingMode,
    /// Inter-send gap for `DelayInterval` mode, in milliseconds.
    pub timer_delay_ms: u64,
    /// Response wait for `AdvanceOnResponse` mode, in milliseconds.
    pub response_timeout_ms: u64,
    /// Connect the inner transport when a send arrives while it is
    /// `NotConnected`; the queue drains once the connection succeeds.
    pub auto_connect: bool,
    /// Disconnect the inner transport after a period with no sends and no
    /// responses.
    pub auto_disconnect: bool,
    /// Idle period before auto-disconnect, in milliseconds.
    pub auto_disconnect_delay_ms: u64,
}

impl Default for QueuedTransportConfig {
    fn default() -> Self {
        Self {
            mode: PacingMode::DelayInterval,
            timer_delay_ms: 250,
            response_timeout_ms: 3000,
            auto_connect: false,
            auto_disconnect: false,
            auto_disconnect_delay_ms: 30_000,
        }
    }
}

impl QueuedTransportConfig {
    fn validate(&self) -> Result<()> {
        if self.mode == PacingMode::DelayInterval && self.timer_delay_ms == 0 {
            return Err(TransportError::InvalidConfig {
                reason: "timer_delay_ms must be non-zero in DelayInterval mode".to_string(),
            }
            .into());
        }
        if self.mode == PacingMode::AdvanceOnResponse && self.response_timeout_ms == 0 {
            return Err(TransportError::InvalidConfig {
                reason: "response_timeout_ms must be non-zero in AdvanceOnResponse mode".to_string(),
            }
            .into());
        }
        if self.auto_disconnect && self.auto_disconnect_delay_ms == 0 {
            return Err(TransportError::InvalidConfig {
                reason: "auto_disconnect_delay_ms must be non-zero when auto_disconnect is set"
                    .to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Queue state shared between callers, the pacing timer, and the inner
/// transport's callbacks. Everything that must stay consistent lives behind
/// one mutex: the FIFO itself, the in-flight flag for `AdvanceOnResponse`,
/// and whether the `DelayInterval` timer is armed.
#[derive(Default)]
struct QueueState {
    queue: VecDeque<String>,
    awaiting_response: bool,
    pacing_armed: bool,
}

/// Cloneable bundle of everything the timers and the inner-transport
/// listener need to drive the queue.
#[derive(Clone)]
struct QueueDriver {
    config: QueuedTransportConfig,
    inner: ThreadSafeRw<Arc<dyn Transport>>,
    state: ThreadSafe<QueueState>,
    outer: ThreadSafeRw<Option<Arc<dyn TransportListener>>>,
    pacing_timer: Arc<ScheduledTask>,
    idle_timer: Arc<ScheduledTask>,
}

impl QueueDriver {
    fn inner_transport(&self) -> Arc<dyn Transport> {
        self.inner.read().clone()
    }

    /// Arm the recurring `DelayInterval` timer. The tick disarms itself when
    /// it finds the queue empty.
    fn arm_pacing(&self) {
        let delay = Duration::from_millis(self.config.timer_delay_ms);
        let driver = self.clone();
        self.pacing_timer
            .schedule_repeating(delay, delay, move || driver.delay_tick());
    }

    fn delay_tick(&self) -> bool {
        let message = {
            let mut state = self.state.lock();
            match state.queue.pop_front() {
                Some(message) => message,
                None => {
                    state.pacing_armed = false;
                    return false;
                }
            }
        };
        // Lock released before sending so a synchronous response callback
        // cannot deadlock against the queue.
        if self.inner_transport().send(&message) {
            self.touch_idle();
        } else {
            tracing::warn!(
                "{}",
                TransportError::SendRejected {
                    reason: "inner transport refused paced send, not requeued".to_string(),
                }
            );
        }
        true
    }

    /// `AdvanceOnResponse`: send the head and arm the response timeout.
    /// No-op while a command is already in flight or the queue is empty.
    fn dispatch_next(&self) {
        let message = {
            let mut state = self.state.lock();
            if state.awaiting_response {
                return;
            }
            let Some(message) = state.queue.pop_front() else {
                return;
            };
            state.awaiting_response = true;

            // Armed under the same lock that set the in-flight flag, so a
            // response racing the send below cannot observe a stale timer.
            let timeout_ms = self.config.response_timeout_ms;
            let driver = self.clone();
            self.pacing_timer
                .schedule_once(Duration::from_millis(timeout_ms), move || {
                    // The late reply, if it ever arrives, will be attributed
                    // to the next command; forward progress wins over
                    // correlation.
                    tracing::warn!("no response within {}ms, advancing queue", timeout_ms);
                    driver.state.lock().awaiting_response = false;
                    driver.dispatch_next();
                });
            message
        };

        if self.inner_transport().send(&message) {
            self.touch_idle();
        } else {
            tracing::warn!(
                "{}",
                TransportError::SendRejected {
                    reason: "inner transport refused queue head, not requeued".to_string(),
                }
            );
        }
    }

    /// `ManualAdvance` (and on-connect draining): send the head and remove
    /// it from the queue.
    fn dispatch_manual(&self) {
        let message = {
            let mut state = self.state.lock();
            state.queue.pop_front()
        };
        let Some(message) = message else {
            tracing::debug!("advance requested with empty queue");
            return;
        };
        if self.inner_transport().send(&message) {
            self.touch_idle();
        } else {
            tracing::warn!(
                "{}",
                TransportError::SendRejected {
                    reason: "inner transport refused advanced head, not requeued".to_string(),
                }
            );
        }
    }

    /// (Re)arm the idle auto-disconnect timer. Called on every successful
    /// send and every received response, so only a true idle period fires it.
    fn touch_idle(&self) {
        if !self.config.auto_disconnect {
            return;
        }
        let delay_ms = self.config.auto_disconnect_delay_ms;
        let driver = self.clone();
        self.idle_timer
            .schedule_once(Duration::from_millis(delay_ms), move || {
                let inner = driver.inner_transport();
                if inner.connection_state() == ConnectionState::Connected {
                    tracing::debug!("idle for {}ms, disconnecting inner transport", delay_ms);
                    inner.disconnect();
                }
            });
    }

    fn handle_inner_state(&self, state: ConnectionState) {
        match state {
            ConnectionState::NotConnected => {
                // Device-side state after a reconnect is unknown, so queued
                // commands are never replayed across a disconnect.
                {
                    let mut queue_state = self.state.lock();
                    let dropped = queue_state.queue.len();
                    queue_state.queue.clear();
                    queue_state.awaiting_response = false;
                    queue_state.pacing_armed = false;
                    if dropped > 0 {
                        tracing::debug!(
                            "inner transport disconnected, dropping {} queued command(s)",
                            dropped
                        );
                    }
                }
                self.pacing_timer.cancel();
                self.idle_timer.cancel();
            }
            ConnectionState::Connected => match self.config.mode {
                PacingMode::DelayInterval => {
                    let arm = {
                        let mut queue_state = self.state.lock();
                        if !queue_state.queue.is_empty() && !queue_state.pacing_armed {
                            queue_state.pacing_armed = true;
                            true
                        } else {
                            false
                        }
                    };
                    if arm {
                        self.arm_pacing();
                    }
                }
                PacingMode::AdvanceOnResponse => {
                    if self.config.auto_connect {
                        self.dispatch_next();
                    }
                }
                PacingMode::ManualAdvance => {
                    if self.config.auto_connect {
                        self.dispatch_manual();
                    }
                }
            },
            _ => {}
        }

        if let Some(listener) = self.outer.read().clone() {
            listener.on_connection_state(state);
        }
    }

    fn handle_inner_message(&self, message: &str) {
        if let Some(listener) = self.outer.read().clone() {
            listener.on_message(message);
        }

        self.touch_idle();

        if self.config.mode == PacingMode::AdvanceOnResponse {
            let was_awaiting = {
                let mut state = self.state.lock();
                std::mem::take(&mut state.awaiting_response)
            };
            if was_awaiting {
                self.pacing_timer.cancel();
                self.dispatch_next();
            }
        }
    }
}

/// A transport decorator that adds an outbound command queue with pacing.
///
/// Wraps exactly one inner transport, swappable at runtime via
/// [`set_inner`](Self::set_inner). Whenever the inner transport reports
/// `NotConnected` the queue is cleared unconditionally. Dropping the
/// decorator cancels its timers, detaches from the inner transport, and
/// disconnects it.
pub struct QueuedTransport {
    driver: QueueDriver,
}

impl QueuedTransport {
    /// Wrap `inner` with the pacing policy in `config`. Must be created
    /// inside a tokio runtime, which its timers bind to.
    ///
    /// Fails on an inconsistent configuration (zero durations for the
    /// selected mode).
    pub fn new(inner: Arc<dyn Transport>, config: QueuedTransportConfig) -> Result<Self> {
        config.validate()?;
        let driver = QueueDriver {
            config,
            inner: thread_safe_rw(inner.clone()),
            state: thread_safe(QueueState::default()),
            outer: thread_safe_rw(None),
            pacing_timer: Arc::new(ScheduledTask::new()),
            idle_timer: Arc::new(ScheduledTask::new()),
        };
        inner.set_listener(Some(Arc::new(InnerListener {
            driver: driver.clone(),
        })));
        Ok(Self { driver })
    }

    /// Number of messages waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.driver.state.lock().queue.len()
    }

    /// Whether an `AdvanceOnResponse` command is in flight.
    pub fn awaiting_response(&self) -> bool {
        self.driver.state.lock().awaiting_response
    }

    /// Send the queue head and remove it. Only meaningful in
    /// `ManualAdvance` mode; calling it in any other mode is a usage error
    /// that is traced and ignored.
    pub fn advance_queue(&self) {
        if self.driver.config.mode != PacingMode::ManualAdvance {
            tracing::error!(
                "{}, ignoring",
                TransportError::Usage {
                    reason: format!("advance_queue called in {:?} mode", self.driver.config.mode),
                }
            );
            return;
        }
        self.driver.dispatch_manual();
    }

    /// Replace the inner transport.
    ///
    /// The old transport is detached and disconnected, the queue and timers
    /// are reset, and the decorator subscribes to the new transport.
    pub fn set_inner(&self, transport: Arc<dyn Transport>) {
        let old = {
            let mut guard = self.driver.inner.write();
            std::mem::replace(&mut *guard, transport.clone())
        };
        old.set_listener(None);
        old.disconnect();

        {
            let mut state = self.driver.state.lock();
            state.queue.clear();
            state.awaiting_response = false;
            state.pacing_armed = false;
        }
        self.driver.pacing_timer.cancel();
        self.driver.idle_timer.cancel();

        transport.set_listener(Some(Arc::new(InnerListener {
            driver: self.driver.clone(),
        })));
    }

    /// Cancel timers, detach from the inner transport, disconnect it, and
    /// drop any queued messages. Safe to call repeatedly; also runs on drop.
    pub fn shutdown(&self) {
        self.driver.pacing_timer.cancel();
        self.driver.idle_timer.cancel();

        let inner = self.driver.inner_transport();
        inner.set_listener(None);
        inner.disconnect();

        let mut state = self.driver.state.lock();
        state.queue.clear();
        state.awaiting_response = false;
        state.pacing_armed = false;
    }
}

impl Drop for QueuedTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Connectable for QueuedTransport {
    fn connection_state(&self) -> ConnectionState {
        self.driver.inner_transport().connection_state()
    }

    fn connect(&self) {
        self.driver.inner_transport().connect();
    }
}

impl Transport for QueuedTransport {
    fn disconnect(&self) {
        self.driver.inner_transport().disconnect();
    }

    fn send(&self, message: &str) -> bool {
        let inner = self.driver.inner_transport();

        self.driver
            .state
            .lock()
            .queue
            .push_back(message.to_string());

        if self.driver.config.auto_connect
            && inner.connection_state() == ConnectionState::NotConnected
        {
            tracing::debug!("send while not connected, auto-connecting inner transport");
            inner.connect();
        }

        match self.driver.config.mode {
            PacingMode::DelayInterval => {
                if inner.connection_state() == ConnectionState::Connected {
                    let arm = {
                        let mut state = self.driver.state.lock();
                        if state.pacing_armed {
                            false
                        } else {
                            state.pacing_armed = true;
                            true
                        }
                    };
                    if arm {
                        self.driver.arm_pacing();
                    }
                }
            }
            PacingMode::AdvanceOnResponse => {
                if inner.connection_state() == ConnectionState::Connected {
                    self.driver.dispatch_next();
                }
            }
            PacingMode::ManualAdvance => {}
        }

        true
    }

    fn set_listener(&self, listener: Option<Arc<dyn TransportListener>>) {
        *self.driver.outer.write() = listener;
    }
}

/// Installed on the inner transport; routes its events into the driver.
struct InnerListener {
    driver: QueueDriver,
}

impl TransportListener for InnerListener {
    fn on_connection_state(&self, state: ConnectionState) {
        self.driver.handle_inner_state(state);
    }

    fn on_message(&self, message: &str) {
        self.driver.handle_inner_message(message);
    }
}
