mod common;

use avkit_communication::{Connectable, ConnectionState, ConnectionWatchdog, ConnectionWatchdogConfig};
use common::MockTransport;
use std::time::Duration;

fn fast_config() -> ConnectionWatchdogConfig {
    ConnectionWatchdogConfig {
        start_delay_ms: 20,
        poll_interval_ms: 30,
    }
}

#[tokio::test]
async fn test_reconnects_disconnected_components() {
    let down_a = MockTransport::new_unconnectable();
    let down_b = MockTransport::new_unconnectable();
    let up = MockTransport::new();
    up.set_state(ConnectionState::Connected);

    let watchdog = ConnectionWatchdog::new(fast_config());
    watchdog.add(down_a.clone());
    watchdog.add(down_b.clone());
    watchdog.add(up.clone());
    assert_eq!(watchdog.component_count(), 3);

    watchdog.start();
    assert!(watchdog.is_running());

    tokio::time::sleep(Duration::from_millis(400)).await;

    // Each disconnected component gets retried across passes; the healthy
    // one is left alone.
    assert!(down_a.connect_calls() >= 2, "got {}", down_a.connect_calls());
    assert!(down_b.connect_calls() >= 2, "got {}", down_b.connect_calls());
    assert_eq!(up.connect_calls(), 0);

    watchdog.stop();
}

#[tokio::test]
async fn test_start_with_no_components_is_noop() {
    let watchdog = ConnectionWatchdog::new(fast_config());
    watchdog.start();
    assert!(!watchdog.is_running());
}

#[tokio::test]
async fn test_add_while_running() {
    let first = MockTransport::new_unconnectable();

    let watchdog = ConnectionWatchdog::new(fast_config());
    watchdog.add(first.clone());
    watchdog.start();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let late = MockTransport::new_unconnectable();
    watchdog.add(late.clone());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(late.connect_calls() >= 1, "got {}", late.connect_calls());

    watchdog.stop();
}

#[tokio::test]
async fn test_stop_halts_checking() {
    let down = MockTransport::new_unconnectable();

    let watchdog = ConnectionWatchdog::new(fast_config());
    watchdog.add(down.clone());
    watchdog.start();

    tokio::time::sleep(Duration::from_millis(150)).await;
    watchdog.stop();
    watchdog.stop(); // repeated stop is a no-op
    assert!(!watchdog.is_running());

    let calls_at_stop = down.connect_calls();
    assert!(calls_at_stop >= 1);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(down.connect_calls(), calls_at_stop);
}

#[tokio::test]
async fn test_successful_reconnect_ends_retries() {
    let flaky = MockTransport::new();

    let watchdog = ConnectionWatchdog::new(fast_config());
    watchdog.add(flaky.clone());
    watchdog.start();

    tokio::time::sleep(Duration::from_millis(200)).await;

    // First visit connected it; later passes see Connected and skip it.
    assert_eq!(flaky.connect_calls(), 1);
    assert_eq!(flaky.connection_state(), ConnectionState::Connected);

    watchdog.stop();
}
