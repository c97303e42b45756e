use fastwatch_devkit::{DeviceCall, Step, TestHarness};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_loop_refreshes_on_interval() {
    let harness = TestHarness::new();
    harness.set_traffic(0, 0);

    let handle = harness.coordinator.spawn_refresh_loop(Duration::from_secs(10));
    tokio::time::sleep(Duration::from_secs(25)).await;
    handle.abort();

    // ticks at 0s, 10s and 20s
    assert_eq!(harness.client.count(DeviceCall::Login), 3);
    assert!(harness.coordinator.last_update_success());
    harness.assert_sessions_balanced().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_slow_cycles_skip_ticks_instead_of_overlapping() {
    let harness = TestHarness::new();
    harness.set_traffic(0, 0);
    harness.client.delay(Step::Hosts, Duration::from_secs(5));

    let handle = harness.coordinator.spawn_refresh_loop(Duration::from_secs(2));
    tokio::time::sleep(Duration::from_secs(21)).await;
    handle.abort();

    let calls = harness.client.calls();
    let mut open = false;
    for call in &calls {
        match call {
            DeviceCall::Login => {
                assert!(!open, "second session opened while one was in flight");
                open = true;
            }
            DeviceCall::Logout => open = false,
            _ => assert!(open, "fetch outside a session"),
        }
    }

    let logins = harness.client.count(DeviceCall::Login);
    assert!(logins >= 3 && logins <= 5, "unexpected cycle count {logins}");
}

#[tokio::test(start_paused = true)]
async fn test_loop_keeps_running_after_failures() {
    let harness = TestHarness::new();
    harness.set_traffic(0, 0);
    harness.client.fail(Step::Login, "router rebooting");

    let handle = harness.coordinator.spawn_refresh_loop(Duration::from_secs(10));
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(!harness.coordinator.last_update_success());

    harness.client.recover(Step::Login);
    tokio::time::sleep(Duration::from_secs(10)).await;
    handle.abort();

    assert!(harness.coordinator.last_update_success());
    assert!(harness.coordinator.stats().is_some());
}
