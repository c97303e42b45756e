/*!
Test harness for the refresh coordinator

Wires a `Coordinator` to a `MockDeviceClient` and a manual clock, so tests can
script what the router answers and when each poll completes.
*/

use crate::device_stub::{DeviceCall, MockDeviceClient};
use anyhow::{bail, Result};
use fastwatch_kernel::{Clock, Coordinator, FastConfig, HostMap, RefreshError};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const START_TIME: i64 = 1_700_000_000;

/// Clock whose value only moves when a test says so
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self { now: Arc::new(AtomicI64::new(start)) }
    }

    pub fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    pub fn set(&self, value: i64) {
        self.now.store(value, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn as_clock(&self) -> Clock {
        let now = Arc::clone(&self.now);
        Arc::new(move || now.load(Ordering::SeqCst))
    }
}

pub struct TestHarness {
    pub client: MockDeviceClient,
    pub clock: ManualClock,
    pub coordinator: Arc<Coordinator<MockDeviceClient>>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(FastConfig::default())
    }

    pub fn with_config(config: FastConfig) -> Self {
        init_tracing();

        let client = MockDeviceClient::new();
        let clock = ManualClock::new(START_TIME);
        let coordinator = Coordinator::from_config(client.clone(), &config)
            .with_clock(clock.as_clock());

        Self {
            client,
            clock,
            coordinator: Arc::new(coordinator),
        }
    }

    /// Moves the clock forward `secs` and runs one cycle
    pub async fn refresh_after(&self, secs: i64) -> Result<Arc<HostMap>, RefreshError> {
        self.clock.advance(secs);
        self.coordinator.refresh().await
    }

    /// Scripts both WAN counters in one call
    pub fn set_traffic(&self, received: u64, sent: u64) {
        self.client.set_counter(fastwatch_kernel::BYTES_RECEIVED, received);
        self.client.set_counter(fastwatch_kernel::BYTES_SENT, sent);
    }

    pub fn assert_active(&self, ids: &[&str]) -> Result<()> {
        let hosts = self.coordinator.hosts();
        for id in ids {
            match hosts.get(*id) {
                Some(host) if host.active => {}
                Some(_) => bail!("Host '{}' is inactive", id),
                None => bail!("Host '{}' not in host map", id),
            }
        }
        Ok(())
    }

    pub fn assert_inactive(&self, ids: &[&str]) -> Result<()> {
        let hosts = self.coordinator.hosts();
        for id in ids {
            match hosts.get(*id) {
                Some(host) if !host.active => {}
                Some(_) => bail!("Host '{}' is still active", id),
                None => bail!("Host '{}' not in host map", id),
            }
        }
        Ok(())
    }

    /// Every cycle so far opened and closed exactly one session
    pub fn assert_sessions_balanced(&self) -> Result<()> {
        let logins = self.client.count(DeviceCall::Login);
        let logouts = self.client.count(DeviceCall::Logout);
        if logins != logouts {
            bail!("Unbalanced sessions: {} logins, {} logouts", logins, logouts);
        }
        if self.client.is_logged_in() {
            bail!("Session left open");
        }
        Ok(())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}
