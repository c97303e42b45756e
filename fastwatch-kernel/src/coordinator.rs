//! Refresh coordinator
//!
//! Runs one bounded poll cycle against the router and publishes the result:
//! - login / fetch hosts / fetch counters, always followed by logout
//! - host reconciliation (known hosts flip inactive, fetched hosts are active)
//! - atomic replacement of the stats snapshot
//!
//! A failed cycle leaves the previously published hosts and stats untouched.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::{default_metrics, FastConfig};
use crate::device::{DeviceApi, DeviceError};
use crate::models::{Host, HostMap, StatsSnapshot};
use crate::state::Published;

pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of `last_refresh` timestamps, in unix seconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("Error communicating with API: timed out after {0:?}")]
    Timeout(Duration),
    #[error("Error communicating with API: {0}")]
    Authentication(#[source] DeviceError),
    #[error("Error communicating with API: {0}")]
    Fetch(#[source] DeviceError),
    #[error("Error communicating with API: counter '{0}' missing from response")]
    MissingMetric(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPhase {
    Idle,
    Authenticating,
    Fetching,
    Reconciling,
    Publishing,
    Failed,
}

struct Fetched {
    hosts: Vec<Host>,
    counters: BTreeMap<String, u64>,
}

pub struct Coordinator<C> {
    name: String,
    /// Held for a whole cycle, so two cycles never share the session.
    client: tokio::sync::Mutex<C>,
    metric_paths: BTreeMap<String, String>,
    timeout: Duration,
    host_retention: Option<Duration>,
    clock: Clock,
    hosts: Published<HostMap>,
    last_seen: Mutex<HashMap<String, i64>>,
    stats: Published<Option<StatsSnapshot>>,
    phase: Mutex<RefreshPhase>,
    last_update_success: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl<C: DeviceApi> Coordinator<C> {
    pub fn new(name: impl Into<String>, client: C) -> Self {
        Self {
            name: name.into(),
            client: tokio::sync::Mutex::new(client),
            metric_paths: default_metrics(),
            timeout: DEFAULT_REFRESH_TIMEOUT,
            host_retention: None,
            clock: Arc::new(|| chrono::Utc::now().timestamp()),
            hosts: Published::default(),
            last_seen: Mutex::new(HashMap::new()),
            stats: Published::new(None),
            phase: Mutex::new(RefreshPhase::Idle),
            last_update_success: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    pub fn from_config(client: C, config: &FastConfig) -> Self {
        Self::new(config.name.clone(), client)
            .with_metric_paths(config.metrics.clone())
            .with_timeout(config.refresh_timeout())
            .with_host_retention(config.host_retention())
    }

    pub fn with_metric_paths(mut self, paths: BTreeMap<String, String>) -> Self {
        self.metric_paths = paths;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_host_retention(mut self, retention: Option<Duration>) -> Self {
        self.host_retention = retention;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hosts(&self) -> Arc<HostMap> {
        self.hosts.load()
    }

    /// Latest published snapshot; `None` until the first successful cycle.
    pub fn stats(&self) -> Arc<Option<StatsSnapshot>> {
        self.stats.load()
    }

    pub fn phase(&self) -> RefreshPhase {
        *self.phase.lock()
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Runs one poll cycle. Waits for an in-flight cycle to finish first.
    ///
    /// Login and fetch share the refresh timeout; logout then gets its own
    /// timeout of the same length, so one cycle takes at most twice the
    /// timeout (plus the wait for an in-flight cycle).
    pub async fn refresh(&self) -> Result<Arc<HostMap>, RefreshError> {
        let mut client = self.client.lock().await;
        let result = self.run_cycle(&mut *client).await;
        drop(client);

        match &result {
            Ok(hosts) => {
                let active = hosts.values().filter(|h| h.active).count();
                info!("[{}] refresh done: {} hosts ({} active)", self.name, hosts.len(), active);
                self.last_update_success.store(true, Ordering::Relaxed);
                *self.last_error.lock() = None;
            }
            Err(e) => {
                error!("[{}] refresh failed: {}", self.name, e);
                self.set_phase(RefreshPhase::Failed);
                self.last_update_success.store(false, Ordering::Relaxed);
                *self.last_error.lock() = Some(e.to_string());
            }
        }
        self.set_phase(RefreshPhase::Idle);
        result
    }

    async fn run_cycle(&self, client: &mut C) -> Result<Arc<HostMap>, RefreshError> {
        let fetched = match timeout(self.timeout, self.fetch(client)).await {
            Ok(fetched) => fetched,
            Err(_) => Err(RefreshError::Timeout(self.timeout)),
        };
        self.release(client).await;
        let fetched = fetched?;

        let now = (self.clock)();

        self.set_phase(RefreshPhase::Reconciling);
        let hosts = self.reconcile(fetched.hosts, now);

        self.set_phase(RefreshPhase::Publishing);
        self.hosts.store(hosts);
        self.stats.store(Some(StatsSnapshot::new(fetched.counters, now)));

        Ok(self.hosts.load())
    }

    async fn fetch(&self, client: &mut C) -> Result<Fetched, RefreshError> {
        self.set_phase(RefreshPhase::Authenticating);
        client.login().await.map_err(RefreshError::Authentication)?;

        self.set_phase(RefreshPhase::Fetching);
        let hosts = client.get_hosts(true).await.map_err(RefreshError::Fetch)?;
        let mut values = client
            .get_metric_values(&self.metric_paths)
            .await
            .map_err(RefreshError::Fetch)?;

        let mut counters = BTreeMap::new();
        for key in self.metric_paths.keys() {
            let value = values
                .remove(key)
                .ok_or_else(|| RefreshError::MissingMetric(key.clone()))?;
            counters.insert(key.clone(), value);
        }

        debug!("[{}] fetched {} hosts, {} counters", self.name, hosts.len(), counters.len());
        Ok(Fetched { hosts, counters })
    }

    /// Logout runs on every exit path, bounded by its own timeout.
    async fn release(&self, client: &mut C) {
        match timeout(self.timeout, client.logout()).await {
            Ok(Ok(())) => debug!("[{}] session released", self.name),
            Ok(Err(e)) => warn!("[{}] logout failed: {}", self.name, e),
            Err(_) => warn!("[{}] logout timed out after {:?}", self.name, self.timeout),
        }
    }

    fn reconcile(&self, fetched: Vec<Host>, now: i64) -> HostMap {
        let mut hosts: HostMap = (*self.hosts.load()).clone();
        for host in hosts.values_mut() {
            host.active = false;
        }

        let mut last_seen = self.last_seen.lock();
        for mut host in fetched {
            host.active = true;
            last_seen.insert(host.id.clone(), now);
            hosts.insert(host.id.clone(), host);
        }

        if let Some(retention) = self.host_retention {
            let retention = i64::try_from(retention.as_secs()).unwrap_or(i64::MAX);
            let cutoff = now.saturating_sub(retention);
            hosts.retain(|id, host| {
                let keep = host.active || last_seen.get(id).is_some_and(|seen| *seen >= cutoff);
                if !keep {
                    debug!(
                        "[{}] pruning host {} ({}), inactive past retention",
                        self.name,
                        host.display_name(),
                        id
                    );
                }
                keep
            });
            last_seen.retain(|id, _| hosts.contains_key(id));
        }

        hosts
    }

    fn set_phase(&self, phase: RefreshPhase) {
        let mut current = self.phase.lock();
        if *current != phase {
            debug!("[{}] {:?} -> {:?}", self.name, *current, phase);
            *current = phase;
        }
    }
}

impl<C: DeviceApi + 'static> Coordinator<C> {
    /// Drives `refresh()` every `interval`. Cycles run one after another and
    /// ticks missed while a cycle runs are skipped; failures wait for the next tick.
    pub fn spawn_refresh_loop(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        info!("[{}] starting refresh loop (every {:?})", coordinator.name, interval);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                // errors are already logged and recorded by refresh()
                let _ = coordinator.refresh().await;
            }
        })
    }
}
