/*!
Mock device client for development without a router

Implements `DeviceApi` from scripted data. Records every call so tests can
assert on the login/fetch/logout bracket, and can inject failures or delays
on any step.
*/

use async_trait::async_trait;
use fastwatch_kernel::{DeviceApi, DeviceError, Host};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCall {
    Login,
    Logout,
    GetHosts { only_active: bool },
    GetMetricValues,
}

/// Step of the cycle a failure or delay is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Login,
    Logout,
    Hosts,
    Metrics,
}

#[derive(Default)]
struct MockState {
    calls: Vec<DeviceCall>,
    hosts: Vec<Host>,
    counters: HashMap<String, u64>,
    failures: HashMap<Step, String>,
    delays: HashMap<Step, Duration>,
    logged_in: bool,
    ignore_active_filter: bool,
}

/// Mock router client. Clones share state, so a test keeps one handle while
/// the coordinator owns another.
#[derive(Clone, Default)]
pub struct MockDeviceClient {
    state: Arc<Mutex<MockState>>,
}

impl MockDeviceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hosts returned by the next fetches (all of them are reported active)
    pub fn set_hosts(&self, hosts: Vec<Host>) {
        self.state.lock().hosts = hosts;
    }

    /// Makes `get_hosts` return every stored host regardless of `only_active`,
    /// like firmware that ignores the filter and echoes stale entries.
    pub fn ignore_active_filter(&self, ignore: bool) {
        self.state.lock().ignore_active_filter = ignore;
    }

    pub fn set_counter(&self, key: &str, value: u64) {
        self.state.lock().counters.insert(key.to_string(), value);
    }

    pub fn remove_counter(&self, key: &str) {
        self.state.lock().counters.remove(key);
    }

    /// Makes `step` fail until `recover` is called
    pub fn fail(&self, step: Step, message: &str) {
        self.state.lock().failures.insert(step, message.to_string());
    }

    pub fn recover(&self, step: Step) {
        self.state.lock().failures.remove(&step);
    }

    /// Makes `step` sleep before answering
    pub fn delay(&self, step: Step, duration: Duration) {
        self.state.lock().delays.insert(step, duration);
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, call: DeviceCall) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == call).count()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.lock().logged_in
    }

    /// Clears recorded calls, keeps scripted data
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    async fn enter(&self, call: DeviceCall, step: Step) -> Result<(), String> {
        let delay = {
            let mut state = self.state.lock();
            state.calls.push(call);
            state.delays.get(&step).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.state.lock().failures.get(&step) {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DeviceApi for MockDeviceClient {
    async fn login(&mut self) -> Result<(), DeviceError> {
        self.enter(DeviceCall::Login, Step::Login)
            .await
            .map_err(DeviceError::Authentication)?;
        self.state.lock().logged_in = true;
        tracing::debug!("[MOCK] login");
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), DeviceError> {
        self.state.lock().logged_in = false;
        self.enter(DeviceCall::Logout, Step::Logout)
            .await
            .map_err(DeviceError::Request)?;
        tracing::debug!("[MOCK] logout");
        Ok(())
    }

    async fn get_hosts(&mut self, only_active: bool) -> Result<Vec<Host>, DeviceError> {
        self.enter(DeviceCall::GetHosts { only_active }, Step::Hosts)
            .await
            .map_err(DeviceError::Request)?;

        let state = self.state.lock();
        let filter = only_active && !state.ignore_active_filter;
        Ok(state
            .hosts
            .iter()
            .filter(|h| !filter || h.active)
            .cloned()
            .collect())
    }

    async fn get_metric_values(
        &mut self,
        paths: &BTreeMap<String, String>,
    ) -> Result<HashMap<String, u64>, DeviceError> {
        self.enter(DeviceCall::GetMetricValues, Step::Metrics)
            .await
            .map_err(DeviceError::Request)?;

        let state = self.state.lock();
        Ok(paths
            .keys()
            .filter_map(|key| state.counters.get(key).map(|v| (key.clone(), *v)))
            .collect())
    }
}

/// Builders for host entries shaped like the router's host table
pub struct HostFixture;

impl HostFixture {
    pub fn host(id: &str) -> Host {
        Host::new(format!("Device/Hosts/Hosts/Host[@uid='{id}']"))
    }

    pub fn named(id: &str, name: &str, mac: &str, ip: &str) -> Host {
        let mut host = Self::host(id);
        host.host_name = Some(name.to_string());
        host.phys_address = Some(mac.to_string());
        host.ip_address = Some(ip.to_string());
        host.interface_type = Some("802.11".to_string());
        host
    }

    /// `count` hosts with sequential ids, MACs and addresses
    pub fn lan(count: usize) -> Vec<Host> {
        (1..=count)
            .map(|i| {
                Self::named(
                    &i.to_string(),
                    &format!("host-{i}"),
                    &format!("aa:bb:cc:dd:ee:{i:02x}"),
                    &format!("192.168.1.{}", 10 + i),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastwatch_kernel::BYTES_RECEIVED;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let handle = MockDeviceClient::new();
        let mut client = handle.clone();

        client.login().await.unwrap();
        client.get_hosts(true).await.unwrap();
        client.logout().await.unwrap();

        assert_eq!(
            handle.calls(),
            vec![DeviceCall::Login, DeviceCall::GetHosts { only_active: true }, DeviceCall::Logout]
        );
        assert!(!handle.is_logged_in());
    }

    #[tokio::test]
    async fn test_injected_failure_and_recovery() {
        let handle = MockDeviceClient::new();
        let mut client = handle.clone();

        handle.fail(Step::Login, "bad password");
        let err = client.login().await.unwrap_err();
        assert!(matches!(err, DeviceError::Authentication(ref m) if m == "bad password"));

        handle.recover(Step::Login);
        assert!(client.login().await.is_ok());
        assert!(handle.is_logged_in());
    }

    #[tokio::test]
    async fn test_metric_values_only_for_known_keys() {
        let handle = MockDeviceClient::new();
        let mut client = handle.clone();
        handle.set_counter(BYTES_RECEIVED, 42);

        let paths = BTreeMap::from([
            (BYTES_RECEIVED.to_string(), "Device/IP/.../BytesReceived".to_string()),
            ("unknown".to_string(), "Device/Nowhere".to_string()),
        ]);
        let values = client.get_metric_values(&paths).await.unwrap();

        assert_eq!(values.len(), 1);
        assert_eq!(values[BYTES_RECEIVED], 42);
    }

    #[tokio::test]
    async fn test_active_filter_can_be_ignored() {
        let handle = MockDeviceClient::new();
        let mut client = handle.clone();
        let mut hosts = HostFixture::lan(2);
        hosts[1].active = false;
        handle.set_hosts(hosts);

        assert_eq!(client.get_hosts(true).await.unwrap().len(), 1);

        handle.ignore_active_filter(true);
        let all = client.get_hosts(true).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(!all[1].active);
    }

    #[test]
    fn test_lan_fixture() {
        let hosts = HostFixture::lan(3);
        assert_eq!(hosts.len(), 3);
        assert_eq!(hosts[2].phys_address.as_deref(), Some("aa:bb:cc:dd:ee:03"));
        assert!(hosts.iter().all(|h| h.active));
    }
}
