use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const BYTES_RECEIVED: &str = "bytes_received";
pub const BYTES_SENT: &str = "bytes_sent";

/// A device known to the router's host table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    /// Router-side identifier, stable across polls
    pub id: String,
    pub active: bool,
    pub phys_address: Option<String>,  // MAC, "aa:bb:cc:dd:ee:ff"
    pub ip_address: Option<String>,
    pub host_name: Option<String>,
    pub user_friendly_name: Option<String>,
    pub interface_type: Option<String>, // Ethernet, 802.11, ...
    pub detected_device_type: Option<String>,
    /// Remaining vendor fields, kept verbatim
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Host {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: true,
            phys_address: None,
            ip_address: None,
            host_name: None,
            user_friendly_name: None,
            interface_type: None,
            detected_device_type: None,
            extra: HashMap::new(),
        }
    }

    /// Best label for display: user-given name, then DHCP host name, then id.
    pub fn display_name(&self) -> &str {
        self.user_friendly_name
            .as_deref()
            .or(self.host_name.as_deref())
            .unwrap_or(&self.id)
    }
}

pub type HostMap = HashMap<String, Host>;

/// Cumulative counters collected in one poll, stamped with the poll time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub counters: BTreeMap<String, u64>,
    /// Unix seconds at which the poll completed
    pub last_refresh: i64,
}

impl StatsSnapshot {
    pub fn new(counters: BTreeMap<String, u64>, last_refresh: i64) -> Self {
        Self { counters, last_refresh }
    }

    pub fn counter(&self, key: &str) -> Option<u64> {
        self.counters.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallbacks() {
        let mut host = Host::new("Device/Hosts/Host/3");
        assert_eq!(host.display_name(), "Device/Hosts/Host/3");

        host.host_name = Some("android-1f2e".into());
        assert_eq!(host.display_name(), "android-1f2e");

        host.user_friendly_name = Some("Living room TV".into());
        assert_eq!(host.display_name(), "Living room TV");
    }

    #[test]
    fn test_host_keeps_unknown_vendor_fields() {
        let json = serde_json::json!({
            "id": "Device/Hosts/Host/7",
            "active": true,
            "phys_address": "aa:bb:cc:dd:ee:ff",
            "ip_address": "192.168.1.20",
            "host_name": null,
            "user_friendly_name": null,
            "interface_type": "802.11",
            "detected_device_type": null,
            "lease_time_remaining": 3600
        });

        let host: Host = serde_json::from_value(json).unwrap();
        assert_eq!(host.phys_address.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(host.extra["lease_time_remaining"], 3600);
    }

    #[test]
    fn test_snapshot_counter_lookup() {
        let counters = BTreeMap::from([(BYTES_RECEIVED.to_string(), 1000)]);
        let snapshot = StatsSnapshot::new(counters, 1_700_000_000);

        assert_eq!(snapshot.counter(BYTES_RECEIVED), Some(1000));
        assert_eq!(snapshot.counter(BYTES_SENT), None);
    }
}
