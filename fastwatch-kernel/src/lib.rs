//! fastwatch kernel - router polling for Sagemcom F@st gateways
//!
//! Polls the gateway on a fixed interval and keeps:
//! - the inventory of connected devices (hosts are never forgotten, only marked inactive)
//! - the latest WAN byte counters, stamped with the poll time
//! - per-counter throughput derived from two consecutive polls
//!
//! The router's session protocol is behind the `DeviceApi` trait.

pub mod config;
pub mod coordinator;
pub mod device;
pub mod models;
pub mod rate;
pub mod sensor;
pub mod state;

pub use config::{load_config, FastConfig};
pub use coordinator::{Clock, Coordinator, RefreshError, RefreshPhase};
pub use device::{DeviceApi, DeviceError};
pub use models::{Host, HostMap, StatsSnapshot, BYTES_RECEIVED, BYTES_SENT};
pub use rate::RateEstimator;
pub use sensor::{build_sensors, RateSensor, SensorDescription, SENSOR_TYPES};
