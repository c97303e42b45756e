//! Throughput sensors exposed to the display layer
//!
//! One `RateSensor` per tracked counter. Each owns its estimator and reads the
//! coordinator's latest snapshot whenever the display layer asks for a value.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::coordinator::Coordinator;
use crate::device::DeviceApi;
use crate::models::{BYTES_RECEIVED, BYTES_SENT};
use crate::rate::RateEstimator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataRateUnit {
    #[serde(rename = "B/s")]
    BytesPerSecond,
    #[serde(rename = "MB/s")]
    MegabytesPerSecond,
}

impl DataRateUnit {
    pub fn bytes_per_unit(self) -> f64 {
        match self {
            DataRateUnit::BytesPerSecond => 1.0,
            DataRateUnit::MegabytesPerSecond => 1_000_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    DataRate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorDescription {
    /// Unique id of the sensor ("download", "upload")
    pub key: &'static str,
    /// Counter in the stats snapshot the rate is derived from
    pub counter_key: &'static str,
    pub native_unit: DataRateUnit,
    pub suggested_unit: DataRateUnit,
    pub state_class: StateClass,
    pub device_class: DeviceClass,
    pub display_precision: u32,
}

pub const SENSOR_TYPES: [SensorDescription; 2] = [
    SensorDescription {
        key: "download",
        counter_key: BYTES_RECEIVED,
        native_unit: DataRateUnit::BytesPerSecond,
        suggested_unit: DataRateUnit::MegabytesPerSecond,
        state_class: StateClass::Measurement,
        device_class: DeviceClass::DataRate,
        display_precision: 2,
    },
    SensorDescription {
        key: "upload",
        counter_key: BYTES_SENT,
        native_unit: DataRateUnit::BytesPerSecond,
        suggested_unit: DataRateUnit::MegabytesPerSecond,
        state_class: StateClass::Measurement,
        device_class: DeviceClass::DataRate,
        display_precision: 2,
    },
];

pub struct RateSensor<C> {
    description: SensorDescription,
    coordinator: Arc<Coordinator<C>>,
    estimator: RateEstimator,
}

impl<C: DeviceApi> RateSensor<C> {
    pub fn new(coordinator: Arc<Coordinator<C>>, description: SensorDescription) -> Self {
        let estimator = RateEstimator::new(description.counter_key, description.display_precision);
        Self { description, coordinator, estimator }
    }

    pub fn unique_id(&self) -> &str {
        self.description.key
    }

    pub fn description(&self) -> &SensorDescription {
        &self.description
    }

    /// Unavailable only until the coordinator publishes its first snapshot.
    pub fn available(&self) -> bool {
        self.coordinator.stats().is_some()
    }

    /// Current rate in the native unit. Advances the estimator, so each call
    /// that sees a newer snapshot consumes it.
    pub fn native_value(&mut self) -> Option<f64> {
        let stats = self.coordinator.stats();
        self.estimator.observe(stats.as_ref().as_ref())
    }

    /// Last computed rate converted to the suggested unit, without advancing.
    pub fn display_value(&self) -> Option<f64> {
        let factor = self.description.suggested_unit.bytes_per_unit()
            / self.description.native_unit.bytes_per_unit();
        let scale = 10f64.powi(self.description.display_precision as i32);
        self.estimator
            .rate()
            .map(|rate| (rate / factor * scale).round() / scale)
    }

    /// Raw cumulative counter keyed by its stats name, e.g. `{"bytes_received": 12345}`.
    pub fn extra_state_attributes(&self) -> BTreeMap<String, u64> {
        let stats = self.coordinator.stats();
        let counter_key = self.description.counter_key;
        stats
            .as_ref()
            .as_ref()
            .and_then(|snapshot| snapshot.counter(counter_key))
            .map(|value| BTreeMap::from([(counter_key.to_string(), value)]))
            .unwrap_or_default()
    }
}

/// One sensor per entry of `SENSOR_TYPES`, all sharing `coordinator`.
pub fn build_sensors<C: DeviceApi>(coordinator: &Arc<Coordinator<C>>) -> Vec<RateSensor<C>> {
    SENSOR_TYPES
        .iter()
        .cloned()
        .map(|description| RateSensor::new(Arc::clone(coordinator), description))
        .collect()
}
