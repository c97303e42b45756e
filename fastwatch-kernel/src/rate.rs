//! Throughput derivation from cumulative counters
//!
//! A `RateEstimator` keeps the previous sample of one counter and turns the
//! next sample into bytes per second. Only two samples are ever retained.

use tracing::debug;

use crate::models::StatsSnapshot;

#[derive(Debug, Clone)]
pub struct RateEstimator {
    counter_key: String,
    precision: u32,
    baseline: Option<(i64, u64)>, // (last_refresh, counter)
    rate: Option<f64>,
}

impl RateEstimator {
    pub fn new(counter_key: impl Into<String>, precision: u32) -> Self {
        Self {
            counter_key: counter_key.into(),
            precision,
            baseline: None,
            rate: None,
        }
    }

    pub fn counter_key(&self) -> &str {
        &self.counter_key
    }

    /// Last computed rate, without consuming anything.
    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    /// Reads `snapshot` and advances the estimator to it.
    ///
    /// Returns `None` before any snapshot exists and on the first sample.
    /// A snapshot that is not newer than the baseline, or whose counter went
    /// backwards (router reboot), re-baselines and keeps the previous rate.
    pub fn observe(&mut self, snapshot: Option<&StatsSnapshot>) -> Option<f64> {
        let snapshot = snapshot?;
        let Some(counter) = snapshot.counter(&self.counter_key) else {
            debug!("Counter {} missing from snapshot", self.counter_key);
            return self.rate;
        };

        let Some((previous_refresh, previous_counter)) =
            self.baseline.replace((snapshot.last_refresh, counter))
        else {
            return None;
        };

        let elapsed = snapshot.last_refresh - previous_refresh;
        if elapsed <= 0 {
            return self.rate;
        }

        let Some(delta) = counter.checked_sub(previous_counter) else {
            debug!(
                "Counter {} went backwards ({} -> {}), re-baselining",
                self.counter_key, previous_counter, counter
            );
            return self.rate;
        };

        let rate = quantize(delta as f64 / elapsed as f64, self.precision);
        self.rate = Some(rate);
        self.rate
    }
}

fn quantize(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}
