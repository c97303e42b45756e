//! Device API seam
//!
//! The router's session protocol and wire client live outside this crate.
//! The coordinator only needs the four calls below; a session is opened and
//! closed inside a single poll cycle.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

use crate::models::Host;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Authentication rejected: {0}")]
    Authentication(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Client for one router. Implementations hold session-wide state, so calls
/// must never interleave between two cycles.
#[async_trait]
pub trait DeviceApi: Send {
    async fn login(&mut self) -> Result<(), DeviceError>;

    /// Must be safe to call after a failed or missing login.
    async fn logout(&mut self) -> Result<(), DeviceError>;

    async fn get_hosts(&mut self, only_active: bool) -> Result<Vec<Host>, DeviceError>;

    /// Resolves each `key -> path` pair to the counter found at `path`.
    async fn get_metric_values(
        &mut self,
        paths: &BTreeMap<String, String>,
    ) -> Result<HashMap<String, u64>, DeviceError>;
}

#[async_trait]
impl<T: DeviceApi + ?Sized> DeviceApi for Box<T> {
    async fn login(&mut self) -> Result<(), DeviceError> {
        (**self).login().await
    }

    async fn logout(&mut self) -> Result<(), DeviceError> {
        (**self).logout().await
    }

    async fn get_hosts(&mut self, only_active: bool) -> Result<Vec<Host>, DeviceError> {
        (**self).get_hosts(only_active).await
    }

    async fn get_metric_values(
        &mut self,
        paths: &BTreeMap<String, String>,
    ) -> Result<HashMap<String, u64>, DeviceError> {
        (**self).get_metric_values(paths).await
    }
}
