//! Narrow repository interfaces the engine reads and writes through.

use async_trait::async_trait;

use fieldgate_types::{
    DatapointRecord, DatasourceRecord, GatewayRecord, OutboxRecord, Protocol, Tag,
};

use crate::StoreError;

/// A device's raw poll period as stored in configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DevicePeriod {
    pub device_id: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
}

impl DevicePeriod {
    pub fn new(device_id: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            value: Some(value),
            unit: Some(unit.into()),
        }
    }
}

/// Read-only access to device, register, gateway and tag configuration.
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Every device of `protocol` with its configured poll period.
    async fn device_periods(&self, protocol: Protocol) -> Result<Vec<DevicePeriod>, StoreError>;

    /// Ids of the registers owned by a device, in id order.
    async fn registers_for_device(
        &self,
        protocol: Protocol,
        device_id: &str,
    ) -> Result<Vec<String>, StoreError>;

    async fn datapoint(
        &self,
        protocol: Protocol,
        register_id: &str,
    ) -> Result<Option<DatapointRecord>, StoreError>;

    async fn datasource(
        &self,
        protocol: Protocol,
        device_id: &str,
    ) -> Result<Option<DatasourceRecord>, StoreError>;

    async fn gateway(&self, gateway_id: &str) -> Result<Option<GatewayRecord>, StoreError>;

    async fn device_tags(&self, device_id: &str) -> Result<Vec<Tag>, StoreError>;

    async fn register_tags(&self, register_id: &str) -> Result<Vec<Tag>, StoreError>;
}

/// Durable queue of documents waiting for broker delivery.
///
/// Each method commits before returning.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Insert an undelivered record and return its id.
    async fn enqueue(&self, content: &str) -> Result<i64, StoreError>;

    /// All undelivered records, oldest first.
    async fn pending(&self) -> Result<Vec<OutboxRecord>, StoreError>;

    /// Delete a record. Returns whether it existed.
    async fn remove(&self, id: i64) -> Result<bool, StoreError>;
}
