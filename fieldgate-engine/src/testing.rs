//! In-memory fakes for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use fieldgate_adapters::{AdapterError, Broker, ValueSource};
use fieldgate_types::{
    DatapointRecord, DatasourceRecord, GatewayRecord, OutboxRecord, Protocol, Tag,
};
use parking_lot::Mutex;
use serde_json::Value;

use crate::ports::{ConfigRepository, DevicePeriod, OutboxStore};
use crate::StoreError;

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolClosed)
}

#[derive(Default)]
pub struct MemoryConfig {
    pub periods: Mutex<HashMap<Protocol, Vec<DevicePeriod>>>,
    pub registers: Mutex<HashMap<(Protocol, String), Vec<String>>>,
    pub datapoints: Mutex<HashMap<(Protocol, String), DatapointRecord>>,
    pub datasources: Mutex<HashMap<(Protocol, String), DatasourceRecord>>,
    pub gateways: Mutex<HashMap<String, GatewayRecord>>,
    pub device_tags: Mutex<HashMap<String, Vec<Tag>>>,
    pub register_tags: Mutex<HashMap<String, Vec<Tag>>>,
    pub failing: AtomicBool,
    pub register_reads: AtomicUsize,
}

impl MemoryConfig {
    pub fn set_periods(&self, protocol: Protocol, periods: Vec<DevicePeriod>) {
        self.periods.lock().insert(protocol, periods);
    }

    pub fn set_registers(&self, protocol: Protocol, device_id: &str, registers: &[&str]) {
        self.registers.lock().insert(
            (protocol, device_id.to_string()),
            registers.iter().map(|r| r.to_string()).collect(),
        );
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ConfigRepository for MemoryConfig {
    async fn device_periods(&self, protocol: Protocol) -> Result<Vec<DevicePeriod>, StoreError> {
        self.check()?;
        Ok(self.periods.lock().get(&protocol).cloned().unwrap_or_default())
    }

    async fn registers_for_device(
        &self,
        protocol: Protocol,
        device_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        self.check()?;
        self.register_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .registers
            .lock()
            .get(&(protocol, device_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn datapoint(
        &self,
        protocol: Protocol,
        register_id: &str,
    ) -> Result<Option<DatapointRecord>, StoreError> {
        self.check()?;
        Ok(self
            .datapoints
            .lock()
            .get(&(protocol, register_id.to_string()))
            .cloned())
    }

    async fn datasource(
        &self,
        protocol: Protocol,
        device_id: &str,
    ) -> Result<Option<DatasourceRecord>, StoreError> {
        self.check()?;
        Ok(self
            .datasources
            .lock()
            .get(&(protocol, device_id.to_string()))
            .cloned())
    }

    async fn gateway(&self, gateway_id: &str) -> Result<Option<GatewayRecord>, StoreError> {
        self.check()?;
        Ok(self.gateways.lock().get(gateway_id).cloned())
    }

    async fn device_tags(&self, device_id: &str) -> Result<Vec<Tag>, StoreError> {
        self.check()?;
        Ok(self.device_tags.lock().get(device_id).cloned().unwrap_or_default())
    }

    async fn register_tags(&self, register_id: &str) -> Result<Vec<Tag>, StoreError> {
        self.check()?;
        Ok(self
            .register_tags
            .lock()
            .get(register_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryOutbox {
    pub records: Mutex<BTreeMap<i64, String>>,
    next_id: AtomicI64,
    pub fail_enqueue: AtomicBool,
    pub fail_remove: AtomicBool,
    pub enqueued: AtomicUsize,
}

impl MemoryOutbox {
    pub fn contents(&self) -> Vec<String> {
        self.records.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }
}

#[async_trait]
impl OutboxStore for MemoryOutbox {
    async fn enqueue(&self, content: &str) -> Result<i64, StoreError> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.records.lock().insert(id, content.to_string());
        self.enqueued.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn pending(&self) -> Result<Vec<OutboxRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .iter()
            .map(|(id, content)| OutboxRecord {
                id: *id,
                content: content.clone(),
                delivered: false,
            })
            .collect())
    }

    async fn remove(&self, id: i64) -> Result<bool, StoreError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.records.lock().remove(&id).is_some())
    }
}

pub struct FakeBroker {
    pub reachable: AtomicBool,
    pub rejects: AtomicBool,
    pub published: Mutex<Vec<String>>,
    pub reach_checks: AtomicUsize,
    pub publish_calls: AtomicUsize,
}

impl FakeBroker {
    pub fn reachable() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            rejects: AtomicBool::new(false),
            published: Mutex::new(Vec::new()),
            reach_checks: AtomicUsize::new(0),
            publish_calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        let broker = Self::reachable();
        broker.reachable.store(false, Ordering::SeqCst);
        broker
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<String> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl Broker for FakeBroker {
    async fn is_reachable(&self) -> bool {
        self.reach_checks.fetch_add(1, Ordering::SeqCst);
        self.reachable.load(Ordering::SeqCst)
    }

    async fn publish(&self, body: &[u8]) -> Result<(), AdapterError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if self.rejects.load(Ordering::SeqCst) {
            return Err(AdapterError::Broker("rejected".to_string()));
        }
        self.published
            .lock()
            .push(String::from_utf8_lossy(body).into_owned());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSource {
    pub values: Mutex<HashMap<String, Value>>,
    pub fetches: AtomicUsize,
    pub reauths: AtomicUsize,
}

impl FakeSource {
    pub fn with_value(register_id: &str, value: Value) -> Self {
        let source = Self::default();
        source.values.lock().insert(register_id.to_string(), value);
        source
    }
}

#[async_trait]
impl ValueSource for FakeSource {
    async fn fetch_value(&self, register_id: &str) -> Option<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.values.lock().get(register_id).cloned()
    }

    async fn reauthenticate(&self) -> bool {
        self.reauths.fetch_add(1, Ordering::SeqCst);
        true
    }
}
