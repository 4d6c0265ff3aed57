#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use fieldgate_adapters::{AdapterError, Broker, ValueSource};
use fieldgate_engine::SqliteStore;
use parking_lot::Mutex;
use serde_json::Value;

const CONFIG_SCHEMA: &str = include_str!("../../fixtures/config_schema.sql");

/// An in-memory store with the outbox migration and a small plant:
/// gateway GW-01, Modbus device D1 with registers S1 and S2, DNP3 device R7.
pub async fn seeded_store() -> SqliteStore {
    let store = SqliteStore::in_memory().await.unwrap();
    store.migrate().await.unwrap();
    sqlx::raw_sql(CONFIG_SCHEMA)
        .execute(store.pool())
        .await
        .unwrap();
    sqlx::raw_sql(
        r#"
        INSERT INTO CMA_GD VALUES ('GW-01', 'SE Norte', 'R1', '10.0.0.2', 1);
        INSERT INTO EQP_MODBUS_IP (xid_equip, xid_gateway, fabricante, type, enabled, updatePeriodType, updatePeriods)
            VALUES ('D1', 'GW-01', 'Acme', 'MODBUS', 1, 'SECONDS', 10);
        INSERT INTO EQP_DNP3 (xid_equip, xid_gateway, enabled, eventsPeriodType, rbePollPeriods)
            VALUES ('R7', 'GW-01', 1, 'MILLISECONDS', 500);
        INSERT INTO DP_MODBUS_IP (xid_sensor, xid_equip, "offset", enabled, nome, tipo, classificacao)
            VALUES ('S1', 'D1', 40001, 1, 'Temperature', 'analog', 'oil'),
                   ('S2', 'D1', 40002, 1, 'Pressure', 'analog', 'oil');
        INSERT INTO DP_DNP3 (xid_sensor, xid_equip, "index", enabled, nome)
            VALUES ('B1', 'R7', 3, 1, 'Breaker');
        INSERT INTO EQP_TAGS (xid_equip, nome, valor) VALUES ('D1', 'bay', '3');
        INSERT INTO DP_TAGS (xid_sensor, nome, valor) VALUES ('S1', 'unit', 'C');
        "#,
    )
    .execute(store.pool())
    .await
    .unwrap();
    store
}

/// Broker that records every accepted body.
pub struct RecordingBroker {
    reachable: AtomicBool,
    published: Mutex<Vec<String>>,
    pub checks: AtomicUsize,
}

impl RecordingBroker {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: AtomicBool::new(reachable),
            published: Mutex::new(Vec::new()),
            checks: AtomicUsize::new(0),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<String> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl Broker for RecordingBroker {
    async fn is_reachable(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.reachable.load(Ordering::SeqCst)
    }

    async fn publish(&self, body: &[u8]) -> Result<(), AdapterError> {
        self.published
            .lock()
            .push(String::from_utf8_lossy(body).into_owned());
        Ok(())
    }
}

/// Source answering from a fixed table of values.
#[derive(Default)]
pub struct StaticSource {
    values: HashMap<String, Value>,
    pub fetches: AtomicUsize,
}

impl StaticSource {
    pub fn with(mut self, register_id: &str, value: Value) -> Self {
        self.values.insert(register_id.to_string(), value);
        self
    }
}

#[async_trait]
impl ValueSource for StaticSource {
    async fn fetch_value(&self, register_id: &str) -> Option<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.values.get(register_id).cloned()
    }
}
