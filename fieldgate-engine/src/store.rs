//! SQLite implementation of the repository ports.
//!
//! The configuration tables belong to the configuration service and are
//! only read here. The `OUTBOX` table is created by this crate's
//! migrations.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use fieldgate_types::{
    DatapointRecord, DatasourceRecord, GatewayRecord, OutboxRecord, Protocol, Tag,
};

use crate::ports::{ConfigRepository, DevicePeriod, OutboxStore};
use crate::StoreError;

/// Table and column names that differ between protocols.
struct ProtocolTables {
    devices: &'static str,
    points: &'static str,
    period_value: &'static str,
    period_unit: &'static str,
    address: &'static str,
}

const fn tables(protocol: Protocol) -> ProtocolTables {
    match protocol {
        Protocol::Modbus => ProtocolTables {
            devices: "EQP_MODBUS_IP",
            points: "DP_MODBUS_IP",
            period_value: "updatePeriods",
            period_unit: "updatePeriodType",
            address: "offset",
        },
        Protocol::Dnp3 => ProtocolTables {
            devices: "EQP_DNP3",
            points: "DP_DNP3",
            period_value: "rbePollPeriods",
            period_unit: "eventsPeriodType",
            address: "index",
        },
    }
}

#[derive(Debug, FromRow)]
struct PeriodRow {
    device_id: String,
    period_value: Option<f64>,
    period_unit: Option<String>,
}

#[derive(Debug, FromRow)]
struct GatewayRow {
    gateway_id: String,
    substation: Option<String>,
    region: Option<String>,
    host: Option<String>,
    status: Option<bool>,
}

#[derive(Debug, FromRow)]
struct DatasourceRow {
    device_id: String,
    gateway_id: Option<String>,
    manufacturer: Option<String>,
    brand: Option<String>,
    model: Option<String>,
    device_type: Option<String>,
    sap_id: Option<String>,
    host: Option<String>,
    enabled: Option<bool>,
}

#[derive(Debug, FromRow)]
struct DatapointRow {
    register_id: String,
    device_id: Option<String>,
    address: Option<i64>,
    name: Option<String>,
    kind: Option<String>,
    classification: Option<String>,
    enabled: Option<bool>,
}

#[derive(Debug, FromRow)]
struct TagRow {
    name: Option<String>,
    value: Option<String>,
}

#[derive(Debug, FromRow)]
struct OutboxRow {
    id: i64,
    content: String,
    delivered: bool,
}

/// Repository over a SQLite database.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// A private in-memory database on a single long-lived connection.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the tables owned by the engine.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn device_periods_internal(&self, protocol: Protocol) -> Result<Vec<DevicePeriod>, StoreError> {
        let t = tables(protocol);
        let sql = format!(
            r#"SELECT xid_equip AS device_id,
                      CAST("{value}" AS REAL) AS period_value,
                      "{unit}" AS period_unit
               FROM {devices}
               WHERE xid_equip IS NOT NULL
               ORDER BY xid_equip"#,
            value = t.period_value,
            unit = t.period_unit,
            devices = t.devices,
        );

        let rows: Vec<PeriodRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| DevicePeriod {
                device_id: row.device_id,
                value: row.period_value,
                unit: row.period_unit,
            })
            .collect())
    }

    async fn registers_for_device_internal(
        &self,
        protocol: Protocol,
        device_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let sql = format!(
            "SELECT xid_sensor FROM {} WHERE xid_equip = ? AND xid_sensor IS NOT NULL ORDER BY xid_sensor",
            tables(protocol).points
        );

        let ids = sqlx::query_scalar::<_, String>(&sql)
            .bind(device_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn datapoint_internal(
        &self,
        protocol: Protocol,
        register_id: &str,
    ) -> Result<Option<DatapointRecord>, StoreError> {
        let t = tables(protocol);
        let sql = format!(
            r#"SELECT xid_sensor AS register_id,
                      xid_equip AS device_id,
                      "{address}" AS address,
                      nome AS name,
                      tipo AS kind,
                      classificacao AS classification,
                      enabled
               FROM {points}
               WHERE xid_sensor = ?
               LIMIT 1"#,
            address = t.address,
            points = t.points,
        );

        let row: Option<DatapointRow> = sqlx::query_as(&sql)
            .bind(register_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| DatapointRecord {
            register_id: r.register_id,
            device_id: r.device_id,
            address: r.address,
            name: r.name,
            kind: r.kind,
            classification: r.classification,
            enabled: r.enabled,
        }))
    }

    async fn datasource_internal(
        &self,
        protocol: Protocol,
        device_id: &str,
    ) -> Result<Option<DatasourceRecord>, StoreError> {
        let sql = format!(
            r#"SELECT xid_equip AS device_id,
                      xid_gateway AS gateway_id,
                      fabricante AS manufacturer,
                      marca AS brand,
                      modelo AS model,
                      type AS device_type,
                      sap_id,
                      host,
                      enabled
               FROM {}
               WHERE xid_equip = ?
               LIMIT 1"#,
            tables(protocol).devices
        );

        let row: Option<DatasourceRow> = sqlx::query_as(&sql)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| DatasourceRecord {
            device_id: r.device_id,
            gateway_id: r.gateway_id,
            manufacturer: r.manufacturer,
            brand: r.brand,
            model: r.model,
            device_type: r.device_type,
            sap_id: r.sap_id,
            host: r.host,
            enabled: r.enabled,
        }))
    }

    async fn gateway_internal(&self, gateway_id: &str) -> Result<Option<GatewayRecord>, StoreError> {
        let row: Option<GatewayRow> = sqlx::query_as(
            r#"SELECT xid_gateway AS gateway_id,
                      subestacao AS substation,
                      regional AS region,
                      host,
                      status
               FROM CMA_GD
               WHERE xid_gateway = ?
               LIMIT 1"#,
        )
        .bind(gateway_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| GatewayRecord {
            gateway_id: r.gateway_id,
            substation: r.substation,
            region: r.region,
            host: r.host,
            status: r.status,
        }))
    }

    async fn tags_internal(&self, sql: &str, owner_id: &str) -> Result<Vec<Tag>, StoreError> {
        let rows: Vec<TagRow> = sqlx::query_as(sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| Tag {
                name: r.name,
                value: r.value,
            })
            .collect())
    }

    async fn enqueue_internal(&self, content: &str) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("INSERT INTO OUTBOX (content, delivered) VALUES (?, 0)")
            .bind(content)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    async fn pending_internal(&self) -> Result<Vec<OutboxRecord>, StoreError> {
        let rows: Vec<OutboxRow> =
            sqlx::query_as("SELECT id, content, delivered FROM OUTBOX WHERE delivered = 0 ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|r| OutboxRecord {
                id: r.id,
                content: r.content,
                delivered: r.delivered,
            })
            .collect())
    }

    async fn remove_internal(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM OUTBOX WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ConfigRepository for SqliteStore {
    async fn device_periods(&self, protocol: Protocol) -> Result<Vec<DevicePeriod>, StoreError> {
        self.device_periods_internal(protocol).await
    }

    async fn registers_for_device(
        &self,
        protocol: Protocol,
        device_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        self.registers_for_device_internal(protocol, device_id).await
    }

    async fn datapoint(
        &self,
        protocol: Protocol,
        register_id: &str,
    ) -> Result<Option<DatapointRecord>, StoreError> {
        self.datapoint_internal(protocol, register_id).await
    }

    async fn datasource(
        &self,
        protocol: Protocol,
        device_id: &str,
    ) -> Result<Option<DatasourceRecord>, StoreError> {
        self.datasource_internal(protocol, device_id).await
    }

    async fn gateway(&self, gateway_id: &str) -> Result<Option<GatewayRecord>, StoreError> {
        self.gateway_internal(gateway_id).await
    }

    async fn device_tags(&self, device_id: &str) -> Result<Vec<Tag>, StoreError> {
        self.tags_internal(
            "SELECT nome AS name, valor AS value FROM EQP_TAGS WHERE xid_equip = ? ORDER BY id",
            device_id,
        )
        .await
    }

    async fn register_tags(&self, register_id: &str) -> Result<Vec<Tag>, StoreError> {
        self.tags_internal(
            "SELECT nome AS name, valor AS value FROM DP_TAGS WHERE xid_sensor = ? ORDER BY id",
            register_id,
        )
        .await
    }
}

#[async_trait]
impl OutboxStore for SqliteStore {
    async fn enqueue(&self, content: &str) -> Result<i64, StoreError> {
        self.enqueue_internal(content).await
    }

    async fn pending(&self) -> Result<Vec<OutboxRecord>, StoreError> {
        self.pending_internal().await
    }

    async fn remove(&self, id: i64) -> Result<bool, StoreError> {
        self.remove_internal(id).await
    }
}
