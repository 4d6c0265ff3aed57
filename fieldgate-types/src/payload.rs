//! The document published to the broker for one register reading.
//!
//! A full [`Reading`] serializes as three single-element arrays:
//!
//! ```text
//! {
//!   "data_gateway": [{ "ID", "Subestacao", "Regional", "IP", "Status" }],
//!   "dataSources":  [{ "Equipamento", "Fabricante", "Marca", "Modelo", "Protocolo",
//!                      "SAP_id", "IP", "Status", "tags_equipamento" }],
//!   "dataPoints":   [{ "timestamp", "Sensor", "Valor", "Registrador", "Nome", "Tipo",
//!                      "Classificacao", "Status", "tags_sensor" }]
//! }
//! ```
//!
//! Any field whose configuration lookup found nothing serializes as the
//! [`NO_DATA`] string.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::{DatapointRecord, DatasourceRecord, GatewayRecord, TagSet};

/// Marker written in place of a field whose lookup returned nothing.
pub const NO_DATA: &str = "sem dados";

/// Error tag carried by the reduced error document.
const BUILD_FAILED: &str = "payload_build_failed";

/// A payload field that may be missing from configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Value(T),
    NoData,
}

impl<T> Field<T> {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Field::NoData)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            Field::NoData => None,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Field::NoData, Field::Value)
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Value(v) => v.serialize(serializer),
            Field::NoData => serializer.serialize_str(NO_DATA),
        }
    }
}

fn tags_field(tags: TagSet) -> Field<TagSet> {
    if tags.is_empty() {
        Field::NoData
    } else {
        Field::Value(tags)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayEntry {
    #[serde(rename = "ID")]
    pub id: Field<String>,
    #[serde(rename = "Subestacao")]
    pub substation: Field<Option<String>>,
    #[serde(rename = "Regional")]
    pub region: Field<Option<String>>,
    #[serde(rename = "IP")]
    pub host: Field<Option<String>>,
    #[serde(rename = "Status")]
    pub status: Field<Option<bool>>,
}

impl GatewayEntry {
    fn from_record(record: Option<&GatewayRecord>) -> Self {
        Self {
            id: record.map(|r| r.gateway_id.clone()).into(),
            substation: record.map(|r| r.substation.clone()).into(),
            region: record.map(|r| r.region.clone()).into(),
            host: record.map(|r| r.host.clone()).into(),
            status: record.map(|r| r.status).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasourceEntry {
    #[serde(rename = "Equipamento")]
    pub device_id: Field<String>,
    #[serde(rename = "Fabricante")]
    pub manufacturer: Field<Option<String>>,
    #[serde(rename = "Marca")]
    pub brand: Field<Option<String>>,
    #[serde(rename = "Modelo")]
    pub model: Field<Option<String>>,
    #[serde(rename = "Protocolo")]
    pub device_type: Field<Option<String>>,
    #[serde(rename = "SAP_id")]
    pub sap_id: Field<Option<String>>,
    #[serde(rename = "IP")]
    pub host: Field<Option<String>>,
    #[serde(rename = "Status")]
    pub enabled: Field<Option<bool>>,
    #[serde(rename = "tags_equipamento")]
    pub tags: Field<TagSet>,
}

impl DatasourceEntry {
    fn from_record(record: Option<&DatasourceRecord>, tags: TagSet) -> Self {
        Self {
            device_id: record.map(|r| r.device_id.clone()).into(),
            manufacturer: record.map(|r| r.manufacturer.clone()).into(),
            brand: record.map(|r| r.brand.clone()).into(),
            model: record.map(|r| r.model.clone()).into(),
            device_type: record.map(|r| r.device_type.clone()).into(),
            sap_id: record.map(|r| r.sap_id.clone()).into(),
            host: record.map(|r| r.host.clone()).into(),
            enabled: record.map(|r| r.enabled).into(),
            tags: tags_field(tags),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatapointEntry {
    pub timestamp: f64,
    #[serde(rename = "Sensor")]
    pub register_id: Field<String>,
    #[serde(rename = "Valor")]
    pub value: Value,
    #[serde(rename = "Registrador")]
    pub address: Field<Option<i64>>,
    #[serde(rename = "Nome")]
    pub name: Field<Option<String>>,
    #[serde(rename = "Tipo")]
    pub kind: Field<Option<String>>,
    #[serde(rename = "Classificacao")]
    pub classification: Field<Option<String>>,
    #[serde(rename = "Status")]
    pub enabled: Field<Option<bool>>,
    #[serde(rename = "tags_sensor")]
    pub tags: Field<TagSet>,
}

/// A register reading joined with its gateway and device metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    #[serde(skip)]
    pub requested_register: String,
    #[serde(rename = "data_gateway", serialize_with = "single")]
    pub gateway: GatewayEntry,
    #[serde(rename = "dataSources", serialize_with = "single")]
    pub datasource: DatasourceEntry,
    #[serde(rename = "dataPoints", serialize_with = "single")]
    pub datapoint: DatapointEntry,
}

fn single<T: Serialize, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    std::slice::from_ref(value).serialize(serializer)
}

impl Reading {
    /// Start building a reading for `register_id`.
    pub fn builder(register_id: impl Into<String>) -> ReadingBuilder {
        ReadingBuilder::new(register_id)
    }
}

/// Builder for a [`Reading`].
///
/// Every lookup defaults to "not found", so a builder with only a value
/// produces a document of [`NO_DATA`] markers around that value.
///
/// ```rust
/// use fieldgate_types::{GatewayRecord, Reading, TagSet};
/// use serde_json::json;
///
/// let gateway = GatewayRecord {
///     gateway_id: "GW-01".into(),
///     ..Default::default()
/// };
///
/// let reading = Reading::builder("S1")
///     .gateway(Some(&gateway))
///     .value(json!(12.5))
///     .timestamp(1_700_000_000.0)
///     .build();
///
/// assert_eq!(reading.datapoint.value, json!(12.5));
/// assert!(reading.datasource.device_id.is_no_data());
/// ```
#[derive(Debug, Clone)]
pub struct ReadingBuilder {
    register_id: String,
    gateway: Option<GatewayRecord>,
    datasource: Option<DatasourceRecord>,
    device_tags: TagSet,
    datapoint: Option<DatapointRecord>,
    register_tags: TagSet,
    value: Value,
    timestamp: Option<f64>,
}

impl ReadingBuilder {
    pub fn new(register_id: impl Into<String>) -> Self {
        Self {
            register_id: register_id.into(),
            gateway: None,
            datasource: None,
            device_tags: TagSet::default(),
            datapoint: None,
            register_tags: TagSet::default(),
            value: Value::Null,
            timestamp: None,
        }
    }

    pub fn gateway(mut self, record: Option<&GatewayRecord>) -> Self {
        self.gateway = record.cloned();
        self
    }

    pub fn datasource(mut self, record: Option<&DatasourceRecord>) -> Self {
        self.datasource = record.cloned();
        self
    }

    pub fn device_tags(mut self, tags: TagSet) -> Self {
        self.device_tags = tags;
        self
    }

    pub fn datapoint(mut self, record: Option<&DatapointRecord>) -> Self {
        self.datapoint = record.cloned();
        self
    }

    pub fn register_tags(mut self, tags: TagSet) -> Self {
        self.register_tags = tags;
        self
    }

    pub fn value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    /// Seconds since the Unix epoch. Defaults to the current time.
    pub fn timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> Reading {
        let point = self.datapoint.as_ref();
        Reading {
            gateway: GatewayEntry::from_record(self.gateway.as_ref()),
            datasource: DatasourceEntry::from_record(self.datasource.as_ref(), self.device_tags),
            datapoint: DatapointEntry {
                timestamp: self.timestamp.unwrap_or_else(current_timestamp),
                register_id: point.map(|p| p.register_id.clone()).into(),
                value: self.value,
                address: point.map(|p| p.address).into(),
                name: point.map(|p| p.name.clone()).into(),
                kind: point.map(|p| p.kind.clone()).into(),
                classification: point.map(|p| p.classification.clone()).into(),
                enabled: point.map(|p| p.enabled).into(),
                tags: tags_field(self.register_tags),
            },
            requested_register: self.register_id,
        }
    }
}

fn current_timestamp() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// One document ready to be stored in the outbox.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadDocument {
    /// Full reading.
    Reading(Box<Reading>),
    /// The upstream value could not be read this cycle.
    Unavailable { register_id: String },
    /// The reading could not be built.
    Error { register_id: String, error: String },
}

impl PayloadDocument {
    pub fn unavailable(register_id: impl Into<String>) -> Self {
        PayloadDocument::Unavailable {
            register_id: register_id.into(),
        }
    }

    pub fn error(register_id: impl Into<String>) -> Self {
        PayloadDocument::Error {
            register_id: register_id.into(),
            error: BUILD_FAILED.to_string(),
        }
    }

    /// The register this document was produced for.
    pub fn register_id(&self) -> &str {
        match self {
            PayloadDocument::Reading(reading) => &reading.requested_register,
            PayloadDocument::Unavailable { register_id } => register_id,
            PayloadDocument::Error { register_id, .. } => register_id,
        }
    }

    pub fn is_reading(&self) -> bool {
        matches!(self, PayloadDocument::Reading(_))
    }

    /// Serialize as pretty-printed JSON.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl From<Reading> for PayloadDocument {
    fn from(reading: Reading) -> Self {
        PayloadDocument::Reading(Box::new(reading))
    }
}

#[derive(Serialize)]
struct ReducedShape<'a> {
    status: &'static str,
    #[serde(rename = "Sensor")]
    register_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl Serialize for PayloadDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PayloadDocument::Reading(reading) => reading.serialize(serializer),
            PayloadDocument::Unavailable { register_id } => ReducedShape {
                status: "unavailable",
                register_id,
                error: None,
            }
            .serialize(serializer),
            PayloadDocument::Error { register_id, error } => ReducedShape {
                status: "error",
                register_id,
                error: Some(error),
            }
            .serialize(serializer),
        }
    }
}
