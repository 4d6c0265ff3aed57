//! Read-only configuration records joined into a payload.
//!
//! These mirror the gateway, device (datasource) and register (datapoint)
//! tables maintained by the configuration service. Columns that may be
//! NULL in the store are `Option`s here.

use std::collections::BTreeMap;

/// A field gateway (the box this engine runs on, or a sibling).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayRecord {
    pub gateway_id: String,
    pub substation: Option<String>,
    pub region: Option<String>,
    pub host: Option<String>,
    pub status: Option<bool>,
}

/// A polled device and its connection metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasourceRecord {
    pub device_id: String,
    pub gateway_id: Option<String>,
    pub manufacturer: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    /// Free-form protocol label stored with the device.
    pub device_type: Option<String>,
    pub sap_id: Option<String>,
    pub host: Option<String>,
    pub enabled: Option<bool>,
}

/// One register (datapoint) owned by a device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatapointRecord {
    pub register_id: String,
    pub device_id: Option<String>,
    /// Register address: the Modbus offset or the DNP3 index.
    pub address: Option<i64>,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub classification: Option<String>,
    pub enabled: Option<bool>,
}

/// A free-form `(name, value)` tag row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pub name: Option<String>,
    pub value: Option<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
        }
    }
}

/// Tags folded into a `name -> value` map.
///
/// Rows with an empty or missing name or value are dropped. When two rows
/// share a name the later one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let pairs = iter
            .into_iter()
            .filter_map(|tag| match (tag.name, tag.value) {
                (Some(name), Some(value)) if !name.is_empty() && !value.is_empty() => {
                    Some((name, value))
                }
                _ => None,
            })
            .collect();
        Self(pairs)
    }
}
