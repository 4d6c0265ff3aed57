//! Joins configuration records and a live value into one document.

use std::sync::Arc;

use fieldgate_adapters::ValueSource;
use fieldgate_types::{PayloadDocument, Protocol, Reading, Tag, TagSet};

use crate::ports::ConfigRepository;
use crate::StoreError;

/// Builds the [`PayloadDocument`] for one register.
///
/// A configuration lookup that fails or finds nothing becomes a "no data"
/// marker in the document. A missing live value replaces the whole reading
/// with the reduced unavailable shape. `assemble` never fails.
pub struct PayloadAssembler {
    repo: Arc<dyn ConfigRepository>,
    source: Arc<dyn ValueSource>,
}

impl PayloadAssembler {
    pub fn new(repo: Arc<dyn ConfigRepository>, source: Arc<dyn ValueSource>) -> Self {
        Self { repo, source }
    }

    pub async fn assemble(&self, register_id: &str, protocol: Protocol) -> PayloadDocument {
        let datapoint = found(
            "datapoint",
            register_id,
            self.repo.datapoint(protocol, register_id).await,
        );

        let device_id = datapoint.as_ref().and_then(|p| p.device_id.clone());
        let datasource = match device_id.as_deref() {
            Some(id) => found("datasource", id, self.repo.datasource(protocol, id).await),
            None => None,
        };

        let gateway_id = datasource.as_ref().and_then(|d| d.gateway_id.clone());
        let gateway = match gateway_id.as_deref() {
            Some(id) => found("gateway", id, self.repo.gateway(id).await),
            None => None,
        };

        let device_tags = match device_id.as_deref() {
            Some(id) => tags("device tags", id, self.repo.device_tags(id).await),
            None => TagSet::default(),
        };
        let register_tags = tags(
            "register tags",
            register_id,
            self.repo.register_tags(register_id).await,
        );

        let Some(value) = self.source.fetch_value(register_id).await else {
            tracing::debug!(register_id = register_id, "no upstream value");
            return PayloadDocument::unavailable(register_id);
        };

        let document = PayloadDocument::from(
            Reading::builder(register_id)
                .gateway(gateway.as_ref())
                .datasource(datasource.as_ref())
                .device_tags(device_tags)
                .datapoint(datapoint.as_ref())
                .register_tags(register_tags)
                .value(value)
                .build(),
        );

        match serde_json::to_value(&document) {
            Ok(_) => document,
            Err(e) => {
                tracing::error!(register_id = register_id, error = %e, "failed to build payload");
                PayloadDocument::error(register_id)
            }
        }
    }
}

fn found<T>(what: &str, id: &str, result: Result<Option<T>, StoreError>) -> Option<T> {
    match result {
        Ok(Some(record)) => Some(record),
        Ok(None) => {
            tracing::debug!(lookup = what, id, "not found");
            None
        }
        Err(e) => {
            tracing::warn!(lookup = what, id, error = %e, "configuration lookup failed");
            None
        }
    }
}

fn tags(what: &str, id: &str, result: Result<Vec<Tag>, StoreError>) -> TagSet {
    match result {
        Ok(rows) => rows.into_iter().collect(),
        Err(e) => {
            tracing::warn!(lookup = what, id, error = %e, "configuration lookup failed");
            TagSet::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSource, MemoryConfig};
    use fieldgate_types::{DatapointRecord, DatasourceRecord, GatewayRecord, NO_DATA};
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;

    fn seeded_config() -> MemoryConfig {
        let config = MemoryConfig::default();
        config.datapoints.lock().insert(
            (Protocol::Modbus, "S1".to_string()),
            DatapointRecord {
                register_id: "S1".into(),
                device_id: Some("D1".into()),
                address: Some(40001),
                name: Some("Tensao".into()),
                kind: Some("float".into()),
                classification: Some("analog".into()),
                enabled: Some(true),
            },
        );
        config.datasources.lock().insert(
            (Protocol::Modbus, "D1".to_string()),
            DatasourceRecord {
                device_id: "D1".into(),
                gateway_id: Some("GW-01".into()),
                manufacturer: Some("Schneider".into()),
                host: Some("10.0.0.5".into()),
                enabled: Some(true),
                ..Default::default()
            },
        );
        config.gateways.lock().insert(
            "GW-01".to_string(),
            GatewayRecord {
                gateway_id: "GW-01".into(),
                substation: Some("SE Norte".into()),
                region: Some("R1".into()),
                host: Some("10.0.0.1".into()),
                status: Some(true),
            },
        );
        config
            .device_tags
            .lock()
            .insert("D1".to_string(), vec![Tag::new("area", "north")]);
        config
            .register_tags
            .lock()
            .insert("S1".to_string(), vec![Tag::new("unit", "kV")]);
        config
    }

    fn render(document: &PayloadDocument) -> Value {
        serde_json::to_value(document).unwrap()
    }

    #[tokio::test]
    async fn test_full_reading() {
        let assembler = PayloadAssembler::new(
            Arc::new(seeded_config()),
            Arc::new(FakeSource::with_value("S1", json!(13.8))),
        );

        let document = assembler.assemble("S1", Protocol::Modbus).await;
        assert!(document.is_reading());

        let json = render(&document);
        assert_eq!(json["data_gateway"][0]["ID"], "GW-01");
        assert_eq!(json["data_gateway"][0]["Subestacao"], "SE Norte");
        assert_eq!(json["dataSources"][0]["Equipamento"], "D1");
        assert_eq!(json["dataSources"][0]["tags_equipamento"]["area"], "north");
        assert_eq!(json["dataPoints"][0]["Sensor"], "S1");
        assert_eq!(json["dataPoints"][0]["Valor"], 13.8);
        assert_eq!(json["dataPoints"][0]["Registrador"], 40001);
        assert_eq!(json["dataPoints"][0]["tags_sensor"]["unit"], "kV");
    }

    #[tokio::test]
    async fn test_missing_value_gives_unavailable() {
        let assembler =
            PayloadAssembler::new(Arc::new(seeded_config()), Arc::new(FakeSource::default()));

        let document = assembler.assemble("S1", Protocol::Modbus).await;
        assert_eq!(document, PayloadDocument::unavailable("S1"));
        assert_eq!(
            render(&document),
            json!({"status": "unavailable", "Sensor": "S1"})
        );
    }

    #[tokio::test]
    async fn test_unknown_register_is_all_no_data() {
        let assembler = PayloadAssembler::new(
            Arc::new(MemoryConfig::default()),
            Arc::new(FakeSource::with_value("S9", json!(1))),
        );

        let json = render(&assembler.assemble("S9", Protocol::Modbus).await);
        assert_eq!(json["data_gateway"][0]["ID"], NO_DATA);
        assert_eq!(json["dataSources"][0]["Equipamento"], NO_DATA);
        assert_eq!(json["dataSources"][0]["tags_equipamento"], NO_DATA);
        assert_eq!(json["dataPoints"][0]["Sensor"], NO_DATA);
        assert_eq!(json["dataPoints"][0]["tags_sensor"], NO_DATA);
        assert_eq!(json["dataPoints"][0]["Valor"], 1);
    }

    #[tokio::test]
    async fn test_missing_gateway_keeps_device() {
        let config = seeded_config();
        config.gateways.lock().clear();
        let assembler = PayloadAssembler::new(
            Arc::new(config),
            Arc::new(FakeSource::with_value("S1", json!(2))),
        );

        let json = render(&assembler.assemble("S1", Protocol::Modbus).await);
        assert_eq!(json["data_gateway"][0]["ID"], NO_DATA);
        assert_eq!(json["dataSources"][0]["Equipamento"], "D1");
    }

    #[tokio::test]
    async fn test_protocol_selects_table() {
        let assembler = PayloadAssembler::new(
            Arc::new(seeded_config()),
            Arc::new(FakeSource::with_value("S1", json!(3))),
        );

        // S1 only exists in the Modbus tables
        let json = render(&assembler.assemble("S1", Protocol::Dnp3).await);
        assert_eq!(json["dataPoints"][0]["Sensor"], NO_DATA);
        assert_eq!(json["dataSources"][0]["Equipamento"], NO_DATA);
    }

    #[tokio::test]
    async fn test_failing_store_degrades() {
        let config = seeded_config();
        config.set_failing(true);
        let source = Arc::new(FakeSource::with_value("S1", json!(4)));
        let assembler = PayloadAssembler::new(Arc::new(config), source.clone());

        let document = assembler.assemble("S1", Protocol::Modbus).await;
        assert!(document.is_reading());
        assert_eq!(render(&document)["dataPoints"][0]["Nome"], NO_DATA);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }
}
