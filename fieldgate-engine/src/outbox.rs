//! Store-and-forward delivery of documents to the broker.
//!
//! Every document is committed to the outbox before any delivery attempt.
//! A flush then walks all pending records, not only the new one, so
//! records left behind by earlier failures are picked up again. A record
//! is deleted only after the broker accepted it.

use std::sync::Arc;

use fieldgate_adapters::{AdapterError, Broker};
use fieldgate_types::{OutboxRecord, PayloadDocument};

use crate::ports::OutboxStore;
use crate::{RetryPolicy, StoreError};

/// Result of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records published and removed.
    pub delivered: usize,
    /// Records still waiting after this flush.
    pub pending: usize,
}

#[derive(Debug)]
enum Attempt {
    Unreachable,
    Rejected(AdapterError),
}

pub struct OutboxPublisher {
    store: Arc<dyn OutboxStore>,
    broker: Arc<dyn Broker>,
    retry: RetryPolicy,
}

impl OutboxPublisher {
    pub fn new(store: Arc<dyn OutboxStore>, broker: Arc<dyn Broker>, retry: RetryPolicy) -> Self {
        Self {
            store,
            broker,
            retry,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Persist `document` and then flush the whole outbox.
    ///
    /// Only a local store failure is returned as an error. Delivery failures
    /// leave records pending for the next flush.
    pub async fn enqueue_and_flush(
        &self,
        document: &PayloadDocument,
    ) -> Result<FlushReport, StoreError> {
        let content = match document.render() {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(register_id = document.register_id(), error = %e, "failed to render payload");
                render_fallback(document)
            }
        };

        let id = self.store.enqueue(&content).await?;
        tracing::debug!(record_id = id, register_id = document.register_id(), "payload queued");

        self.flush().await
    }

    /// Try to deliver every pending record.
    pub async fn flush(&self) -> Result<FlushReport, StoreError> {
        let pending = self.store.pending().await?;
        let mut report = FlushReport::default();

        for record in &pending {
            if self.deliver(record).await {
                // Deleted only here, after the broker took the record.
                if self.store.remove(record.id).await? {
                    report.delivered += 1;
                } else {
                    tracing::debug!(record_id = record.id, "record already removed by another flush");
                }
            } else {
                report.pending += 1;
            }
        }

        if report.pending > 0 {
            tracing::warn!(
                delivered = report.delivered,
                pending = report.pending,
                "outbox records left for the next flush"
            );
        }
        Ok(report)
    }

    async fn deliver(&self, record: &OutboxRecord) -> bool {
        let body = record.content.as_bytes();
        let result = self
            .retry
            .run(|attempt| async move {
                if !self.broker.is_reachable().await {
                    tracing::debug!(record_id = record.id, attempt, "broker unreachable");
                    return Err(Attempt::Unreachable);
                }
                self.broker.publish(body).await.map_err(|e| {
                    tracing::debug!(record_id = record.id, attempt, error = %e, "publish failed");
                    Attempt::Rejected(e)
                })
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(record_id = record.id, "record delivered");
                true
            }
            Err(Attempt::Unreachable) => {
                tracing::warn!(
                    record_id = record.id,
                    attempts = self.retry.max_attempts(),
                    "broker unreachable, record kept"
                );
                false
            }
            Err(Attempt::Rejected(e)) => {
                tracing::warn!(
                    record_id = record.id,
                    attempts = self.retry.max_attempts(),
                    error = %e,
                    "publish failed, record kept"
                );
                false
            }
        }
    }
}

fn render_fallback(document: &PayloadDocument) -> String {
    let error = PayloadDocument::error(document.register_id());
    serde_json::to_string(&error).unwrap_or_else(|_| {
        format!(
            "{{\"status\":\"error\",\"Sensor\":{:?},\"error\":\"payload_build_failed\"}}",
            document.register_id()
        )
    })
}
