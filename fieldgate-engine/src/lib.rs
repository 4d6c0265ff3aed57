//! # fieldgate-engine
//!
//! Runtime polling and delivery engine of the fieldgate middleware.
//!
//! The engine keeps one poll worker per configured device, reads live
//! register values from the upstream server, joins them with their
//! configuration into a [`PayloadDocument`](fieldgate_types::PayloadDocument)
//! and forwards the result to the broker through a durable outbox.
//!
//! ## Components
//!
//! - [`PollScheduler`] reconciles live workers against the device table
//! - [`DevicePoller`] runs one poll cycle for a device
//! - [`PayloadAssembler`] builds the document for one register
//! - [`OutboxPublisher`] stores documents and delivers them with bounded retries
//! - [`LivenessMonitor`] probes upstream systems and gates polling
//! - [`SqliteStore`] implements the [`ConfigRepository`] and [`OutboxStore`] ports
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fieldgate_adapters::rabbitmq::AmqpBroker;
//! use fieldgate_adapters::scada::ScadaClient;
//! use fieldgate_engine::{Gateway, MonitorTarget, SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SqliteStore::connect("sqlite://fieldgate.db", 5).await?);
//!     store.migrate().await?;
//!
//!     let handle = Gateway::builder()
//!         .config(store.clone())
//!         .outbox(store)
//!         .source(Arc::new(ScadaClient::builder().build()?))
//!         .broker(Arc::new(AmqpBroker::builder().build()))
//!         .monitor_target(MonitorTarget::new("scada", "127.0.0.1", 8080).gating())
//!         .build()?
//!         .start();
//!
//!     tokio::signal::ctrl_c().await?;
//!     handle.stop().await?;
//!     Ok(())
//! }
//! ```

mod assembler;
mod error;
mod gateway;
mod monitor;
mod outbox;
mod ports;
mod retry;
mod scheduler;
mod status;
mod store;
mod worker;

#[cfg(test)]
mod testing;

pub use assembler::PayloadAssembler;
pub use error::{EngineError, StoreError};
pub use gateway::{Gateway, GatewayBuilder, GatewayHandle};
pub use monitor::{LivenessMonitor, MonitorTarget};
pub use outbox::{FlushReport, OutboxPublisher};
pub use ports::{ConfigRepository, DevicePeriod, OutboxStore};
pub use retry::{Backoff, RetryPolicy};
pub use scheduler::{PollScheduler, ReconcileReport, WorkerHandle};
pub use status::{StatusBoard, StatusFlag};
pub use store::SqliteStore;
pub use worker::{spawn_worker, CycleOutcome, DevicePoller};
