//! # fieldgate-adapters
//!
//! Clients for the two external systems the gateway talks to.
//!
//! ## Supported Systems
//!
//! - **Scada-LTS** (`scada` feature) - Session-cookie login and per-register
//!   value reads over HTTP ([`scada::ScadaClient`])
//! - **RabbitMQ** (`rabbitmq` feature) - Reachability checks and publishing
//!   over AMQP ([`rabbitmq::AmqpBroker`])
//!
//! The engine only depends on the [`ValueSource`] and [`Broker`] traits, so
//! either side can be replaced in tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fieldgate_adapters::scada::ScadaClient;
//! use fieldgate_adapters::ValueSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ScadaClient::builder()
//!         .base_url("http://localhost:8080/Scada-LTS/api")
//!         .credentials("admin", "admin")
//!         .build()?;
//!
//!     if let Some(value) = client.fetch_value("DP_1001").await {
//!         println!("DP_1001 = {}", value);
//!     }
//!     Ok(())
//! }
//! ```

pub mod broker;
pub mod error;
pub mod source;

#[cfg(feature = "scada")]
pub mod scada;

#[cfg(feature = "rabbitmq")]
pub mod rabbitmq;

pub use broker::{Broker, Route};
pub use error::AdapterError;
pub use source::ValueSource;
