//! # fieldgate
//!
//! Field-gateway middleware that polls register values from a Scada-LTS
//! server and forwards them to RabbitMQ.
//!
//! The work is split across the workspace:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ fieldgate (this crate): CLI, settings, logging, wiring       │
//! │   ┌──────────────────────────────────────────────────────┐   │
//! │   │ fieldgate-engine                                     │   │
//! │   │  PollScheduler ─▶ DevicePoller ─▶ PayloadAssembler   │   │
//! │   │        ▲                │                            │   │
//! │   │ LivenessMonitor         └─────▶ OutboxPublisher      │   │
//! │   └──────────────────────────────────────────────────────┘   │
//! │   fieldgate-adapters: ScadaClient, AmqpBroker                │
//! │   fieldgate-types:    Protocol, PollInterval, PayloadDocument│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`settings`]**: layered configuration (defaults, TOML file, environment)
//! - **[`telemetry`]**: `tracing` subscriber setup
//! - **[`app`]**: builds the store, the clients and the engine, and runs it
//!
//! ## Running
//!
//! ```rust,no_run
//! use fieldgate::{app, Settings};
//!
//! # tokio_test::block_on(async {
//! let settings = Settings::load(None)?;
//! app::run(settings).await?;
//! # Ok::<(), anyhow::Error>(())
//! # }).unwrap();
//! ```

pub mod app;
pub mod settings;
pub mod telemetry;

pub use settings::Settings;
