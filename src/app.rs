//! Wiring of the store, the external clients and the engine.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fieldgate_adapters::rabbitmq::AmqpBroker;
use fieldgate_adapters::scada::ScadaClient;
use fieldgate_engine::{Gateway, GatewayHandle, SqliteStore};
use tracing::info;

use crate::settings::Settings;

/// Open the database, build the clients and start the engine.
pub async fn start(settings: &Settings) -> Result<GatewayHandle> {
    let store = SqliteStore::connect(&settings.database.url, settings.database.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", settings.database.url))?;
    store
        .migrate()
        .await
        .context("failed to apply outbox migrations")?;
    let store = Arc::new(store);

    let upstream = &settings.upstream;
    let source = ScadaClient::builder()
        .base_url(&upstream.base_url)
        .credentials(&upstream.username, &upstream.password)
        .session_ttl(Duration::from_secs(upstream.session_ttl_secs))
        .timeout(Duration::from_secs(upstream.request_timeout_secs))
        .build()
        .context("failed to build upstream client")?;

    let broker = &settings.broker;
    let broker = AmqpBroker::builder()
        .uri(&broker.url)
        .exchange(&broker.exchange)
        .queue(&broker.queue)
        .routing_key(&broker.routing_key)
        .connect_timeout(Duration::from_secs(broker.connect_timeout_secs))
        .publish_timeout(Duration::from_secs(broker.publish_timeout_secs))
        .build();

    let mut builder = Gateway::builder()
        .config(store.clone())
        .outbox(store)
        .source(Arc::new(source))
        .broker(Arc::new(broker))
        .retry(settings.retry_policy())
        .protocols(settings.scheduler.protocols.iter().copied())
        .tick(Duration::from_millis(settings.scheduler.tick_ms))
        .join_timeout(Duration::from_secs(settings.scheduler.join_timeout_secs))
        .monitor_period(Duration::from_secs(settings.monitor.period_secs))
        .connect_timeout(Duration::from_secs(settings.monitor.connect_timeout_secs));
    for target in settings.monitor_targets() {
        builder = builder.monitor_target(target);
    }

    info!(
        upstream = %upstream.base_url,
        queue = %settings.broker.queue,
        protocols = ?settings.scheduler.protocols,
        "starting gateway"
    );
    Ok(builder.build()?.start())
}

/// Run until ctrl-c, then stop every worker.
///
/// Returns an error when a worker could not be stopped, so the process
/// exits non-zero and its supervisor restarts it.
pub async fn run(settings: Settings) -> Result<()> {
    let handle = start(&settings).await?;

    let shutdown = handle.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received, shutting down"),
            Err(e) => tracing::error!(error = %e, "failed to listen for interrupt, shutting down"),
        }
        shutdown.cancel();
    });

    handle.join().await.context("gateway stopped abnormally")
}
