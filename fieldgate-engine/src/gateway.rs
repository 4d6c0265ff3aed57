//! The assembled engine: scheduler, workers and liveness monitor.

use std::sync::Arc;
use std::time::Duration;

use fieldgate_adapters::{Broker, ValueSource};
use fieldgate_types::Protocol;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::assembler::PayloadAssembler;
use crate::monitor::{LivenessMonitor, MonitorTarget};
use crate::outbox::OutboxPublisher;
use crate::ports::{ConfigRepository, OutboxStore};
use crate::scheduler::PollScheduler;
use crate::worker::DevicePoller;
use crate::{EngineError, RetryPolicy, StatusBoard};

/// The polling and delivery engine, ready to start.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use fieldgate_adapters::rabbitmq::AmqpBroker;
/// use fieldgate_adapters::scada::ScadaClient;
/// use fieldgate_engine::{Gateway, MonitorTarget, SqliteStore};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(SqliteStore::connect("sqlite://fieldgate.db", 5).await?);
/// store.migrate().await?;
///
/// let gateway = Gateway::builder()
///     .config(store.clone())
///     .outbox(store)
///     .source(Arc::new(ScadaClient::builder().build()?))
///     .broker(Arc::new(AmqpBroker::builder().build()))
///     .monitor_target(MonitorTarget::new("scada", "127.0.0.1", 8080).gating())
///     .build()?;
///
/// let handle = gateway.start();
/// tokio::signal::ctrl_c().await?;
/// handle.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct Gateway {
    board: Arc<StatusBoard>,
    scheduler: PollScheduler,
    monitor: LivenessMonitor,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    pub fn status_board(&self) -> Arc<StatusBoard> {
        self.board.clone()
    }

    /// Spawn the scheduler and the liveness monitor.
    pub fn start(self) -> GatewayHandle {
        let shutdown = CancellationToken::new();
        let Gateway {
            board,
            mut scheduler,
            monitor,
        } = self;

        let monitor = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { monitor.run(shutdown).await })
        };
        let scheduler = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        tracing::info!("gateway started");
        GatewayHandle {
            shutdown,
            scheduler,
            monitor,
            board,
        }
    }
}

/// Builder for a [`Gateway`].
pub struct GatewayBuilder {
    config: Option<Arc<dyn ConfigRepository>>,
    outbox: Option<Arc<dyn OutboxStore>>,
    source: Option<Arc<dyn ValueSource>>,
    broker: Option<Arc<dyn Broker>>,
    retry: RetryPolicy,
    protocols: Vec<Protocol>,
    tick: Duration,
    join_timeout: Duration,
    monitor_period: Duration,
    connect_timeout: Duration,
    targets: Vec<MonitorTarget>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            outbox: None,
            source: None,
            broker: None,
            retry: RetryPolicy::default(),
            protocols: Protocol::ALL.to_vec(),
            tick: Duration::from_secs(1),
            join_timeout: Duration::from_secs(30),
            monitor_period: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            targets: Vec::new(),
        }
    }

    /// Device, register and tag configuration.
    pub fn config(mut self, repo: Arc<dyn ConfigRepository>) -> Self {
        self.config = Some(repo);
        self
    }

    pub fn outbox(mut self, store: Arc<dyn OutboxStore>) -> Self {
        self.outbox = Some(store);
        self
    }

    /// Where live register values come from.
    pub fn source(mut self, source: Arc<dyn ValueSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn broker(mut self, broker: Arc<dyn Broker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Delivery attempts per record and flush.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn protocols(mut self, protocols: impl IntoIterator<Item = Protocol>) -> Self {
        self.protocols = protocols.into_iter().collect();
        self
    }

    /// Period of the scheduler's reconciliation.
    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn monitor_period(mut self, period: Duration) -> Self {
        self.monitor_period = period;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Add a system for the liveness monitor to probe.
    pub fn monitor_target(mut self, target: MonitorTarget) -> Self {
        self.targets.push(target);
        self
    }

    pub fn build(self) -> Result<Gateway, EngineError> {
        let config = self.config.ok_or_else(|| missing("configuration repository"))?;
        let outbox = self.outbox.ok_or_else(|| missing("outbox store"))?;
        let source = self.source.ok_or_else(|| missing("value source"))?;
        let broker = self.broker.ok_or_else(|| missing("broker"))?;

        if self.targets.iter().filter(|t| t.gates_polling).count() > 1 {
            return Err(EngineError::Config(
                "at most one monitor target may gate polling".to_string(),
            ));
        }
        for (name, value) in [
            ("scheduler tick", self.tick),
            ("worker join timeout", self.join_timeout),
            ("monitor period", self.monitor_period),
            ("monitor connect timeout", self.connect_timeout),
        ] {
            if value.is_zero() {
                return Err(EngineError::Config(format!("{} must be positive", name)));
            }
        }

        let board = Arc::new(StatusBoard::new());
        let monitor = LivenessMonitor::new(&board, self.targets)
            .period(self.monitor_period)
            .connect_timeout(self.connect_timeout)
            .reauthenticate_with(source.clone());

        let gate = monitor.gate();
        if gate.is_none() {
            tracing::warn!("no monitor target gates polling; workers poll unconditionally");
        }

        let poller = Arc::new(DevicePoller::new(
            config.clone(),
            PayloadAssembler::new(config.clone(), source),
            OutboxPublisher::new(outbox, broker, self.retry),
            gate,
        ));
        let scheduler = PollScheduler::new(config, poller)
            .protocols(self.protocols)
            .tick(self.tick)
            .join_timeout(self.join_timeout);

        Ok(Gateway {
            board,
            scheduler,
            monitor,
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(what: &str) -> EngineError {
    EngineError::Config(format!("{} is required", what))
}

/// Handle to a running [`Gateway`].
pub struct GatewayHandle {
    shutdown: CancellationToken,
    scheduler: JoinHandle<Result<(), EngineError>>,
    monitor: JoinHandle<()>,
    board: Arc<StatusBoard>,
}

impl GatewayHandle {
    pub fn status_board(&self) -> Arc<StatusBoard> {
        self.board.clone()
    }

    /// Token that stops the gateway when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Wait until the scheduler ends, then stop the monitor.
    ///
    /// Returns the scheduler's error, such as a stuck worker.
    pub async fn join(self) -> Result<(), EngineError> {
        let result = match self.scheduler.await {
            Ok(result) => result,
            Err(e) => Err(EngineError::TaskFailed(e.to_string())),
        };

        self.shutdown.cancel();
        if let Err(e) = self.monitor.await {
            tracing::warn!(error = %e, "liveness monitor ended abnormally");
        }
        tracing::info!("gateway stopped");
        result
    }

    /// Stop all workers and wait for them.
    pub async fn stop(self) -> Result<(), EngineError> {
        self.shutdown.cancel();
        self.join().await
    }
}
