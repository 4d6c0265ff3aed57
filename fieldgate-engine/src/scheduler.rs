//! Keeps one poll worker per configured device.
//!
//! Each tick reads the device table of every enabled protocol and
//! reconciles it against the live workers:
//!
//! - a device without a worker gets one;
//! - a device whose interval changed has its worker stopped and joined
//!   before the replacement starts, so it is never polled twice at once;
//! - a worker whose device disappeared is stopped and joined.
//!
//! After a successful tick the live workers match that tick's snapshot
//! exactly. A failed configuration read skips the tick and leaves the
//! workers alone. A worker that does not stop within the join bound is
//! aborted and ends the scheduler with [`EngineError::WorkerStuck`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use fieldgate_types::{
    convert_to_seconds, DeviceKey, IntervalUnit, PollInterval, Protocol, MAX_POLL_INTERVAL,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::ports::ConfigRepository;
use crate::worker::{spawn_worker, DevicePoller};
use crate::{EngineError, StoreError};

/// A running device worker.
#[derive(Debug)]
pub struct WorkerHandle {
    device: DeviceKey,
    interval: PollInterval,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn device(&self) -> &DeviceKey {
        &self.device
    }

    pub fn interval(&self) -> PollInterval {
        self.interval
    }
}

/// Changes made by one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub started: Vec<DeviceKey>,
    pub restarted: Vec<DeviceKey>,
    pub stopped: Vec<DeviceKey>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.restarted.is_empty() && self.stopped.is_empty()
    }
}

pub struct PollScheduler {
    repo: Arc<dyn ConfigRepository>,
    poller: Arc<DevicePoller>,
    protocols: Vec<Protocol>,
    tick: Duration,
    join_timeout: Duration,
    workers: HashMap<DeviceKey, WorkerHandle>,
    root: CancellationToken,
}

impl PollScheduler {
    /// A scheduler over every protocol, ticking each second.
    pub fn new(repo: Arc<dyn ConfigRepository>, poller: Arc<DevicePoller>) -> Self {
        Self {
            repo,
            poller,
            protocols: Protocol::ALL.to_vec(),
            tick: Duration::from_secs(1),
            join_timeout: Duration::from_secs(30),
            workers: HashMap::new(),
            root: CancellationToken::new(),
        }
    }

    pub fn protocols(mut self, protocols: impl IntoIterator<Item = Protocol>) -> Self {
        self.protocols = protocols.into_iter().collect();
        self
    }

    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// How long a stopped worker may take to finish.
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Live workers and their intervals.
    pub fn live_workers(&self) -> BTreeMap<DeviceKey, PollInterval> {
        self.workers
            .values()
            .map(|h| (h.device.clone(), h.interval))
            .collect()
    }

    pub fn worker(&self, device: &DeviceKey) -> Option<&WorkerHandle> {
        self.workers.get(device)
    }

    /// Read the configured devices and normalize their intervals.
    ///
    /// Rows without an id or period are skipped. An unknown unit is read
    /// as seconds.
    pub async fn desired_devices(&self) -> Result<BTreeMap<DeviceKey, PollInterval>, StoreError> {
        let mut desired = BTreeMap::new();
        for &protocol in &self.protocols {
            for row in self.repo.device_periods(protocol).await? {
                if row.device_id.is_empty() {
                    tracing::warn!(%protocol, "device row without id skipped");
                    continue;
                }
                let Some(value) = row.value else {
                    tracing::warn!(%protocol, device_id = %row.device_id, "device without poll period skipped");
                    continue;
                };
                let unit = match row.unit.as_deref().map(str::parse::<IntervalUnit>) {
                    Some(Ok(unit)) => unit,
                    Some(Err(unit)) => {
                        tracing::warn!(%protocol, device_id = %row.device_id, unit = %unit, "unknown interval unit, using seconds");
                        IntervalUnit::Seconds
                    }
                    None => {
                        tracing::warn!(%protocol, device_id = %row.device_id, "missing interval unit, using seconds");
                        IntervalUnit::Seconds
                    }
                };
                if convert_to_seconds(value, unit) > MAX_POLL_INTERVAL.as_secs_f64() {
                    tracing::warn!(%protocol, device_id = %row.device_id, value, "poll period too long, capped");
                }
                desired.insert(
                    DeviceKey::new(protocol, row.device_id),
                    PollInterval::from_parts(value, unit),
                );
            }
        }
        Ok(desired)
    }

    /// Run one reconciliation tick.
    pub async fn reconcile(&mut self) -> Result<ReconcileReport, EngineError> {
        let desired = self.desired_devices().await?;
        let mut report = ReconcileReport::default();

        for (device, interval) in &desired {
            match self.workers.get(device) {
                Some(handle) if handle.interval == *interval => {}
                Some(_) => {
                    if let Some(old) = self.workers.remove(device) {
                        tracing::info!(device_id = %device, from = %old.interval, to = %interval, "poll interval changed");
                        self.stop(old).await?;
                    }
                    self.start(device.clone(), *interval);
                    report.restarted.push(device.clone());
                }
                None => {
                    tracing::info!(device_id = %device, %interval, "starting worker");
                    self.start(device.clone(), *interval);
                    report.started.push(device.clone());
                }
            }
        }

        let removed: Vec<DeviceKey> = self
            .workers
            .keys()
            .filter(|device| !desired.contains_key(*device))
            .cloned()
            .collect();
        for device in removed {
            if let Some(handle) = self.workers.remove(&device) {
                tracing::info!(device_id = %device, "device removed, stopping worker");
                self.stop(handle).await?;
                report.stopped.push(device);
            }
        }

        Ok(report)
    }

    /// Reconcile every tick until `shutdown` fires, then stop all workers.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), EngineError> {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.reconcile().await {
                Ok(report) if !report.is_empty() => {
                    tracing::debug!(
                        started = report.started.len(),
                        restarted = report.restarted.len(),
                        stopped = report.stopped.len(),
                        live = self.workers.len(),
                        "reconciled workers"
                    );
                }
                Ok(_) => {}
                Err(EngineError::Store(e)) => {
                    tracing::warn!(error = %e, live = self.workers.len(), "failed to read devices, keeping workers");
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler stopping");
                    // The stuck worker was already aborted; report that one.
                    let _ = self.stop_all().await;
                    return Err(e);
                }
            }
        }

        tracing::info!(live = self.workers.len(), "shutting down workers");
        self.stop_all().await
    }

    /// Stop and join every worker.
    ///
    /// All workers are stopped even when one of them is stuck; the first
    /// stuck worker is returned.
    pub async fn stop_all(&mut self) -> Result<(), EngineError> {
        self.root.cancel();
        let mut first_error = None;
        let handles: Vec<WorkerHandle> = self.workers.drain().map(|(_, h)| h).collect();
        for handle in handles {
            if let Err(e) = self.stop(handle).await {
                first_error.get_or_insert(e);
            }
        }
        // Workers started after this point need a live parent.
        self.root = CancellationToken::new();
        first_error.map_or(Ok(()), Err)
    }

    fn start(&mut self, device: DeviceKey, interval: PollInterval) {
        let cancel = self.root.child_token();
        let join = spawn_worker(self.poller.clone(), device.clone(), interval, cancel.clone());
        self.workers.insert(
            device.clone(),
            WorkerHandle {
                device,
                interval,
                cancel,
                join,
            },
        );
    }

    async fn stop(&self, mut handle: WorkerHandle) -> Result<(), EngineError> {
        handle.cancel.cancel();
        match tokio::time::timeout(self.join_timeout, &mut handle.join).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::warn!(device_id = %handle.device, error = %e, "worker ended abnormally");
                Ok(())
            }
            Err(_) => {
                handle.join.abort();
                Err(EngineError::WorkerStuck {
                    device: handle.device,
                    timeout: self.join_timeout,
                })
            }
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
