//! Periodic TCP reachability probes of upstream systems.
//!
//! Each target has a [`StatusFlag`] on the shared [`StatusBoard`]; the
//! monitor is its only writer. At most one target gates polling. When that
//! target comes back online the upstream session is renewed before the
//! flag flips, so the first poll after an outage finds a fresh token.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use fieldgate_adapters::ValueSource;
use fieldgate_types::ServiceStatus;
use tokio::net::TcpStream;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{StatusBoard, StatusFlag};

/// A `host:port` to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorTarget {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Whether poll workers wait for this system to be online.
    pub gates_polling: bool,
}

impl MonitorTarget {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            gates_polling: false,
        }
    }

    /// Mark this target as the one poll workers wait for.
    pub fn gating(mut self) -> Self {
        self.gates_polling = true;
        self
    }
}

pub struct LivenessMonitor {
    targets: Vec<(MonitorTarget, Arc<StatusFlag>)>,
    period: Duration,
    connect_timeout: Duration,
    source: Option<Arc<dyn ValueSource>>,
}

impl LivenessMonitor {
    /// Register a flag on `board` for every target.
    pub fn new(board: &StatusBoard, targets: impl IntoIterator<Item = MonitorTarget>) -> Self {
        let targets = targets
            .into_iter()
            .map(|target| {
                let flag = board.register(&target.name);
                (target, flag)
            })
            .collect();
        Self {
            targets,
            period: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            source: None,
        }
    }

    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Renew this source's session whenever the gating target comes online.
    pub fn reauthenticate_with(mut self, source: Arc<dyn ValueSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Flag of the gating target, if any.
    pub fn gate(&self) -> Option<Arc<StatusFlag>> {
        self.targets
            .iter()
            .find(|(target, _)| target.gates_polling)
            .map(|(_, flag)| flag.clone())
    }

    pub fn targets(&self) -> impl Iterator<Item = &MonitorTarget> {
        self.targets.iter().map(|(target, _)| target)
    }

    /// Whether a TCP connection to `target` opens within the timeout.
    pub async fn probe(&self, target: &MonitorTarget) -> bool {
        let connect = TcpStream::connect((target.host.as_str(), target.port));
        match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!(system = %target.name, error = %e, "probe refused");
                false
            }
            Err(_) => {
                tracing::debug!(system = %target.name, "probe timed out");
                false
            }
        }
    }

    /// Probe every target once and update the flags.
    pub async fn check_once(&self) -> BTreeMap<String, ServiceStatus> {
        let mut statuses = BTreeMap::new();
        for (target, flag) in &self.targets {
            let status = if self.probe(target).await {
                ServiceStatus::Online
            } else {
                ServiceStatus::Offline
            };

            let coming_online = status.is_online() && !flag.get().is_online();
            if coming_online && target.gates_polling {
                if let Some(source) = &self.source {
                    if !source.reauthenticate().await {
                        tracing::warn!(system = %target.name, "re-authentication failed");
                    }
                }
            }

            let previous = flag.set(status);
            if previous != status {
                if status.is_online() {
                    tracing::info!(system = %target.name, %previous, "system online");
                } else {
                    tracing::error!(system = %target.name, host = %target.host, port = target.port, %previous, "system offline");
                }
            }
            statuses.insert(target.name.clone(), status);
        }
        statuses
    }

    /// Probe every period until `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.check_once().await;
                }
            }
        }
        tracing::debug!("liveness monitor stopped");
    }
}
