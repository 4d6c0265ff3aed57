//! Per-device poll loop.

use std::sync::Arc;

use fieldgate_types::{DeviceKey, PollInterval, ServiceStatus};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::assembler::PayloadAssembler;
use crate::outbox::OutboxPublisher;
use crate::ports::ConfigRepository;
use crate::StatusFlag;

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The gating system was not online; nothing was read or sent.
    Skipped(ServiceStatus),
    /// Every register of the device was assembled and queued.
    Polled {
        registers: usize,
        delivered: usize,
        pending: usize,
    },
    /// A local store failure cut the cycle short.
    Aborted,
}

/// The work of a single poll cycle, shared by every device worker.
pub struct DevicePoller {
    repo: Arc<dyn ConfigRepository>,
    assembler: PayloadAssembler,
    publisher: OutboxPublisher,
    gate: Option<Arc<StatusFlag>>,
}

impl DevicePoller {
    /// `gate` is the status of the upstream system. Without one, cycles
    /// are never skipped.
    pub fn new(
        repo: Arc<dyn ConfigRepository>,
        assembler: PayloadAssembler,
        publisher: OutboxPublisher,
        gate: Option<Arc<StatusFlag>>,
    ) -> Self {
        Self {
            repo,
            assembler,
            publisher,
            gate,
        }
    }

    /// Poll every register of `device` once.
    pub async fn poll_once(&self, device: &DeviceKey) -> CycleOutcome {
        if let Some(gate) = &self.gate {
            let status = gate.get();
            if !status.is_online() {
                tracing::warn!(device_id = %device, %status, "upstream not online, skipping cycle");
                return CycleOutcome::Skipped(status);
            }
        }

        let registers = match self
            .repo
            .registers_for_device(device.protocol, &device.device_id)
            .await
        {
            Ok(registers) => registers,
            Err(e) => {
                tracing::error!(device_id = %device, error = %e, "failed to read registers");
                return CycleOutcome::Aborted;
            }
        };

        if registers.is_empty() {
            tracing::debug!(device_id = %device, "device has no registers");
        }

        let mut delivered = 0;
        let mut pending = 0;
        for register_id in &registers {
            let document = self.assembler.assemble(register_id, device.protocol).await;
            match self.publisher.enqueue_and_flush(&document).await {
                Ok(report) => {
                    delivered += report.delivered;
                    pending = report.pending;
                }
                Err(e) => {
                    tracing::error!(device_id = %device, register_id = %register_id, error = %e, "outbox write failed");
                    return CycleOutcome::Aborted;
                }
            }
        }

        CycleOutcome::Polled {
            registers: registers.len(),
            delivered,
            pending,
        }
    }
}

/// Spawn the poll loop for one device.
///
/// The loop waits `interval`, runs one cycle, and repeats until `cancel`
/// fires. Cancellation is observed while waiting and while a cycle is in
/// flight; an interrupted cycle is dropped.
pub fn spawn_worker(
    poller: Arc<DevicePoller>,
    device: DeviceKey,
    interval: PollInterval,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!(device_id = %device, %interval, "worker started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval.as_duration()) => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = poller.poll_once(&device) => {
                    tracing::trace!(device_id = %device, ?outcome, "cycle finished");
                }
            }
        }
        tracing::debug!(device_id = %device, "worker stopped");
    })
}
