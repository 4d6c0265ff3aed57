//! Shared reachability status of monitored systems.
//!
//! Each monitored system gets one [`StatusFlag`]. The liveness monitor is
//! the only writer; poll workers read the flag before every cycle. Reads
//! are a single atomic load and may lag by up to one monitor period.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use fieldgate_types::ServiceStatus;
use parking_lot::RwLock;

/// Lock-free cell holding one [`ServiceStatus`].
#[derive(Debug, Default)]
pub struct StatusFlag(AtomicU8);

impl StatusFlag {
    pub fn new(status: ServiceStatus) -> Self {
        Self(AtomicU8::new(status.as_u8()))
    }

    pub fn get(&self) -> ServiceStatus {
        ServiceStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Store `status` and return the previous value.
    pub fn set(&self, status: ServiceStatus) -> ServiceStatus {
        ServiceStatus::from_u8(self.0.swap(status.as_u8(), Ordering::AcqRel))
    }
}

/// Status flags of all monitored systems, keyed by name.
#[derive(Debug, Default)]
pub struct StatusBoard {
    systems: RwLock<BTreeMap<String, Arc<StatusFlag>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the flag for `name`, creating it as `Unknown` if needed.
    pub fn register(&self, name: &str) -> Arc<StatusFlag> {
        // Fast path
        {
            let systems = self.systems.read();
            if let Some(flag) = systems.get(name) {
                return flag.clone();
            }
        }

        let mut systems = self.systems.write();
        systems
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(StatusFlag::default()))
            .clone()
    }

    /// Current status of `name`. Unregistered systems are `Unknown`.
    pub fn get(&self, name: &str) -> ServiceStatus {
        self.systems
            .read()
            .get(name)
            .map(|flag| flag.get())
            .unwrap_or_default()
    }

    /// Current status of every registered system.
    pub fn snapshot(&self) -> BTreeMap<String, ServiceStatus> {
        self.systems
            .read()
            .iter()
            .map(|(name, flag)| (name.clone(), flag.get()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_flag_is_unknown() {
        let board = StatusBoard::new();
        let flag = board.register("scada");
        assert_eq!(flag.get(), ServiceStatus::Unknown);
    }

    #[test]
    fn set_returns_previous() {
        let flag = StatusFlag::default();
        assert_eq!(flag.set(ServiceStatus::Online), ServiceStatus::Unknown);
        assert_eq!(flag.set(ServiceStatus::Offline), ServiceStatus::Online);
        assert_eq!(flag.get(), ServiceStatus::Offline);
    }

    #[test]
    fn register_twice_shares_flag() {
        let board = StatusBoard::new();
        let a = board.register("scada");
        let b = board.register("scada");

        a.set(ServiceStatus::Online);
        assert_eq!(b.get(), ServiceStatus::Online);
        assert_eq!(board.get("scada"), ServiceStatus::Online);
    }

    #[test]
    fn unregistered_system_is_unknown() {
        let board = StatusBoard::new();
        assert_eq!(board.get("cma"), ServiceStatus::Unknown);
        assert!(board.snapshot().is_empty());
    }

    #[test]
    fn snapshot_lists_all_systems() {
        let board = StatusBoard::new();
        board.register("cma").set(ServiceStatus::Offline);
        board.register("scada").set(ServiceStatus::Online);

        let snapshot = board.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["cma"], ServiceStatus::Offline);
        assert_eq!(snapshot["scada"], ServiceStatus::Online);
    }

    #[test]
    fn flags_are_shared_across_threads() {
        let board = Arc::new(StatusBoard::new());
        let flag = board.register("scada");

        let writer = {
            let flag = flag.clone();
            std::thread::spawn(move || {
                flag.set(ServiceStatus::Online);
            })
        };
        writer.join().unwrap();

        assert_eq!(board.get("scada"), ServiceStatus::Online);
    }
}
