//! Reachability status of a monitored upstream system.

use core::fmt;

/// Last observed status of a monitored system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceStatus {
    /// Not probed yet.
    #[default]
    Unknown,
    Online,
    Offline,
}

impl ServiceStatus {
    /// Compact encoding for lock-free storage.
    pub const fn as_u8(&self) -> u8 {
        match self {
            ServiceStatus::Unknown => 0,
            ServiceStatus::Online => 1,
            ServiceStatus::Offline => 2,
        }
    }

    /// Decode from [`as_u8`](Self::as_u8). Unknown codes map to `Unknown`.
    pub const fn from_u8(code: u8) -> Self {
        match code {
            1 => ServiceStatus::Online,
            2 => ServiceStatus::Offline,
            _ => ServiceStatus::Unknown,
        }
    }

    pub const fn is_online(&self) -> bool {
        matches!(self, ServiceStatus::Online)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceStatus::Unknown => "UNKNOWN",
            ServiceStatus::Online => "ONLINE",
            ServiceStatus::Offline => "OFFLINE",
        })
    }
}
