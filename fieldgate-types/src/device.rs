//! Polled devices.

use core::fmt;

use crate::{PollInterval, Protocol};

/// Identity of a polled device.
///
/// Device ids are only unique within one protocol's table, so the
/// protocol is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceKey {
    pub protocol: Protocol,
    pub device_id: String,
}

impl DeviceKey {
    pub fn new(protocol: Protocol, device_id: impl Into<String>) -> Self {
        Self {
            protocol,
            device_id: device_id.into(),
        }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.protocol, self.device_id)
    }
}

/// A device and its normalized poll interval, as read on one scheduling tick.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    pub device_id: String,
    pub protocol: Protocol,
    pub poll_interval: PollInterval,
}

impl DeviceDescriptor {
    pub fn new(
        protocol: Protocol,
        device_id: impl Into<String>,
        poll_interval: PollInterval,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            protocol,
            poll_interval,
        }
    }

    /// The scheduling key of this device.
    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(self.protocol, self.device_id.clone())
    }
}
