//! Field protocols a device can speak.

use core::fmt;
use core::str::FromStr;

/// Protocol of a polled device.
///
/// Each protocol has its own device and datapoint tables in the
/// configuration store, with different column names for the poll period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Modbus,
    Dnp3,
}

impl Protocol {
    /// All supported protocols, in scheduling order.
    pub const ALL: [Protocol; 2] = [Protocol::Modbus, Protocol::Dnp3];

    /// The canonical upper-case name (`"MODBUS"`, `"DNP3"`).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Protocol::Modbus => "MODBUS",
            Protocol::Dnp3 => "DNP3",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a protocol name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProtocolError(pub String);

impl fmt::Display for ParseProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown protocol '{}'", self.0)
    }
}

impl std::error::Error for ParseProtocolError {}

impl FromStr for Protocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MODBUS" | "MODBUS_IP" => Ok(Protocol::Modbus),
            "DNP3" => Ok(Protocol::Dnp3),
            _ => Err(ParseProtocolError(s.to_string())),
        }
    }
}
