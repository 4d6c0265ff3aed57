//! # fieldgate-types
//!
//! Core types shared by the fieldgate crates: protocols and poll intervals,
//! device descriptors, upstream status, session tokens, configuration
//! records, outbox records and the payload document published to the broker.
//!
//! ## Example
//!
//! ```rust
//! use fieldgate_types::{convert_to_seconds, IntervalUnit, PollInterval};
//! use std::time::Duration;
//!
//! assert_eq!(convert_to_seconds(1.0, IntervalUnit::Hours), 3600.0);
//!
//! let interval = PollInterval::from_parts(1.0, IntervalUnit::Minutes);
//! assert_eq!(interval.as_duration(), Duration::from_secs(60));
//! ```
//!
//! ## Payload shapes
//!
//! A [`PayloadDocument`] is one of three shapes: a full reading joined with
//! its gateway and device metadata, a reduced "unavailable" document when
//! the upstream value could not be read, and a reduced "error" document when
//! the reading could not be built. All three always serialize.

mod device;
mod interval;
mod outbox;
mod payload;
mod protocol;
mod records;
mod session;
mod status;

pub use device::{DeviceDescriptor, DeviceKey};
pub use interval::{convert_to_seconds, IntervalUnit, PollInterval, MAX_POLL_INTERVAL, MIN_POLL_INTERVAL};
pub use outbox::OutboxRecord;
pub use payload::{
    DatapointEntry, DatasourceEntry, Field, GatewayEntry, PayloadDocument, Reading,
    ReadingBuilder, NO_DATA,
};
pub use protocol::{ParseProtocolError, Protocol};
pub use records::{DatapointRecord, DatasourceRecord, GatewayRecord, Tag, TagSet};
pub use session::SessionToken;
pub use status::ServiceStatus;
