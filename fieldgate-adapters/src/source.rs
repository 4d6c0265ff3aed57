//! Upstream register reads.

use async_trait::async_trait;
use serde_json::Value;

/// Source of live register values.
///
/// `fetch_value` performs exactly one read. It never retries; a `None`
/// means "no value this cycle" and the caller decides what to do with it.
#[async_trait]
pub trait ValueSource: Send + Sync {
    /// Read the current value of `register_id`.
    ///
    /// Returns the `value` field reported by the upstream server, which may
    /// be JSON `null`. Returns `None` when the read could not be made or the
    /// response was malformed.
    async fn fetch_value(&self, register_id: &str) -> Option<Value>;

    /// Drop any cached session and authenticate again.
    ///
    /// Returns whether a usable session is held afterwards.
    async fn reauthenticate(&self) -> bool {
        true
    }
}
