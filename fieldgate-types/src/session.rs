use std::time::{Duration, Instant};

/// Cached upstream session credential.
///
/// `value` is the `name=value` cookie pair returned by the login endpoint,
/// ready to be sent back in a `Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub value: String,
    pub expires_at: Instant,
}

impl SessionToken {
    /// Create a token issued at `now` that lives for `ttl`.
    pub fn issued(value: impl Into<String>, now: Instant, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: now + ttl,
        }
    }

    /// Whether the token can still be used at `now`.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}
