//! The cached forwarding decision

/// A validated forwarding decision for a single host.
///
/// Created by the validation pipeline on a cache miss or expiry, immutable
/// afterward, and replaced wholesale on rebuild. `destination_url` always
/// starts with `http://` or `https://`; when `wildcard_expand` is set the
/// trailing `*` was stripped at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardDecision {
    /// Redirect target, absolute, without any wildcard marker.
    pub destination_url: String,
    /// Whether the original request path is appended to the destination.
    pub wildcard_expand: bool,
    /// Whether the host is denied by the configured domain policy.
    pub blacklisted: bool,
    /// Epoch milliseconds after which this decision must be rebuilt.
    pub expires_at_ms: i64,
    /// Redirect status code, one of 301, 302, 307, 308.
    pub redirect_status: u16,
}

impl ForwardDecision {
    /// Whether the decision has outlived its TTL at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at_ms
    }
}

/// Current time as epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
