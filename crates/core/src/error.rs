//! Error types for hostname resolution

use thiserror::Error;

/// Result type alias for resolution operations
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Failures produced while resolving a hostname into a forwarding decision.
///
/// Every variant except [`ResolveError::Dns`] describes a problem with the
/// request or the domain's published configuration and is surfaced to the
/// client as a 400. `Dns` is a transport failure talking to the resolver
/// and is surfaced as a 500. None of these are ever cached or retried.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Host is an IPv4 or IPv6 literal
    #[error("host {0} is an IP literal and cannot be forwarded")]
    IpLiteral(String),

    /// Host exceeds the length limit
    #[error("host {0} exceeds the 64 character limit")]
    HostTooLong(String),

    /// Host has too many labels
    #[error("host {0} has too many labels")]
    TooManyLabels(String),

    /// CAA records disqualify the host
    #[error("CAA records for {host} do not authorize issuance: {}", records.join(", "))]
    CaaRefused {
        /// The queried host
        host: String,
        /// The disqualifying `issue` records, verbatim
        records: Vec<String>,
    },

    /// No usable forwarding TXT record was found
    #[error("no forward-domain TXT record found at _.{0}")]
    NoForwardRecord(String),

    /// The published destination is not an absolute http(s) URL
    #[error("forward-domain for {host} is not an absolute http(s) URL: {value}")]
    InvalidDestination {
        /// The queried host
        host: String,
        /// The offending `forward-domain` value
        value: String,
    },

    /// The published status code is outside the allow-list
    #[error("http-status {value} for {host} is not one of 301, 302, 307, 308")]
    DisallowedStatus {
        /// The queried host
        host: String,
        /// The offending `http-status` value
        value: String,
    },

    /// DNS collaborator transport failure
    #[error("DNS query failed: {0}")]
    Dns(String),
}

impl ResolveError {
    /// Whether this failure is internal (unreachable resolver) rather than
    /// a problem with the request or the domain's published records.
    pub fn is_internal(&self) -> bool {
        matches!(self, ResolveError::Dns(_))
    }
}
