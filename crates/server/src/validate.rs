//! The ordered eligibility checks that turn a hostname into a forwarding
//! decision
//!
//! Checks short-circuit on first failure and are never retried. The two
//! DNS queries (CAA, then TXT at the `_.` label) are the only await points
//! in the pipeline.

use crate::dns::{DnsResolver, RecordType};
use signpost_core::decision::now_epoch_ms;
use signpost_core::error::{ResolveError, Result};
use signpost_core::records::{CaaRecord, TxtRecordFields, caa_authorizes};
use signpost_core::{
    ALLOWED_REDIRECT_STATUSES, DEFAULT_REDIRECT_STATUS, ForwardDecision, PolicyMatcher,
};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Maximum hostname length eligible for forwarding.
const MAX_HOST_LEN: usize = 64;

/// Hosts with this many dot separators or more are rejected.
const MAX_DOT_SEPARATORS: usize = 10;

/// Reserved label under which forwarding TXT records are published.
const TXT_LABEL_PREFIX: &str = "_.";

/// Performs the multi-step DNS validation sequence for a hostname.
pub struct ValidationPipeline {
    dns: Arc<dyn DnsResolver>,
    policy: Arc<PolicyMatcher>,
    ttl: Duration,
    accepted_issuer: String,
}

impl ValidationPipeline {
    /// Create a pipeline over the given collaborators.
    pub fn new(
        dns: Arc<dyn DnsResolver>,
        policy: Arc<PolicyMatcher>,
        ttl: Duration,
        accepted_issuer: impl Into<String>,
    ) -> Self {
        Self {
            dns,
            policy,
            ttl,
            accepted_issuer: accepted_issuer.into(),
        }
    }

    /// Run the ordered checks for `host`, producing a forwarding decision
    /// or the first failure encountered.
    pub async fn resolve(&self, host: &str) -> Result<ForwardDecision> {
        // 1. IP literals are never eligible; no DNS query is issued for them.
        if host.parse::<IpAddr>().is_ok() {
            return Err(ResolveError::IpLiteral(host.to_string()));
        }

        // 2. Length limit.
        if host.len() > MAX_HOST_LEN {
            return Err(ResolveError::HostTooLong(host.to_string()));
        }

        // 3. Label-count limit.
        if host.matches('.').count() >= MAX_DOT_SEPARATORS {
            return Err(ResolveError::TooManyLabels(host.to_string()));
        }

        // 4. CAA authorization; an absent answer is permissive.
        self.check_caa(host).await?;

        // 5-7. TXT record at the reserved label, URL shape, status code.
        let fields = self.fetch_txt_fields(host).await?;
        let (destination_url, wildcard_expand) = parse_destination(host, &fields.forward_domain)?;
        let redirect_status = parse_status(host, fields.http_status.as_deref())?;

        // 8. Policy check and expiry stamp.
        let blacklisted = self.policy.is_blacklisted(host);
        let expires_at_ms = now_epoch_ms() + self.ttl.as_millis() as i64;

        debug!(
            "validated {}: -> {} (status {}, wildcard {}, blacklisted {})",
            host, destination_url, redirect_status, wildcard_expand, blacklisted
        );

        Ok(ForwardDecision {
            destination_url,
            wildcard_expand,
            blacklisted,
            expires_at_ms,
            redirect_status,
        })
    }

    async fn check_caa(&self, host: &str) -> Result<()> {
        let answers = self.dns.query(host, RecordType::Caa).await?;
        let Some(answers) = answers else {
            return Ok(());
        };
        let records: Vec<CaaRecord> = answers
            .iter()
            .filter_map(|a| CaaRecord::parse(&a.data))
            .collect();
        caa_authorizes(&records, &self.accepted_issuer).map_err(|records| {
            ResolveError::CaaRefused {
                host: host.to_string(),
                records,
            }
        })
    }

    async fn fetch_txt_fields(&self, host: &str) -> Result<TxtRecordFields> {
        let name = format!("{TXT_LABEL_PREFIX}{host}");
        let answers = self.dns.query(&name, RecordType::Txt).await?;
        answers
            .iter()
            .flatten()
            .find_map(|a| TxtRecordFields::parse(&a.data))
            .ok_or_else(|| ResolveError::NoForwardRecord(host.to_string()))
    }
}

/// Check URL shape and strip a trailing wildcard marker.
fn parse_destination(host: &str, value: &str) -> Result<(String, bool)> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ResolveError::InvalidDestination {
            host: host.to_string(),
            value: value.to_string(),
        });
    }
    match value.strip_suffix('*') {
        Some(base) => Ok((base.to_string(), true)),
        None => Ok((value.to_string(), false)),
    }
}

/// Enforce the redirect status allow-list; absent means 301.
fn parse_status(host: &str, value: Option<&str>) -> Result<u16> {
    let Some(value) = value else {
        return Ok(DEFAULT_REDIRECT_STATUS);
    };
    value
        .parse::<u16>()
        .ok()
        .filter(|status| ALLOWED_REDIRECT_STATUSES.contains(status))
        .ok_or_else(|| ResolveError::DisallowedStatus {
            host: host.to_string(),
            value: value.to_string(),
        })
}
