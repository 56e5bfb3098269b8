//! Test utilities: in-memory stand-ins for the external collaborators

use crate::certs::CertificateService;
use crate::dns::{DnsAnswer, DnsResolver, RecordType};
use bytes::Bytes;
use signpost_core::error::{ResolveError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory DNS resolver mapping (name, type) to an answer section.
///
/// A name/type pair with no entry behaves like a response without an
/// `Answer` field. `fail_all` simulates an unreachable collaborator.
/// Every call is counted so tests can assert that cached resolutions
/// issue no queries.
#[derive(Default)]
pub struct MockDnsResolver {
    answers: HashMap<(String, u16), Vec<DnsAnswer>>,
    fail_all: bool,
    queries: AtomicUsize,
}

impl MockDnsResolver {
    /// Add a TXT answer for `name`.
    pub fn with_txt(mut self, name: &str, data: &str) -> Self {
        self.push(name, RecordType::Txt, data);
        self
    }

    /// Add a CAA answer for `name`.
    pub fn with_caa(mut self, name: &str, data: &str) -> Self {
        self.push(name, RecordType::Caa, data);
        self
    }

    /// Make every query fail with a transport error.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Number of queries issued so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn push(&mut self, name: &str, record_type: RecordType, data: &str) {
        self.answers
            .entry((name.to_string(), record_type.wire_code()))
            .or_default()
            .push(DnsAnswer {
                name: name.to_string(),
                record_type: record_type.wire_code(),
                data: data.to_string(),
            });
    }
}

#[async_trait::async_trait]
impl DnsResolver for MockDnsResolver {
    async fn query(&self, name: &str, record_type: RecordType) -> Result<Option<Vec<DnsAnswer>>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(ResolveError::Dns("resolver unreachable".to_string()));
        }
        Ok(self
            .answers
            .get(&(name.to_string(), record_type.wire_code()))
            .cloned())
    }
}

/// Certificate service answering from a fixed token table.
#[derive(Default)]
pub struct StaticCertificateService {
    challenges: HashMap<String, Bytes>,
    stats: serde_json::Value,
}

impl StaticCertificateService {
    /// Register a challenge payload for `token`.
    pub fn with_challenge(mut self, token: &str, payload: &[u8]) -> Self {
        self.challenges
            .insert(token.to_string(), Bytes::copy_from_slice(payload));
        self
    }

    /// Set the `/stat` snapshot payload.
    pub fn with_stats(mut self, stats: serde_json::Value) -> Self {
        self.stats = stats;
        self
    }
}

#[async_trait::async_trait]
impl CertificateService for StaticCertificateService {
    async fn challenge_response(&self, token: &str) -> Option<Bytes> {
        self.challenges.get(token).cloned()
    }

    async fn stats(&self) -> serde_json::Value {
        self.stats.clone()
    }
}
