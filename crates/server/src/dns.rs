//! DNS-over-HTTPS collaborator
//!
//! Signpost never resolves DNS itself; it asks a DoH endpoint (JSON API)
//! for TXT and CAA records and interprets the answers. The collaborator is
//! a trait so the pipeline can be exercised against an in-memory resolver
//! in tests.

use serde::Deserialize;
use signpost_core::error::{ResolveError, Result};
use std::time::Duration;
use tracing::debug;

/// DNS record types Signpost queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// TXT, wire type 16
    Txt,
    /// CAA, wire type 257
    Caa,
}

impl RecordType {
    /// Numeric wire code, as it appears in DoH JSON answers.
    pub fn wire_code(self) -> u16 {
        match self {
            RecordType::Txt => 16,
            RecordType::Caa => 257,
        }
    }

    /// Presentation name, as the DoH `type` query parameter expects.
    pub fn name(self) -> &'static str {
        match self {
            RecordType::Txt => "TXT",
            RecordType::Caa => "CAA",
        }
    }
}

/// A single answer record from the DoH collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct DnsAnswer {
    /// Owner name of the record
    pub name: String,
    /// Numeric record type
    #[serde(rename = "type")]
    pub record_type: u16,
    /// Record data in presentation form
    pub data: String,
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status")]
    #[allow(dead_code)]
    status: u32,
    /// Absent when the name has no records of the requested type
    #[serde(rename = "Answer")]
    answer: Option<Vec<DnsAnswer>>,
}

/// DNS resolver interface
#[async_trait::async_trait]
pub trait DnsResolver: Send + Sync {
    /// Query `name` for records of `record_type`.
    ///
    /// `Ok(None)` means the response carried no answer section; transport
    /// failures surface as [`ResolveError::Dns`].
    async fn query(&self, name: &str, record_type: RecordType) -> Result<Option<Vec<DnsAnswer>>>;
}

/// DoH client over the JSON API (`application/dns-json`)
pub struct DohClient {
    client: reqwest::Client,
    endpoint: String,
}

impl DohClient {
    /// Create a client against the given DoH endpoint.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ResolveError::Dns(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait::async_trait]
impl DnsResolver for DohClient {
    async fn query(&self, name: &str, record_type: RecordType) -> Result<Option<Vec<DnsAnswer>>> {
        debug!("DoH query: {} {}", name, record_type.name());

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("name", name), ("type", record_type.name())])
            .header(http::header::ACCEPT, "application/dns-json")
            .send()
            .await
            .map_err(|e| ResolveError::Dns(format!("DoH request for {name} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Dns(format!(
                "DoH endpoint returned {status} for {name}"
            )));
        }

        let body: DohResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::Dns(format!("invalid DoH response for {name}: {e}")))?;

        // The answer section may carry CNAME chain links alongside the
        // requested type; keep only what was asked for.
        Ok(body.answer.map(|answers| {
            answers
                .into_iter()
                .filter(|a| a.record_type == record_type.wire_code())
                .collect()
        }))
    }
}
