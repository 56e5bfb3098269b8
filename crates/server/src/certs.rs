//! Certificate subsystem seam
//!
//! TLS termination and ACME issuance live outside this service; the
//! dispatcher only needs two things from them: the challenge payload for
//! `/.well-known/acme-challenge/<token>` requests, and a status snapshot
//! for the control-plane `/stat` endpoint.

use bytes::Bytes;
use tracing::warn;

/// Certificate subsystem interface
#[async_trait::async_trait]
pub trait CertificateService: Send + Sync {
    /// Challenge payload for an ACME HTTP-01 token, if one is pending.
    async fn challenge_response(&self, token: &str) -> Option<Bytes>;

    /// JSON status snapshot for the control plane.
    async fn stats(&self) -> serde_json::Value;
}

/// No-op certificate service for when no certificate subsystem is attached
pub struct NoOpCertificateService;

#[async_trait::async_trait]
impl CertificateService for NoOpCertificateService {
    async fn challenge_response(&self, token: &str) -> Option<Bytes> {
        warn!("certificate subsystem not attached: no challenge for {}", token);
        None
    }

    async fn stats(&self) -> serde_json::Value {
        serde_json::json!({})
    }
}
