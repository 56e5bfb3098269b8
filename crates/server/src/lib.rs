//! Signpost server: the resolution-and-caching pipeline behind a
//! domain-forwarding edge service.
//!
//! Operators publish a TXT record at `_.<host>` naming a destination URL and
//! redirect status; any hostname pointing at the service becomes a
//! forwarding alias once its DNS validates. This crate wires the pieces
//! together: configuration, the DNS-over-HTTPS collaborator, the ordered
//! validation pipeline, the bounded forwarding cache, the redirect resolver,
//! and the host-aware request dispatcher.

pub mod cache;
pub mod certs;
pub mod config;
pub mod dispatch;
pub mod dns;
pub mod resolver;
pub mod test_utils;
pub mod validate;

pub use cache::ForwardingCache;
pub use certs::{CertificateService, NoOpCertificateService};
pub use config::SignpostConfig;
pub use dispatch::{AppState, create_router};
pub use dns::{DnsAnswer, DnsResolver, DohClient, RecordType};
pub use resolver::{RedirectOutcome, RedirectResolver};
pub use validate::ValidationPipeline;
