//! Core domain logic for Signpost: hierarchical domain-policy matching,
//! TXT/CAA record parsing, and the forwarding decision type.
//!
//! This crate is pure and synchronous; all I/O (DNS queries, HTTP serving,
//! caching) lives in `signpost-server`.

pub mod decision;
pub mod error;
pub mod policy;
pub mod records;

pub use decision::ForwardDecision;
pub use error::ResolveError;
pub use policy::{PolicyMap, PolicyMatcher, SuffixMatch};
pub use records::{CaaRecord, TxtRecordFields};

/// Redirect status codes a forwarding record may request.
pub const ALLOWED_REDIRECT_STATUSES: [u16; 4] = [301, 302, 307, 308];

/// Default redirect status when a TXT record carries no `http-status` key.
pub const DEFAULT_REDIRECT_STATUS: u16 = 301;
