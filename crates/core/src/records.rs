//! Parsing for the DNS records Signpost consumes
//!
//! Forwarding configuration arrives as a TXT record at `_.<host>` holding a
//! semicolon-delimited `key=value` list. Issuance eligibility arrives as CAA
//! records in their presentation form. DNS servers may or may not include
//! surrounding quotes in returned record data, so both parsers strip them
//! before interpreting the content.

/// Recognized key for the forwarding destination.
const KEY_FORWARD_DOMAIN: &str = "forward-domain";

/// Recognized key for the requested redirect status.
const KEY_HTTP_STATUS: &str = "http-status";

/// Fields recognized in a forwarding TXT record.
///
/// Unrecognized keys are ignored; a value may itself contain `=` since only
/// the first `=` in a segment splits key from value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxtRecordFields {
    /// Destination URL, possibly with a trailing `*` still attached.
    pub forward_domain: String,
    /// Requested redirect status, verbatim, when present.
    pub http_status: Option<String>,
}

impl TxtRecordFields {
    /// Parse a raw TXT record value.
    ///
    /// Returns `None` when the record carries no `forward-domain` key.
    pub fn parse(data: &str) -> Option<Self> {
        let data = data.trim().trim_matches('"');
        let mut forward_domain = None;
        let mut http_status = None;
        for segment in data.split(';') {
            let segment = segment.trim();
            let Some((key, value)) = segment.split_once('=') else {
                continue;
            };
            match key.trim() {
                KEY_FORWARD_DOMAIN => forward_domain = Some(value.trim().to_string()),
                KEY_HTTP_STATUS => http_status = Some(value.trim().to_string()),
                _ => {}
            }
        }
        forward_domain.map(|forward_domain| Self {
            forward_domain,
            http_status,
        })
    }
}

/// A CAA record in presentation form: `<flags> <tag> <value>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaaRecord {
    /// Critical flag byte, verbatim.
    pub flags: String,
    /// Property tag, e.g. `issue` or `issuewild`.
    pub tag: String,
    /// Property value, quotes preserved for diagnostics.
    pub value: String,
}

impl CaaRecord {
    /// Parse the presentation form returned by the DNS collaborator.
    pub fn parse(data: &str) -> Option<Self> {
        let data = data.trim();
        let mut parts = data.splitn(3, char::is_whitespace);
        let flags = parts.next()?.to_string();
        let tag = parts.next()?.to_string();
        let value = parts.next().unwrap_or("").trim().to_string();
        Some(Self { flags, tag, value })
    }
}

/// Check whether a set of CAA records authorizes the accepted issuer.
///
/// Only `issue` tags participate. The host is authorized when no `issue`
/// record exists, or when at least one permits the accepted issuer: the
/// value, after stripping optional surrounding quotes, must equal the issuer
/// name case-sensitively, optionally suffixed with
/// `;validationmethods=http-01`. On refusal the full list of `issue`
/// records is returned for diagnostics.
pub fn caa_authorizes(records: &[CaaRecord], accepted_issuer: &str) -> Result<(), Vec<String>> {
    let issue_records: Vec<&CaaRecord> = records.iter().filter(|r| r.tag == "issue").collect();
    if issue_records.is_empty() {
        return Ok(());
    }
    let permitted = issue_records
        .iter()
        .any(|r| issuer_permits(&r.value, accepted_issuer));
    if permitted {
        Ok(())
    } else {
        Err(issue_records
            .iter()
            .map(|r| format!("{} {} {}", r.flags, r.tag, r.value))
            .collect())
    }
}

fn issuer_permits(value: &str, accepted_issuer: &str) -> bool {
    let value = value.trim().trim_matches('"');
    if value == accepted_issuer {
        return true;
    }
    match value.split_once(';') {
        Some((issuer, params)) => {
            issuer.trim() == accepted_issuer && params.trim() == "validationmethods=http-01"
        }
        None => false,
    }
}
