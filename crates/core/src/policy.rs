//! Hierarchical blacklist/whitelist domain matching
//!
//! Policy lists are comma-separated hostnames. Matching walks the suffixes
//! of a candidate host from most specific (the full host) to least specific
//! (the top-level label) and stops at the first terminal entry.

use std::collections::HashMap;

/// Outcome of looking up a single suffix in a [`PolicyMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixMatch {
    /// This exact suffix is a configured entry; stop walking.
    Terminal,
    /// A more specific configured entry passes through this suffix; keep
    /// checking shorter suffixes.
    Passthrough,
    /// The map holds nothing for this suffix.
    NoEntry,
}

/// Immutable map from domain-label suffix to match boundary.
///
/// Built once from a configuration list and never mutated afterward.
#[derive(Debug, Default, Clone)]
pub struct PolicyMap {
    entries: HashMap<String, bool>,
}

impl PolicyMap {
    /// Build a policy map from a comma-separated host list.
    ///
    /// Each host is trimmed and lowercased; empty segments are skipped. For
    /// host `a.b.example.com` the suffixes `com`, `example.com`,
    /// `b.example.com`, and `a.b.example.com` all receive entries, with only
    /// the full host marked terminal. A suffix already terminal from another
    /// list entry stays terminal.
    pub fn from_csv(list: &str) -> Self {
        let mut entries: HashMap<String, bool> = HashMap::new();
        for raw in list.split(',') {
            let host = raw.trim().to_ascii_lowercase();
            if host.is_empty() {
                continue;
            }
            let labels: Vec<&str> = host.split('.').collect();
            for start in 0..labels.len() {
                let suffix = labels[start..].join(".");
                let terminal = start == 0;
                entries
                    .entry(suffix)
                    .and_modify(|t| *t |= terminal)
                    .or_insert(terminal);
            }
        }
        Self { entries }
    }

    /// Look up a single suffix.
    pub fn lookup(&self, suffix: &str) -> SuffixMatch {
        match self.entries.get(suffix) {
            Some(true) => SuffixMatch::Terminal,
            Some(false) => SuffixMatch::Passthrough,
            None => SuffixMatch::NoEntry,
        }
    }

    /// Walk the suffixes of `host` from most specific to least specific and
    /// report whether any terminal entry matches.
    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let labels: Vec<&str> = host.split('.').collect();
        for start in 0..labels.len() {
            let suffix = labels[start..].join(".");
            match self.lookup(&suffix) {
                SuffixMatch::Terminal => return true,
                SuffixMatch::Passthrough | SuffixMatch::NoEntry => {}
            }
        }
        false
    }

    /// Number of suffix entries in the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Blacklist/whitelist matcher, built once from configuration at startup.
///
/// When a whitelist is supplied its map is authoritative with inverted
/// polarity: a terminal whitelist match means the host is allowed, and
/// exhausting all suffixes without a match means the host is denied.
#[derive(Debug, Clone)]
pub struct PolicyMatcher {
    blacklist: PolicyMap,
    whitelist: Option<PolicyMap>,
}

impl PolicyMatcher {
    /// Build a matcher from a blacklist CSV and an optional whitelist CSV.
    pub fn new(blacklist: &str, whitelist: Option<&str>) -> Self {
        Self {
            blacklist: PolicyMap::from_csv(blacklist),
            whitelist: whitelist.map(PolicyMap::from_csv),
        }
    }

    /// Whether `host` is denied service under the configured policy.
    pub fn is_blacklisted(&self, host: &str) -> bool {
        match &self.whitelist {
            Some(whitelist) => !whitelist.matches(host),
            None => self.blacklist.matches(host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_and_passthrough_entries() {
        let map = PolicyMap::from_csv("a.b.example.com");
        assert_eq!(map.lookup("a.b.example.com"), SuffixMatch::Terminal);
        assert_eq!(map.lookup("b.example.com"), SuffixMatch::Passthrough);
        assert_eq!(map.lookup("example.com"), SuffixMatch::Passthrough);
        assert_eq!(map.lookup("com"), SuffixMatch::Passthrough);
        assert_eq!(map.lookup("other.com"), SuffixMatch::NoEntry);
    }

    #[test]
    fn test_terminal_survives_longer_sibling() {
        // example.com is configured itself and also sits on the path of
        // deep.example.com; it must stay terminal.
        let map = PolicyMap::from_csv("example.com,deep.example.com");
        assert_eq!(map.lookup("example.com"), SuffixMatch::Terminal);
        assert_eq!(map.lookup("deep.example.com"), SuffixMatch::Terminal);
    }

    #[test]
    fn test_blacklist_matches_subdomains() {
        let matcher = PolicyMatcher::new("bad.example.com", None);
        assert!(matcher.is_blacklisted("bad.example.com"));
        assert!(matcher.is_blacklisted("sub.bad.example.com"));
        assert!(matcher.is_blacklisted("Deep.Sub.BAD.example.com"));
        assert!(!matcher.is_blacklisted("example.com"));
        assert!(!matcher.is_blacklisted("good.example.com"));
    }

    #[test]
    fn test_passthrough_does_not_match() {
        // Only the deep entry is configured; walking example.com must pass
        // through without matching.
        let matcher = PolicyMatcher::new("a.example.com", None);
        assert!(!matcher.is_blacklisted("example.com"));
        assert!(!matcher.is_blacklisted("b.example.com"));
        assert!(matcher.is_blacklisted("a.example.com"));
        assert!(matcher.is_blacklisted("x.a.example.com"));
    }

    #[test]
    fn test_whitelist_inverts_polarity() {
        let matcher = PolicyMatcher::new("", Some("good.example.com"));
        assert!(!matcher.is_blacklisted("good.example.com"));
        assert!(!matcher.is_blacklisted("sub.good.example.com"));
        // Default-deny: anything off the whitelist is blacklisted.
        assert!(matcher.is_blacklisted("other.example.com"));
        assert!(matcher.is_blacklisted("example.com"));
    }

    #[test]
    fn test_whitelist_overrides_blacklist() {
        // Once a whitelist exists the blacklist map is not consulted.
        let matcher = PolicyMatcher::new("good.example.com", Some("good.example.com"));
        assert!(!matcher.is_blacklisted("good.example.com"));
    }

    #[test]
    fn test_csv_trimming_and_case() {
        let matcher = PolicyMatcher::new(" Bad.Example.COM , ,other.net ", None);
        assert!(matcher.is_blacklisted("bad.example.com"));
        assert!(matcher.is_blacklisted("other.net"));
        assert!(matcher.is_blacklisted("www.other.net"));
        assert!(!matcher.is_blacklisted("example.com"));
    }

    #[test]
    fn test_empty_blacklist_matches_nothing() {
        let matcher = PolicyMatcher::new("", None);
        assert!(!matcher.is_blacklisted("anything.example.com"));
    }
}
