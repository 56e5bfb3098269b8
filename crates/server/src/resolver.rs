//! Redirect resolution: cache-or-validate orchestration and target
//! computation

use crate::cache::ForwardingCache;
use crate::validate::ValidationPipeline;
use signpost_core::decision::now_epoch_ms;
use signpost_core::error::Result;
use signpost_core::ForwardDecision;
use tracing::debug;

/// What the dispatcher should answer for a resolved host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// Redirect with the decision's status and a computed target.
    Redirect {
        /// One of 301, 302, 307, 308
        status: u16,
        /// Value for the `Location` header
        location: String,
    },
    /// Host is denied by policy: redirect to the notice URL when one is
    /// configured, plain 403 otherwise.
    Denied {
        /// Notice URL with the original host attached, when configured
        redirect: Option<String>,
    },
}

/// Orchestrates the cache and the validation pipeline into redirect
/// outcomes.
pub struct RedirectResolver {
    cache: ForwardingCache,
    pipeline: ValidationPipeline,
    blacklist_redirect_url: Option<String>,
}

impl RedirectResolver {
    /// Create a resolver over the given cache and pipeline.
    pub fn new(
        cache: ForwardingCache,
        pipeline: ValidationPipeline,
        blacklist_redirect_url: Option<String>,
    ) -> Self {
        Self {
            cache,
            pipeline,
            blacklist_redirect_url,
        }
    }

    /// Resolve `host` into an outcome, materializing a cache entry on miss
    /// or expiry. `path_and_query` is the original request path, used when
    /// the decision is wildcard-expand.
    ///
    /// Failures are never cached; a persistently broken host re-runs the
    /// full validation sequence on every request. Concurrent misses for the
    /// same host race and the last insert wins, which is acceptable since
    /// both derive from the same DNS truth.
    pub async fn resolve(&self, host: &str, path_and_query: &str) -> Result<RedirectOutcome> {
        let decision = match self.cache.get(host) {
            Some(decision) if !decision.is_expired(now_epoch_ms()) => decision,
            stale => {
                if stale.is_some() {
                    debug!("cache entry for {} expired, revalidating", host);
                }
                let decision = self.pipeline.resolve(host).await?;
                self.cache.insert(host, decision.clone());
                decision
            }
        };

        if decision.blacklisted {
            return Ok(RedirectOutcome::Denied {
                redirect: self
                    .blacklist_redirect_url
                    .as_ref()
                    .map(|url| format!("{url}?domain={host}")),
            });
        }

        let location = compute_target(&decision, path_and_query);
        Ok(RedirectOutcome::Redirect {
            status: decision.redirect_status,
            location,
        })
    }
}

/// Final redirect target: verbatim destination, or destination joined with
/// the original request path when the decision is wildcard-expand. The join
/// collapses duplicate slashes at the boundary.
fn compute_target(decision: &ForwardDecision, path_and_query: &str) -> String {
    if !decision.wildcard_expand {
        return decision.destination_url.clone();
    }
    let base = decision.destination_url.trim_end_matches('/');
    if path_and_query.is_empty() || path_and_query == "/" {
        return base.to_string();
    }
    if path_and_query.starts_with('/') {
        format!("{base}{path_and_query}")
    } else {
        format!("{base}/{path_and_query}")
    }
}
