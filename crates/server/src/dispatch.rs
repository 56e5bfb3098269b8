//! Request dispatch: ACME challenges, the control plane, and forwarding
//!
//! Routing keys on the `Host` header, not only the path, so the router is
//! a single fallback handler over shared state rather than a path tree.

use crate::cache::ForwardingCache;
use crate::certs::CertificateService;
use crate::resolver::{RedirectOutcome, RedirectResolver};
use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Path prefix answered from the certificate subsystem.
const ACME_CHALLENGE_PREFIX: &str = "/.well-known/acme-challenge/";

/// Byte cap on control-plane request bodies.
const CONTROL_BODY_CAP: usize = 8 * 1024;

/// Shared dispatcher state
#[derive(Clone)]
pub struct AppState {
    /// Redirect resolver (cache + validation pipeline)
    pub resolver: Arc<RedirectResolver>,
    /// Forwarding cache, for control-plane invalidation and stats
    pub cache: ForwardingCache,
    /// Certificate subsystem collaborator
    pub certs: Arc<dyn CertificateService>,
    /// Hostname under which the control endpoints are served
    pub control_domain: String,
}

/// Create the dispatcher router.
pub fn create_router(state: AppState) -> Router {
    Router::new().fallback(dispatch).with_state(state)
}

/// Host-aware entry point for every request.
async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_string();

    // ACME challenges are served for any host and never touch the cache.
    if let Some(token) = path.strip_prefix(ACME_CHALLENGE_PREFIX) {
        return serve_challenge(&state, token).await;
    }

    let Some(host) = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    else {
        return (StatusCode::BAD_REQUEST, "missing Host header").into_response();
    };
    let host = normalize_host(&host);

    if host == state.control_domain.to_ascii_lowercase() {
        return control_plane(&state, request).await;
    }

    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str())
        .to_string();

    match state.resolver.resolve(&host, &path_and_query).await {
        Ok(RedirectOutcome::Redirect { status, location }) => {
            debug!("{} -> {} ({})", host, location, status);
            redirect_response(status, &location)
        }
        Ok(RedirectOutcome::Denied { redirect }) => match redirect {
            Some(location) => {
                info!("{} is blacklisted, redirecting to notice", host);
                redirect_response(302, &location)
            }
            None => {
                info!("{} is blacklisted", host);
                (StatusCode::FORBIDDEN, "domain is not served").into_response()
            }
        },
        Err(err) if err.is_internal() => {
            warn!("resolution of {} failed internally: {}", host, err);
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
        Err(err) => {
            debug!("resolution of {} rejected: {}", host, err);
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
    }
}

async fn serve_challenge(state: &AppState, token: &str) -> Response {
    match state.certs.challenge_response(token).await {
        Some(payload) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            payload,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "no pending challenge").into_response(),
    }
}

/// Control endpoints, reachable only under the configured control domain.
async fn control_plane(state: &AppState, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if method == Method::OPTIONS {
        return preflight_response();
    }

    match (method, path.as_str()) {
        (Method::GET, "/stat") => {
            let mut stats = state.certs.stats().await;
            if let Some(map) = stats.as_object_mut() {
                map.insert(
                    "cache".to_string(),
                    serde_json::json!({
                        "entries": state.cache.entry_count(),
                        "capacity": state.cache.capacity(),
                    }),
                );
            }
            axum::Json(stats).into_response()
        }
        (Method::GET, "/health") => (StatusCode::OK, "ok").into_response(),
        (Method::POST, "/flushcache") => flush_cache(state, request).await,
        (_, "/flushcache") => {
            (StatusCode::METHOD_NOT_ALLOWED, "only POST is accepted").into_response()
        }
        _ => (StatusCode::NOT_FOUND, "unknown control endpoint").into_response(),
    }
}

/// `POST /flushcache` with a form-encoded `domain` field.
///
/// A missing or malformed domain is silently ignored; the endpoint always
/// acknowledges so callers cannot probe which hosts are cached.
async fn flush_cache(state: &AppState, request: Request) -> Response {
    let body = match axum::body::to_bytes(request.into_body(), CONTROL_BODY_CAP).await {
        Ok(body) => body,
        Err(_) => {
            warn!("flushcache body exceeded {} bytes, closing", CONTROL_BODY_CAP);
            return oversized_body_response();
        }
    };

    let domain = form_urlencoded::parse(&body)
        .find(|(key, _)| key == "domain")
        .map(|(_, value)| value.into_owned());

    if let Some(domain) = domain {
        let domain = domain.trim().to_ascii_lowercase();
        if is_valid_fqdn(&domain) {
            if state.cache.get(&domain).is_some() {
                info!("flushing cache entry for {}", domain);
                state.cache.invalidate(&domain);
            }
        } else {
            debug!("ignoring flush for invalid domain {:?}", domain);
        }
    }

    (StatusCode::OK, "Cache cleared").into_response()
}

fn preflight_response() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
        .into_response()
}

/// Closest axum-expressible equivalent of aborting the connection: refuse
/// the body and mark the connection for closing.
fn oversized_body_response() -> Response {
    let mut response =
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

fn redirect_response(status: u16, location: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::MOVED_PERMANENTLY);
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = status;
            response.headers_mut().insert(header::LOCATION, value);
            response
        }
        // A destination that cannot be a header value is a configuration
        // problem on the domain's side.
        Err(_) => (StatusCode::BAD_REQUEST, "destination is not a valid URL").into_response(),
    }
}

/// Strip any port suffix (including bracketed IPv6 forms) and lowercase.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let stripped = if let Some(rest) = host.strip_prefix('[') {
        // [::1]:443 or [::1]
        rest.split(']').next().unwrap_or(rest)
    } else {
        match host.rsplit_once(':') {
            // a.example.com:8080 but not a bare IPv6 literal
            Some((name, port))
                if !name.contains(':') && !port.is_empty()
                    && port.chars().all(|c| c.is_ascii_digit()) =>
            {
                name
            }
            _ => host,
        }
    };
    stripped.to_ascii_lowercase()
}

/// Minimal FQDN syntax check for flush requests: at least two labels, each
/// 1-63 chars of letters, digits, or hyphens, no leading/trailing hyphen,
/// 253 chars total.
fn is_valid_fqdn(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-')
    })
}
