//! Router-level tests for the request dispatcher

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::Router;
use signpost_core::PolicyMatcher;
use signpost_server::test_utils::{MockDnsResolver, StaticCertificateService};
use signpost_server::{
    AppState, ForwardingCache, RedirectResolver, ValidationPipeline, create_router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const CONTROL_DOMAIN: &str = "control.signpost.example";

struct TestApp {
    router: Router,
    dns: Arc<MockDnsResolver>,
}

fn app(dns: MockDnsResolver) -> TestApp {
    app_with(dns, "", None, StaticCertificateService::default())
}

fn app_with(
    dns: MockDnsResolver,
    blacklist: &str,
    blacklist_redirect_url: Option<&str>,
    certs: StaticCertificateService,
) -> TestApp {
    let dns = Arc::new(dns);
    let cache = ForwardingCache::new(64);
    let pipeline = ValidationPipeline::new(
        dns.clone(),
        Arc::new(PolicyMatcher::new(blacklist, None)),
        Duration::from_secs(3600),
        "letsencrypt.org",
    );
    let resolver = Arc::new(RedirectResolver::new(
        cache.clone(),
        pipeline,
        blacklist_redirect_url.map(str::to_string),
    ));
    let state = AppState {
        resolver,
        cache,
        certs: Arc::new(certs),
        control_domain: CONTROL_DOMAIN.to_string(),
    };
    TestApp {
        router: create_router(state),
        dns,
    }
}

fn request(method: &str, host: Option<&str>, path: &str) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(host) = host {
        builder = builder.header(header::HOST, host);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_acme_challenge_served_from_certificate_subsystem() {
    let certs = StaticCertificateService::default().with_challenge("tok123", b"tok123.keyauth");
    let app = app_with(MockDnsResolver::default(), "", None, certs);

    let response = app
        .router
        .clone()
        .oneshot(request(
            "GET",
            Some("anything.example.com"),
            "/.well-known/acme-challenge/tok123",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(body_string(response).await, "tok123.keyauth");

    // Unknown token is a 404 and never touched the resolver.
    let response = app
        .router
        .oneshot(request(
            "GET",
            Some("anything.example.com"),
            "/.well-known/acme-challenge/nope",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.dns.query_count(), 0);
}

#[tokio::test]
async fn test_missing_host_header() {
    let app = app(MockDnsResolver::default());
    let response = app.router.oneshot(request("GET", None, "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app(MockDnsResolver::default());
    let response = app
        .router
        .oneshot(request("GET", Some(CONTROL_DOMAIN), "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_stat_endpoint_merges_cache_stats() {
    let certs =
        StaticCertificateService::default().with_stats(serde_json::json!({"certificates": 3}));
    let app = app_with(MockDnsResolver::default(), "", None, certs);
    let response = app
        .router
        .oneshot(request("GET", Some(CONTROL_DOMAIN), "/stat"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["certificates"], 3);
    assert_eq!(body["cache"]["capacity"], 64);
}

#[tokio::test]
async fn test_preflight_on_control_domain() {
    let app = app(MockDnsResolver::default());
    let response = app
        .router
        .oneshot(request("OPTIONS", Some(CONTROL_DOMAIN), "/flushcache"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_flushcache_rejects_other_methods() {
    let app = app(MockDnsResolver::default());
    let response = app
        .router
        .oneshot(request("GET", Some(CONTROL_DOMAIN), "/flushcache"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_control_path() {
    let app = app(MockDnsResolver::default());
    let response = app
        .router
        .oneshot(request("GET", Some(CONTROL_DOMAIN), "/other"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_redirect_with_published_status() {
    let dns = MockDnsResolver::default().with_txt(
        "_.shop.example.com",
        "forward-domain=https://dest.example/app;http-status=302",
    );
    let app = app(dns);
    let response = app
        .router
        .oneshot(request("GET", Some("shop.example.com"), "/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://dest.example/app"
    );
}

#[tokio::test]
async fn test_wildcard_appends_request_path() {
    let dns = MockDnsResolver::default()
        .with_txt("_.shop.example.com", "forward-domain=https://dest.example/app*");
    let app = app(dns);
    let response = app
        .router
        .oneshot(request("GET", Some("shop.example.com"), "/x?y=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://dest.example/app/x?y=1"
    );
}

#[tokio::test]
async fn test_host_port_is_stripped() {
    let dns = MockDnsResolver::default()
        .with_txt("_.shop.example.com", "forward-domain=https://dest.example");
    let app = app(dns);
    let response = app
        .router
        .oneshot(request("GET", Some("Shop.Example.com:8443"), "/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
}

#[tokio::test]
async fn test_ip_literal_host_rejected_without_dns() {
    let app = app(MockDnsResolver::default());
    let response = app
        .router
        .oneshot(request("GET", Some("192.0.2.1"), "/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("IP literal"));
    assert_eq!(app.dns.query_count(), 0);
}

#[tokio::test]
async fn test_blacklisted_host_forbidden_without_location() {
    let dns = MockDnsResolver::default()
        .with_txt("_.bad.example.com", "forward-domain=https://dest.example");
    let app = app_with(dns, "bad.example.com", None, StaticCertificateService::default());
    let response = app
        .router
        .oneshot(request("GET", Some("bad.example.com"), "/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!response.headers().contains_key(header::LOCATION));
}

#[tokio::test]
async fn test_unreachable_resolver_is_internal_error() {
    let app = app(MockDnsResolver::failing());
    let response = app
        .router
        .oneshot(request("GET", Some("shop.example.com"), "/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_flushcache_forces_revalidation() {
    let dns = MockDnsResolver::default()
        .with_txt("_.shop.example.com", "forward-domain=https://dest.example");
    let app = app(dns);

    // Prime the cache.
    let response = app
        .router
        .clone()
        .oneshot(request("GET", Some("shop.example.com"), "/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    let queries_primed = app.dns.query_count();

    // A second request is served from the cache.
    app.router
        .clone()
        .oneshot(request("GET", Some("shop.example.com"), "/"))
        .await
        .unwrap();
    assert_eq!(app.dns.query_count(), queries_primed);

    // Flush the entry through the control plane.
    let flush = Request::builder()
        .method("POST")
        .uri("/flushcache")
        .header(header::HOST, CONTROL_DOMAIN)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("domain=shop.example.com"))
        .unwrap();
    let response = app.router.clone().oneshot(flush).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Cache cleared");

    // The next request re-runs the full validation sequence.
    app.router
        .clone()
        .oneshot(request("GET", Some("shop.example.com"), "/"))
        .await
        .unwrap();
    assert!(app.dns.query_count() > queries_primed);
}

#[tokio::test]
async fn test_flushcache_acks_unknown_and_invalid_domains() {
    let app = app(MockDnsResolver::default());
    for body in ["domain=not-cached.example.com", "domain=not a domain", "other=field"] {
        let flush = Request::builder()
            .method("POST")
            .uri("/flushcache")
            .header(header::HOST, CONTROL_DOMAIN)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        let response = app.router.clone().oneshot(flush).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "body: {body}");
        assert_eq!(body_string(response).await, "Cache cleared");
    }
}

#[tokio::test]
async fn test_flushcache_oversized_body_is_refused() {
    let app = app(MockDnsResolver::default());
    let flush = Request::builder()
        .method("POST")
        .uri("/flushcache")
        .header(header::HOST, CONTROL_DOMAIN)
        .body(Body::from(vec![b'a'; 64 * 1024]))
        .unwrap();
    let response = app.router.oneshot(flush).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers()[header::CONNECTION], "close");
}
