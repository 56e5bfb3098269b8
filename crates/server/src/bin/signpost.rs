//! Signpost server binary

use anyhow::Result;
use clap::Parser;
use signpost_core::PolicyMatcher;
use signpost_server::{
    AppState, DohClient, ForwardingCache, NoOpCertificateService, RedirectResolver,
    SignpostConfig, ValidationPipeline, create_router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Signpost - DNS-driven domain-forwarding edge service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        SignpostConfig::load_from_file(config_path)?
    } else {
        SignpostConfig::load()?
    };
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Signpost");
    info!("Control domain: {}", config.forwarding.control_domain);
    info!("DoH endpoint: {}", config.forwarding.doh_url);

    let dns = Arc::new(DohClient::new(config.forwarding.doh_url.clone())?);
    let policy = Arc::new(PolicyMatcher::new(
        &config.forwarding.blacklist,
        config.forwarding.whitelist.as_deref(),
    ));
    let cache = ForwardingCache::new(config.forwarding.cache_capacity);
    let pipeline = ValidationPipeline::new(
        dns,
        policy,
        Duration::from_secs(config.forwarding.cache_ttl_secs),
        config.forwarding.accepted_issuer.clone(),
    );
    let resolver = Arc::new(RedirectResolver::new(
        cache.clone(),
        pipeline,
        config.forwarding.blacklist_redirect_url.clone(),
    ));

    let state = AppState {
        resolver,
        cache,
        certs: Arc::new(NoOpCertificateService),
        control_domain: config.forwarding.control_domain.to_ascii_lowercase(),
    };

    let router = create_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr).await?;
    info!("Listening on {}", config.server.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down...");
        })
        .await?;

    Ok(())
}
