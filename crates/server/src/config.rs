//! Signpost server configuration

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignpostConfig {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Forwarding pipeline settings
    pub forwarding: ForwardingConfig,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Forwarding pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardingConfig {
    /// Comma-separated blacklist of host suffixes
    #[serde(default)]
    pub blacklist: String,
    /// Comma-separated whitelist; presence flips matching polarity to
    /// default-deny
    #[serde(default)]
    pub whitelist: Option<String>,
    /// Where blacklisted hosts are redirected; 403 when unset
    #[serde(default)]
    pub blacklist_redirect_url: Option<String>,
    /// Seconds a cached forwarding decision stays valid
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Maximum number of cached forwarding decisions
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Hostname under which the control endpoints are served
    pub control_domain: String,
    /// Certificate authority identity accepted in CAA issue records
    #[serde(default = "default_accepted_issuer")]
    pub accepted_issuer: String,
    /// DNS-over-HTTPS endpoint for TXT/CAA lookups
    #[serde(default = "default_doh_url")]
    pub doh_url: String,
}

fn default_bind_addr() -> SocketAddr {
    ([0, 0, 0, 0], 8080).into()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    86_400
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_accepted_issuer() -> String {
    "letsencrypt.org".to_string()
}

fn default_doh_url() -> String {
    "https://cloudflare-dns.com/dns-query".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_level: default_log_level(),
        }
    }
}

impl SignpostConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_paths = [
            "signpost.toml",
            "config/signpost.toml",
            "/etc/signpost/signpost.toml",
        ];

        for path in &config_paths {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path).required(false));
            }
        }

        // Environment variables with SIGNPOST_ prefix override file settings
        builder = builder.add_source(
            Environment::with_prefix("SIGNPOST")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load configuration from a specific config file
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = builder.add_source(File::with_name(path));
        builder = builder.add_source(
            Environment::with_prefix("SIGNPOST")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate the loaded configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.server.log_level.as_str()) {
            return Err(ConfigError::Message(format!(
                "server.log_level must be one of: {valid_log_levels:?}"
            )));
        }

        if self.forwarding.control_domain.trim().is_empty() {
            return Err(ConfigError::Message(
                "forwarding.control_domain must not be empty".to_string(),
            ));
        }

        if self.forwarding.cache_capacity == 0 {
            return Err(ConfigError::Message(
                "forwarding.cache_capacity must be positive".to_string(),
            ));
        }

        if self.forwarding.cache_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "forwarding.cache_ttl_secs must be positive".to_string(),
            ));
        }

        if let Some(url) = &self.forwarding.blacklist_redirect_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Message(
                    "forwarding.blacklist_redirect_url must be an absolute http(s) URL"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }
}
