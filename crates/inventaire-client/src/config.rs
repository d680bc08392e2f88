//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client starts in demo mode with zero
//! configuration.

use std::path::PathBuf;
use std::time::Duration;

use inventaire_shared::constants::{DEFAULT_EMAIL_DOMAIN, NOTIFICATION_SECS};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the hosted backend, e.g. `https://xyz.supabase.co`.
    /// Env: `SUPABASE_URL`
    /// Default: empty (demo backend).
    pub supabase_url: String,

    /// Public anonymous API key sent with every request.
    /// Env: `SUPABASE_ANON_KEY`
    pub supabase_anon_key: String,

    /// Domain of the synthetic login e-mail built from a CP number.
    /// Env: `INVENTAIRE_EMAIL_DOMAIN`
    /// Default: `catenaires-versailles.internal`
    pub email_domain: String,

    /// Path of the server-side PIN exchange endpoint, relative to the
    /// backend URL.
    /// Env: `INVENTAIRE_PIN_EXCHANGE_PATH`
    /// Default: `/functions/v1/pin-login`
    pub pin_exchange_path: String,

    /// Directory of the local SQLite store.
    /// Env: `INVENTAIRE_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Directory where workbooks are written.
    /// Env: `INVENTAIRE_EXPORT_DIR`
    /// Default: `.`
    pub export_dir: PathBuf,

    /// How long a notification stays visible.
    /// Env: `INVENTAIRE_NOTIFICATION_SECS`
    /// Default: `3`
    pub notification_ttl: Duration,

    /// Force the in-memory demo backend.
    /// Env: `INVENTAIRE_DEMO` (true/false)
    /// Default: `false`
    pub demo: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            pin_exchange_path: "/functions/v1/pin-login".to_string(),
            data_dir: None,
            export_dir: PathBuf::from("."),
            notification_ttl: Duration::from_secs(NOTIFICATION_SECS),
            demo: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("SUPABASE_URL") {
            config.supabase_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(key) = lookup("SUPABASE_ANON_KEY") {
            config.supabase_anon_key = key.trim().to_string();
        }

        if let Some(domain) = lookup("INVENTAIRE_EMAIL_DOMAIN") {
            let domain = domain.trim();
            if domain.is_empty() || domain.contains('@') {
                tracing::warn!(value = %domain, "Invalid INVENTAIRE_EMAIL_DOMAIN, using default");
            } else {
                config.email_domain = domain.to_string();
            }
        }

        if let Some(path) = lookup("INVENTAIRE_PIN_EXCHANGE_PATH") {
            if path.starts_with('/') {
                config.pin_exchange_path = path;
            } else {
                tracing::warn!(value = %path, "INVENTAIRE_PIN_EXCHANGE_PATH must start with '/', using default");
            }
        }

        if let Some(dir) = lookup("INVENTAIRE_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(dir) = lookup("INVENTAIRE_EXPORT_DIR") {
            if !dir.is_empty() {
                config.export_dir = PathBuf::from(dir);
            }
        }

        if let Some(val) = lookup("INVENTAIRE_NOTIFICATION_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.notification_ttl = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid INVENTAIRE_NOTIFICATION_SECS, using default"),
            }
        }

        if let Some(val) = lookup("INVENTAIRE_DEMO") {
            config.demo = val == "true" || val == "1";
        }

        config
    }

    /// Whether the in-memory backend should be used instead of the hosted one.
    pub fn use_demo_backend(&self) -> bool {
        self.demo || self.supabase_url.is_empty()
    }
}
