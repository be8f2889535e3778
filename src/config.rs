//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)
//!
//! The conventional `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET` and
//! `SESSION_SECRET` variables are honored on top of the prefixed form.

use serde::Deserialize;
use std::net::IpAddr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub host: String,
    /// Port number (e.g., 3000)
    pub port: u16,
    /// Public domain, including the port for local setups
    /// (e.g., "localhost:3000")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL the service is reachable at
    ///
    /// # Returns
    /// Full URL like "http://localhost:3000"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session cookie signing secret (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 86400 = 24h)
    pub session_max_age: i64,
    /// Interval between expired-session sweeps, in seconds
    pub sweep_interval_seconds: u64,
    pub google: GoogleOAuthConfig,
}

/// Google OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with Google.
    ///
    /// Defaults to `<base_url>/auth/google/callback` when unset.
    pub redirect_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (AUTHGATE_*)
    /// 5. Conventional variables (GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET,
    ///    SESSION_SECRET)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.domain", "localhost:3000")?
            .set_default("server.protocol", "http")?
            .set_default("auth.session_secret", "")?
            .set_default("auth.session_max_age", 86400)?
            .set_default("auth.sweep_interval_seconds", 300)?
            .set_default("auth.google.client_id", "")?
            .set_default("auth.google.client_secret", "")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (AUTHGATE_*)
            .add_source(
                Environment::with_prefix("AUTHGATE")
                    .separator("__")
                    .try_parsing(true),
            );

        // Conventional variable names win over everything else.
        for (variable, key) in [
            ("GOOGLE_CLIENT_ID", "auth.google.client_id"),
            ("GOOGLE_CLIENT_SECRET", "auth.google.client_secret"),
            ("SESSION_SECRET", "auth.session_secret"),
        ] {
            if let Ok(value) = std::env::var(variable) {
                builder = builder.set_override(key, value)?;
            }
        }

        let config = builder
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// The callback URL the provider redirects back to
    pub fn oauth_redirect_url(&self) -> String {
        self.auth
            .google
            .redirect_url
            .clone()
            .unwrap_or_else(|| format!("{}/auth/google/callback", self.server.base_url()))
    }

    /// Session lifetime as a duration
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.auth.session_max_age)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes (set SESSION_SECRET)",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.google.client_id.is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.google.client_id must be set (set GOOGLE_CLIENT_ID)".to_string(),
            ));
        }

        if self.auth.google.client_secret.is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.google.client_secret must be set (set GOOGLE_CLIENT_SECRET)".to_string(),
            ));
        }

        if let Some(redirect_url) = &self.auth.google.redirect_url {
            url::Url::parse(redirect_url).map_err(|e| {
                crate::error::AppError::Config(format!(
                    "auth.google.redirect_url is not a valid URL: {e}"
                ))
            })?;
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                domain: "localhost:3000".to_string(),
                protocol: "http".to_string(),
            },
            auth: AuthConfig {
                session_secret: "x".repeat(32),
                session_max_age: 86_400,
                sweep_interval_seconds: 300,
                google: GoogleOAuthConfig {
                    client_id: "google-client-id".to_string(),
                    client_secret: "google-client-secret".to_string(),
                    redirect_url: None,
                },
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert!(!config.should_use_secure_cookies());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.auth.session_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.session_secret")
        ));
    }

    #[test]
    fn validate_rejects_missing_client_credentials() {
        let mut config = valid_config();
        config.auth.google.client_id = String::new();

        let error = config
            .validate()
            .expect_err("empty client id must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("GOOGLE_CLIENT_ID")
        ));
    }

    #[test]
    fn validate_rejects_http_for_non_local_domain() {
        let mut config = valid_config();
        config.server.domain = "login.example.com".to_string();
        config.server.protocol = "http".to_string();

        let error = config
            .validate()
            .expect_err("public domains must require https");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("server.protocol must be https")
        ));
    }

    #[test]
    fn validate_rejects_malformed_redirect_url() {
        let mut config = valid_config();
        config.auth.google.redirect_url = Some("not a url".to_string());

        assert!(config.validate().is_err());
    }

    #[test]
    fn redirect_url_defaults_to_base_url() {
        let config = valid_config();
        assert_eq!(
            config.oauth_redirect_url(),
            "http://localhost:3000/auth/google/callback"
        );

        let mut config = valid_config();
        config.auth.google.redirect_url =
            Some("https://login.example.com/auth/google/callback".to_string());
        assert_eq!(
            config.oauth_redirect_url(),
            "https://login.example.com/auth/google/callback"
        );
    }
}
