//! Configuration types for the HTTP service

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::ConfigError;

const REDACTED: &str = "<REDACTED>";

/// Service configuration
///
/// Every section falls back to its [`Default`] when absent, so a minimal
/// deployment only has to supply the webhook secret and the allowlist.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook ingress settings
    pub webhooks: WebhookConfig,

    /// GitHub connection settings
    pub github: GithubConfig,

    /// Repositories the gateway acts on
    pub allowlist: AllowlistConfig,

    /// Comment command settings
    pub commands: CommandsConfig,

    /// Background work settings
    pub scheduler: SchedulerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot start with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for a required value that is empty and
    /// [`ConfigError::Invalid`] for a value that is present but unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "must be non-zero"));
        }
        if self.server.shutdown_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "server.shutdown_timeout_seconds",
                "must be non-zero",
            ));
        }
        if self.server.max_body_size == 0 {
            return Err(ConfigError::invalid("server.max_body_size", "must be non-zero"));
        }

        if !self.webhooks.endpoint_path.starts_with('/') {
            return Err(ConfigError::invalid(
                "webhooks.endpoint_path",
                format!("{:?} must start with '/'", self.webhooks.endpoint_path),
            ));
        }
        if self.webhooks.github_secret.is_empty() && !self.webhooks.allow_unsigned {
            return Err(ConfigError::Missing {
                key: "webhooks.github_secret".to_string(),
            });
        }
        if let Some(mirror_url) = &self.webhooks.mirror_url {
            reqwest::Url::parse(mirror_url)
                .map_err(|e| ConfigError::invalid("webhooks.mirror_url", e.to_string()))?;
        }

        if self.allowlist.rules.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "allowlist.rules".to_string(),
            });
        }

        if self.github.hostname.is_empty() {
            return Err(ConfigError::Missing {
                key: "github.hostname".to_string(),
            });
        }
        reqwest::Url::parse(&self.github.api_url)
            .map_err(|e| ConfigError::invalid("github.api_url", e.to_string()))?;

        if self.commands.executable_name.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "commands.executable_name".to_string(),
            });
        }

        if self.scheduler.drain_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "scheduler.drain_timeout_seconds",
                "must be non-zero",
            ));
        }
        if self.scheduler.stats_interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "scheduler.stats_interval_seconds",
                "must be non-zero",
            ));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// How long in-flight requests get to finish once shutdown starts
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4141,
            shutdown_timeout_seconds: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Webhook ingress configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,

    /// Shared secret used to sign GitHub deliveries
    pub github_secret: String,

    /// Accept unsigned deliveries when no secret is configured
    pub allow_unsigned: bool,

    /// Treat draft pull requests like ready ones
    pub allow_draft_prs: bool,

    /// Forward every accepted delivery to this URL as well
    pub mirror_url: Option<String>,
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = if self.github_secret.is_empty() {
            ""
        } else {
            REDACTED
        };
        f.debug_struct("WebhookConfig")
            .field("endpoint_path", &self.endpoint_path)
            .field("github_secret", &secret)
            .field("allow_unsigned", &self.allow_unsigned)
            .field("allow_draft_prs", &self.allow_draft_prs)
            .field("mirror_url", &self.mirror_url)
            .finish()
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/events".to_string(),
            github_secret: String::new(),
            allow_unsigned: false,
            allow_draft_prs: false,
            mirror_url: None,
        }
    }
}

/// GitHub connection configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Hostname repositories are cloned from, e.g. `github.com`
    pub hostname: String,

    /// REST API base URL
    pub api_url: String,

    /// Account the gateway comments as
    pub user: String,

    /// Token for the REST API and for clone URLs
    pub token: String,
}

impl fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubConfig")
            .field("hostname", &self.hostname)
            .field("api_url", &self.api_url)
            .field("user", &self.user)
            .field("token", &REDACTED)
            .finish()
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            hostname: "github.com".to_string(),
            api_url: "https://api.github.com".to_string(),
            user: String::new(),
            token: String::new(),
        }
    }
}

/// Repository allowlist configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowlistConfig {
    /// Comma-separated `hostname/owner/name` rules; `*` matches any suffix
    pub rules: String,
}

/// Comment command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Name comments must start with to be treated as commands
    pub executable_name: String,

    /// Refuse `apply` commands
    pub disable_apply: bool,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            executable_name: "atlantis".to_string(),
            disable_apply: false,
        }
    }
}

/// Background work configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How long background work gets to finish at shutdown
    pub drain_timeout_seconds: u64,

    /// Period of the scheduler statistics job
    pub stats_interval_seconds: u64,
}

impl SchedulerConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_seconds)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_seconds)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            drain_timeout_seconds: 30,
            stats_interval_seconds: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is not set
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
