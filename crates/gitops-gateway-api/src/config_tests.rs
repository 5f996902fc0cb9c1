//! Tests for [`ServiceConfig`] defaults and validation.

use super::*;

fn valid_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.webhooks.github_secret = "webhook-secret".to_string();
    config.allowlist.rules = "github.com/acme/*".to_string();
    config
}

// ============================================================================
// Defaults
// ============================================================================

mod default_tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = ServiceConfig::default();

        assert_eq!(config.server.port, 4141);
        assert_eq!(config.webhooks.endpoint_path, "/events");
        assert!(!config.webhooks.allow_unsigned);
        assert_eq!(config.github.hostname, "github.com");
        assert_eq!(config.commands.executable_name, "atlantis");
        assert_eq!(config.scheduler.drain_timeout(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let json = r#"{
            "webhooks": { "github_secret": "abc" },
            "allowlist": { "rules": "github.com/acme/infra" }
        }"#;

        let config: ServiceConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.webhooks.github_secret, "abc");
        assert_eq!(config.webhooks.endpoint_path, "/events");
        assert_eq!(config.server.max_body_size, 10 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }
}

// ============================================================================
// Validation
// ============================================================================

mod validation_tests {
    use super::*;

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_secret_is_rejected_unless_unsigned_is_allowed() {
        let mut config = valid_config();
        config.webhooks.github_secret.clear();

        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Missing { ref key } if key == "webhooks.github_secret"),
            "expected missing secret, got: {err:?}"
        );

        config.webhooks.allow_unsigned = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_allowlist_is_rejected() {
        let mut config = valid_config();
        config.allowlist.rules = " ".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing { ref key }) if key == "allowlist.rules"
        ));
    }

    #[test]
    fn test_zero_port_is_rejected() {
        let mut config = valid_config();
        config.server.port = 0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "server.port"
        ));
    }

    #[test]
    fn test_zero_timeouts_are_rejected() {
        let mut config = valid_config();
        config.scheduler.drain_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.server.shutdown_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.scheduler.stats_interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_path_must_be_absolute() {
        let mut config = valid_config();
        config.webhooks.endpoint_path = "events".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "webhooks.endpoint_path"
        ));
    }

    #[test]
    fn test_malformed_mirror_url_is_rejected() {
        let mut config = valid_config();
        config.webhooks.mirror_url = Some("not a url".to_string());

        assert!(config.validate().is_err());
    }
}

// ============================================================================
// Redaction
// ============================================================================

mod redaction_tests {
    use super::*;

    #[test]
    fn test_debug_output_does_not_leak_secrets() {
        let mut config = valid_config();
        config.github.token = "ghp_super_sensitive".to_string();

        let debug_str = format!("{config:?}");

        assert!(
            !debug_str.contains("webhook-secret"),
            "debug output must not leak the webhook secret: {debug_str}"
        );
        assert!(
            !debug_str.contains("ghp_super_sensitive"),
            "debug output must not leak the token: {debug_str}"
        );
        assert!(debug_str.contains("<REDACTED>"));
    }
}
