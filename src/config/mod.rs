pub mod provisioning;
pub use provisioning::{load_provisioning, ProvisioningFile};

use serde::Deserialize;

/// Complete Fleetwatch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FleetwatchConfig {
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

/// Push backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Push backend endpoint (one POST per dispatch)
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Topic for company broadcasts
    #[serde(default = "default_company_topic")]
    pub company_topic: String,
    /// Server credential; FLEETWATCH_PUSH_SERVER_KEY overrides this
    #[serde(default)]
    pub server_key: Option<String>,
    /// Per-call request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Retry budget for unreachable-backend failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential retry backoff
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
}

fn default_backend_url() -> String {
    "https://fcm.googleapis.com/fcm/send".to_string()
}

fn default_company_topic() -> String {
    "fleet-alerts".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay() -> u64 {
    250
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            company_topic: default_company_topic(),
            server_key: None,
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
        }
    }
}

impl PushConfig {
    /// Server credential resolved at startup: the environment wins over the
    /// config file so the key can be rotated without editing files.
    pub fn resolved_server_key(&self) -> Option<String> {
        std::env::var("FLEETWATCH_PUSH_SERVER_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.server_key.clone())
    }
}

/// Notification queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Bounded queue between the evaluator and the dispatch worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Telemetry feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Bounded per-asset sample channel capacity
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Startup provisioning configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisioningConfig {
    /// Optional TOML file with the initial agreement set and device tokens
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for FleetwatchConfig {
    fn default() -> Self {
        Self {
            push: PushConfig::default(),
            dispatch: DispatchConfig::default(),
            feed: FeedConfig::default(),
            api: ApiConfig::default(),
            provisioning: ProvisioningConfig::default(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<FleetwatchConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: FleetwatchConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Admin token for the provisioning API, from FLEETWATCH_ADMIN_TOKEN.
/// None leaves the mutating endpoints unrestricted (dev mode).
pub fn admin_token_from_env() -> Option<String> {
    std::env::var("FLEETWATCH_ADMIN_TOKEN")
        .ok()
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FleetwatchConfig::default();
        assert_eq!(config.push.backend_url, "https://fcm.googleapis.com/fcm/send");
        assert_eq!(config.push.company_topic, "fleet-alerts");
        assert_eq!(config.push.timeout_seconds, 10);
        assert_eq!(config.push.max_retries, 2);
        assert_eq!(config.dispatch.queue_capacity, 256);
        assert_eq!(config.feed.channel_capacity, 64);
        assert_eq!(config.api.bind_addr, "0.0.0.0:8080");
        assert!(config.provisioning.file.is_none());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [push]
            backend_url = "https://push.example.com/send"
            company_topic = "ops-alerts"
            timeout_seconds = 5
            max_retries = 1
            retry_base_delay_ms = 100

            [dispatch]
            queue_capacity = 32

            [feed]
            channel_capacity = 8

            [api]
            bind_addr = "127.0.0.1:9090"

            [provisioning]
            file = "agreements.toml"
        "#;

        let config: FleetwatchConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.push.backend_url, "https://push.example.com/send");
        assert_eq!(config.push.company_topic, "ops-alerts");
        assert_eq!(config.push.timeout_seconds, 5);
        assert_eq!(config.dispatch.queue_capacity, 32);
        assert_eq!(config.feed.channel_capacity, 8);
        assert_eq!(config.api.bind_addr, "127.0.0.1:9090");
        assert_eq!(config.provisioning.file.as_deref(), Some("agreements.toml"));
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [dispatch]
            queue_capacity = 16
        "#;

        let config: FleetwatchConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.dispatch.queue_capacity, 16);
        assert_eq!(config.push.timeout_seconds, 10); // Default
        assert_eq!(config.feed.channel_capacity, 64); // Default
    }

    #[test]
    fn test_server_key_prefers_file_value_when_env_absent() {
        let push = PushConfig {
            server_key: Some("file-key".to_string()),
            ..PushConfig::default()
        };
        if std::env::var("FLEETWATCH_PUSH_SERVER_KEY").is_err() {
            assert_eq!(push.resolved_server_key().as_deref(), Some("file-key"));
        }
    }
}
