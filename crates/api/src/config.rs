use std::collections::HashMap;
use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

use domain::models::purchase::{ProductCatalog, ProductGrant};
use domain::{CoreSettings, FreePassPolicy};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub matching: MatchingConfig,
    pub chat: ChatConfig,
    #[serde(default)]
    pub fcm: FcmConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    /// Store product id to grant, e.g. `[products.points_30]`.
    #[serde(default)]
    pub products: HashMap<String, ProductGrant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Tunables of the match lifecycle.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_free_pass_policy")]
    pub free_pass_policy: FreePassPolicy,

    /// Points credited once at registration
    #[serde(default = "default_initial_points")]
    pub initial_points: i64,

    #[serde(default = "default_max_group_members")]
    pub max_group_members: usize,

    #[serde(default = "default_invitation_ttl_minutes")]
    pub invitation_ttl_minutes: i64,

    /// Delay between scheduling and executing a user deletion
    #[serde(default = "default_deletion_grace_hours")]
    pub deletion_grace_hours: i64,

    #[serde(default = "default_deletion_batch_size")]
    pub deletion_batch_size: i64,

    /// Deadline applied to every inbound operation
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,

    /// Provider channels younger than this are never reconciled away
    #[serde(default = "default_orphan_grace_minutes")]
    pub orphan_grace_minutes: i64,
}

/// Chat provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Chat provider: stream or mock
    #[serde(default = "default_chat_provider")]
    pub provider: String,

    #[serde(default = "default_chat_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Signs server tokens and webhook bodies
    #[serde(default)]
    pub api_secret: String,

    #[serde(default = "default_chat_channel_type")]
    pub channel_type: String,

    #[serde(default = "default_chat_timeout_ms")]
    pub timeout_ms: u64,
}

/// Firebase Cloud Messaging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FcmConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub project_id: String,

    /// Service account JSON, inline or as a file path
    #[serde(default)]
    pub credentials: String,

    /// Devices subscribe to `{topic_prefix}{user_id}`
    #[serde(default = "default_fcm_topic_prefix")]
    pub topic_prefix: String,

    #[serde(default = "default_fcm_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_fcm_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_true")]
    pub high_priority: bool,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            project_id: String::new(),
            credentials: String::new(),
            topic_prefix: default_fcm_topic_prefix(),
            timeout_ms: default_fcm_timeout_ms(),
            max_retries: default_fcm_max_retries(),
            high_priority: true,
        }
    }
}

/// Background job configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_deletion_interval_minutes")]
    pub deletion_interval_minutes: u64,

    #[serde(default = "default_orphan_interval_minutes")]
    pub orphan_reconcile_interval_minutes: u64,

    #[serde(default = "default_pool_metrics_interval")]
    pub pool_metrics_interval_secs: u64,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            deletion_interval_minutes: default_deletion_interval_minutes(),
            orphan_reconcile_interval_minutes: default_orphan_interval_minutes(),
            pool_metrics_interval_secs: default_pool_metrics_interval(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    1_048_576
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_free_pass_policy() -> FreePassPolicy {
    FreePassPolicy::Exempt
}
fn default_initial_points() -> i64 {
    10
}
fn default_max_group_members() -> usize {
    6
}
fn default_invitation_ttl_minutes() -> i64 {
    30
}
fn default_deletion_grace_hours() -> i64 {
    72
}
fn default_deletion_batch_size() -> i64 {
    100
}
fn default_operation_timeout() -> u64 {
    15
}
fn default_orphan_grace_minutes() -> i64 {
    10
}
fn default_chat_provider() -> String {
    "stream".to_string()
}
fn default_chat_base_url() -> String {
    "https://chat.stream-io-api.com".to_string()
}
fn default_chat_channel_type() -> String {
    "messaging".to_string()
}
fn default_chat_timeout_ms() -> u64 {
    5000
}
fn default_fcm_topic_prefix() -> String {
    "user_".to_string()
}
fn default_fcm_timeout_ms() -> u64 {
    10000
}
fn default_fcm_max_retries() -> u32 {
    3
}
fn default_true() -> bool {
    true
}
fn default_deletion_interval_minutes() -> u64 {
    60
}
fn default_orphan_interval_minutes() -> u64 {
    15
}
fn default_pool_metrics_interval() -> u64 {
    10
}
fn default_shutdown_timeout() -> u64 {
    30
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Sources, later ones overriding earlier ones:
    /// `config/default.toml`, optional `config/local.toml`, then
    /// `MEETUP__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("MEETUP").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds entirely from embedded defaults so tests never touch config files.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            max_body_size = 1048576

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [matching]
            free_pass_policy = "exempt"
            initial_points = 10
            max_group_members = 6
            invitation_ttl_minutes = 30
            deletion_grace_hours = 72
            deletion_batch_size = 100
            operation_timeout_secs = 15
            orphan_grace_minutes = 10

            [chat]
            provider = "mock"
            base_url = "http://localhost:9999"
            api_key = "test-key"
            api_secret = "test-secret"
            channel_type = "messaging"
            timeout_ms = 1000

            [fcm]
            enabled = false

            [jobs]
            enabled = false

            [products.points_30]
            kind = "points"
            points = 25
            bonus_points = 5

            [products.free_pass_24h]
            kind = "free_pass"
            hours = 24
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "MEETUP__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        match self.chat.provider.as_str() {
            "stream" => {
                if self.chat.api_key.is_empty() || self.chat.api_secret.is_empty() {
                    return Err(ConfigValidationError::MissingRequired(
                        "MEETUP__CHAT__API_KEY and MEETUP__CHAT__API_SECRET must be set".to_string(),
                    ));
                }
            }
            "mock" => {}
            other => {
                return Err(ConfigValidationError::InvalidValue(format!(
                    "Unknown chat provider: {}",
                    other
                )));
            }
        }

        if self.fcm.enabled && (self.fcm.project_id.is_empty() || self.fcm.credentials.is_empty()) {
            return Err(ConfigValidationError::MissingRequired(
                "fcm.project_id and fcm.credentials are required when FCM is enabled".to_string(),
            ));
        }

        if self.matching.initial_points < 0 {
            return Err(ConfigValidationError::InvalidValue(
                "matching.initial_points cannot be negative".to_string(),
            ));
        }

        if self.matching.max_group_members < 2 {
            return Err(ConfigValidationError::InvalidValue(
                "matching.max_group_members must be at least 2".to_string(),
            ));
        }

        if self.matching.operation_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "matching.operation_timeout_secs must be positive".to_string(),
            ));
        }

        for (product_id, grant) in &self.products {
            let valid = match grant {
                ProductGrant::Points {
                    points,
                    bonus_points,
                } => *points > 0 && *bonus_points >= 0,
                ProductGrant::FreePass { hours } => *hours > 0,
            };
            if !valid {
                return Err(ConfigValidationError::InvalidValue(format!(
                    "Product {} grants nothing",
                    product_id
                )));
            }
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    pub fn core_settings(&self) -> CoreSettings {
        let m = &self.matching;
        CoreSettings {
            free_pass_policy: m.free_pass_policy,
            initial_points: m.initial_points,
            max_group_members: m.max_group_members,
            invitation_ttl: chrono::Duration::minutes(m.invitation_ttl_minutes),
            deletion_grace: chrono::Duration::hours(m.deletion_grace_hours),
            deletion_batch_size: m.deletion_batch_size,
            operation_timeout: Duration::from_secs(m.operation_timeout_secs),
            chat_channel_type: self.chat.channel_type.clone(),
            orphan_grace: chrono::Duration::minutes(m.orphan_grace_minutes),
        }
    }

    pub fn product_catalog(&self) -> ProductCatalog {
        ProductCatalog::new(self.products.clone())
    }
}
