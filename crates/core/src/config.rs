use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `NURTURE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub cron: CronConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Shared-secret authorization for the scheduler endpoint. When `secret`
/// is unset the endpoint runs unauthenticated (explicit permissive
/// fallback for local development).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CronConfig {
    #[serde(default)]
    pub secret: Option<String>,
}

/// Entry/exit windows for the recovery conditions. The abandoned exit
/// window (3 days) is deliberately shorter than its entry window (7 days),
/// creating a re-engagement window; both are configurable so operators can
/// align them.
#[derive(Debug, Clone, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default = "default_never_logged_in_after_days")]
    pub never_logged_in_after_days: i64,
    #[serde(default = "default_never_started_after_days")]
    pub never_started_after_days: i64,
    #[serde(default = "default_abandoned_after_days")]
    pub abandoned_after_days: i64,
    #[serde(default = "default_reengage_within_days")]
    pub reengage_within_days: i64,
    #[serde(default = "default_first_send_delay_mins")]
    pub first_send_delay_mins: i64,
}

// Default functions
fn default_node_id() -> String {
    "nurture-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_never_logged_in_after_days() -> i64 {
    1
}
fn default_never_started_after_days() -> i64 {
    2
}
fn default_abandoned_after_days() -> i64 {
    7
}
fn default_reengage_within_days() -> i64 {
    3
}
fn default_first_send_delay_mins() -> i64 {
    15
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            never_logged_in_after_days: default_never_logged_in_after_days(),
            never_started_after_days: default_never_started_after_days(),
            abandoned_after_days: default_abandoned_after_days(),
            reengage_within_days: default_reengage_within_days(),
            first_send_delay_mins: default_first_send_delay_mins(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            cron: CronConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("NURTURE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
