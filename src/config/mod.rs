use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub billing: BillingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BillingConfig {
    /// Default enrollment fee in cents, charged when an enrollment is created.
    pub enrollment_fee_cents: i64,
    /// Days until a freshly created payment falls due.
    pub due_days: i64,
    /// Settlement fee rate in basis points (500 = 5%).
    pub settlement_fee_bps: i64,
    /// Minutes before an open checkout session expires.
    pub session_expiry_minutes: i64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            enrollment_fee_cents: 9500,
            due_days: 3,
            settlement_fee_bps: 500,
            session_expiry_minutes: 30,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("database.max_connections", 10)?
            .set_default("billing.enrollment_fee_cents", 9500)?
            .set_default("billing.due_days", 3)?
            .set_default("billing.settlement_fee_bps", 500)?
            .set_default("billing.session_expiry_minutes", 30)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with WODBOOK__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("WODBOOK").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://wodbook.db".to_string(),
                max_connections: 10,
            },
            billing: BillingConfig::default(),
        }
    }
}
