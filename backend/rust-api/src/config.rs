use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    /// Basic-auth credentials for /metrics, "username:password".
    pub metrics_auth: String,
    /// Announcement delay (seconds) applied before each question's timer
    /// starts, unless the session overrides it.
    pub default_wait_time: u32,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        let metrics_auth = settings
            .get_string("metrics.auth")
            .or_else(|_| env::var("METRICS_AUTH"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: METRICS_AUTH must be set in production!");
                }
                eprintln!("WARNING: Using default METRICS_AUTH (dev mode only!)");
                "admin:changeme".to_string()
            });

        let default_wait_time = settings
            .get_int("session.default_wait_time")
            .ok()
            .map(|v| v as u32)
            .or_else(|| env::var("DEFAULT_WAIT_TIME").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(5);

        Ok(Config {
            bind_addr,
            metrics_auth,
            default_wait_time,
        })
    }
}
