use std::env;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub migration_path: Option<String>,
    pub clean_start: bool,
    pub url: String,
    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Seconds before an upstream call is abandoned.
    #[serde(default = "default_provider_timeout")]
    pub timeout: u64,
    /// Public callback registered for status pushes on startup.
    pub webhook_url: Option<String>,
}

impl Provider {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub database: Database,
    pub auth: Auth,
    pub provider: Provider,
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_provider_timeout() -> u64 {
    10
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let mut settings: Settings = Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("HOMESYNC").separator("__"))
            .build()?
            .try_deserialize()?;

        if let Some(migrate) = &settings.database.migration_path {
            if Path::new(migrate).is_dir() {
                let migrate_path = Path::new(migrate)
                    .canonicalize()
                    .map_err(|e| ConfigError::Message(e.to_string()))?
                    .to_string_lossy()
                    .to_string();

                settings.database.migration_path = Some(migrate_path);
            } else {
                tracing::warn!("migration path {migrate} is not a directory, skipping migrations");
                settings.database.migration_path = None;
            }
        }

        if settings.provider.client_id.is_empty() || settings.provider.client_secret.is_empty() {
            tracing::warn!("provider credentials are empty, cloud calls will be rejected upstream");
        }

        Ok(settings)
    }
}
