use anyhow::Context;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::books_repository::PostgresBooksRepositoryConfig;

const CONFIG_FILE_ENV: &str = "CATALOGUE_CONFIG_FILE";
const DEFAULT_CONFIG_FILE: &str = "catalogue.toml";
const ENV_PREFIX: &str = "CATALOGUE";

/// Service configuration, layered as defaults, optional file, then `CATALOGUE__*` variables
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub use_in_memory: bool,
    pub hostname: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TelemetrySettings {
    pub service_name: String,
    pub jaeger_enabled: bool,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let config_file =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let builder = with_defaults(Config::builder())?
            .add_source(File::with_name(&config_file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        Self::build(builder).with_context(|| format!("Failed to load settings from {config_file}"))
    }

    fn build(
        builder: ConfigBuilder<config::builder::DefaultState>,
    ) -> anyhow::Result<Self> {
        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

fn with_defaults(
    builder: ConfigBuilder<config::builder::DefaultState>,
) -> anyhow::Result<ConfigBuilder<config::builder::DefaultState>> {
    Ok(builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("database.use_in_memory", false)?
        .set_default("database.hostname", "127.0.0.1")?
        .set_default("database.username", "postgres")?
        .set_default("database.password", "postgres")?
        .set_default("telemetry.service_name", "catalogue_service")?
        .set_default("telemetry.jaeger_enabled", true)?)
}

impl From<&DatabaseSettings> for PostgresBooksRepositoryConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        PostgresBooksRepositoryConfig {
            hostname: settings.hostname.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        }
    }
}
