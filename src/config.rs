use anyhow::{anyhow, Result};
use toml::Value;

#[derive(Debug)]
pub(crate) struct Config {
    database: DatabaseConfig,
    settings: SettingsConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    pub create_if_missing: bool,
}

#[derive(Debug, Clone)]
pub struct SettingsConfig {
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
}

impl Config {
    pub(crate) fn from_toml(config: Value) -> Result<Self> {
        let database = parse_database_config(
            config
                .get("database")
                .ok_or(anyhow!("Missing or invalid database settings"))?
                .clone(),
        )?;
        let settings = parse_settings_config(
            config
                .get("settings")
                .ok_or(anyhow!("Missing or invalid settings"))?
                .clone(),
        )?;

        Ok(Config { database, settings })
    }

    pub fn database(&self) -> &DatabaseConfig {
        &self.database
    }

    pub fn settings(&self) -> &SettingsConfig {
        &self.settings
    }
}

fn parse_database_config(config: Value) -> Result<DatabaseConfig> {
    let path = config
        .get("path")
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("Missing or invalid database path"))?
        .to_string();

    let create_if_missing = config
        .get("create_if_missing")
        .and_then(|value| value.as_bool())
        .unwrap_or(true);

    Ok(DatabaseConfig {
        path,
        create_if_missing,
    })
}

fn parse_settings_config(config: Value) -> Result<SettingsConfig> {
    let busy_timeout_ms = config
        .get("busy_timeout_ms")
        .and_then(|value| value.as_integer())
        .ok_or_else(|| anyhow!("Missing or invalid busy timeout value"))?
        .try_into()?;

    let journal_mode = config
        .get("journal_mode")
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("Missing or invalid journal mode"))?
        .to_string();

    Ok(SettingsConfig {
        busy_timeout_ms,
        journal_mode,
    })
}
