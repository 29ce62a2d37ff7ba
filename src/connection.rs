use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;

use crate::config::{DatabaseConfig, SettingsConfig};

pub struct SqlxSqliteConnection {
    pub pool: SqlitePool,
}

#[async_trait]
pub trait DatabaseConnection: Sized {
    async fn new(
        database: &DatabaseConfig,
        settings: &SettingsConfig,
        max_connections: u32,
    ) -> Result<Self>;
}

#[async_trait]
impl DatabaseConnection for SqlxSqliteConnection {
    async fn new(
        database: &DatabaseConfig,
        settings: &SettingsConfig,
        max_connections: u32,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&database.path)
            .create_if_missing(database.create_if_missing)
            .busy_timeout(Duration::from_millis(settings.busy_timeout_ms))
            .journal_mode(parse_journal_mode(&settings.journal_mode)?)
            .disable_statement_logging()
            .clone();

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", database.path))?;

        Ok(SqlxSqliteConnection { pool })
    }
}

fn parse_journal_mode(mode: &str) -> Result<SqliteJournalMode> {
    let journal_mode = match mode.to_lowercase().as_str() {
        "wal" => SqliteJournalMode::Wal,
        "delete" => SqliteJournalMode::Delete,
        "truncate" => SqliteJournalMode::Truncate,
        "persist" => SqliteJournalMode::Persist,
        "memory" => SqliteJournalMode::Memory,
        "off" => SqliteJournalMode::Off,
        other => bail!("Unknown journal mode: {}", other),
    };

    Ok(journal_mode)
}

pub struct DatabaseConnectionFactory<C: DatabaseConnection> {
    database: DatabaseConfig,
    settings: SettingsConfig,
    connection_type: std::marker::PhantomData<C>,
}

impl<C: DatabaseConnection> DatabaseConnectionFactory<C> {
    pub fn new(database: DatabaseConfig, settings: SettingsConfig) -> Self {
        DatabaseConnectionFactory {
            database,
            settings,
            connection_type: std::marker::PhantomData,
        }
    }

    pub async fn create_connection(&self, max_connections: u32) -> Result<C> {
        C::new(&self.database, &self.settings, max_connections).await
    }
}
