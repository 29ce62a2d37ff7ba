#[macro_use]
extern crate log;

use std::io::Write;
use std::{env, fs, process, thread};

use anyhow::{Context, Result};
use chrono::Local;
use env_logger::Env;
use structopt::StructOpt;
use toml::Value;

use crate::args::Args;
use crate::config::Config;
use crate::connection::{DatabaseConnectionFactory, SqlxSqliteConnection};
use crate::migrate::migrator::SchemaMigrator;
use crate::migrations::registry;

mod args;
mod config;
mod connection;
mod migrate;
mod migrations;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    if let Err(errors) = init().await.with_context(|| "Initialization failed") {
        for (index, error) in errors.chain().enumerate() {
            error!("└> {} - {}", index, error);
        }

        // The surrounding deployment treats a failed pass as fatal: the
        // server must not start against a half-migrated schema.
        process::exit(1);
    }
}

async fn init() -> Result<()> {
    let options = Args::from_args();

    initialize_logger(options.verbose, options.quiet);

    let config = load_config().context("Failed to load config file")?;

    info!("Initializing database connection...");

    let connection = create_sqlite_connection(&config, options.database).await?;
    let migrator = SchemaMigrator::new(connection.pool, registry());

    if options.status {
        report_status(&migrator).await?;
    } else {
        run_migration(&migrator).await?;
    }

    Ok(())
}

async fn create_sqlite_connection(
    config: &Config,
    database_override: Option<String>,
) -> Result<SqlxSqliteConnection> {
    let mut database_config = config.database().clone();
    if let Some(path) = database_override {
        database_config.path = path;
    }

    let factory = DatabaseConnectionFactory::<SqlxSqliteConnection>::new(
        database_config,
        config.settings().clone(),
    );

    // The pass is strictly sequential, one connection is all it gets.
    let connection = factory.create_connection(1).await?;
    Ok(connection)
}

async fn run_migration(migrator: &SchemaMigrator) -> Result<()> {
    let report = migrator
        .run()
        .await
        .with_context(|| "Migration pass failed")?;

    if report.applied.is_empty() {
        info!("Schema already up to date, {} migrations skipped", report.skipped);
    } else {
        info!("Applied migrations: {}", report.applied.join(", "));
    }

    Ok(())
}

async fn report_status(migrator: &SchemaMigrator) -> Result<()> {
    let status = migrator
        .status()
        .await
        .with_context(|| "Failed to read migration status")?;

    if status.applied.is_empty() {
        info!("No migrations applied yet");
    }
    for entry in &status.applied {
        info!("Applied: {} at {}", entry.name, entry.applied_at);
    }

    if status.pending.is_empty() {
        info!("No pending migrations");
    } else {
        info!("Pending: {}", status.pending.join(", "));
    }

    Ok(())
}

fn initialize_logger(verbose: bool, quiet: bool) {
    // Set the `RUST_LOG` environment variable to control the logging level

    if quiet {
        env::set_var("RUST_LOG", "warn");
    } else {
        env::set_var("RUST_LOG", if verbose { "debug" } else { "info" });
    }

    // Initialize the logger with the desired format and additional configuration
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("sqlx", log::LevelFilter::Error)
        .format(|buf, record| {
            let timestamp = Local::now().format("%H:%M:%S");

            writeln!(
                buf,
                "{} {:<5} [{}] - {}",
                timestamp,
                record.level(),
                thread::current().name().unwrap_or("<unnamed>"),
                record.args()
            )
        })
        .init();
}

fn load_config() -> Result<Config> {
    let config_file = "config.toml";
    let content = fs::read_to_string(config_file)?;
    let value = content.parse::<Value>()?;
    let config = Config::from_toml(value)?;
    Ok(config)
}
