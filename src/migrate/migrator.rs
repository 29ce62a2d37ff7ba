use anyhow::{bail, Context, Result};
use log::info;
use sqlx::sqlite::SqlitePool;
use sqlx::{Sqlite, Transaction};
use tokio::time::Instant;

use crate::migrate::ledger::{self, MigrationLedger};
use crate::migrate::migration::Migration;
use crate::migrate::migration_report::{MigrationReport, MigrationStatus};

/// Brings the database schema to the latest known version, applying every
/// unit not yet recorded in the ledger, in ascending name order, exactly
/// once.
///
/// Each pending unit's statements and its ledger entry are committed in a
/// single transaction; the first failing unit aborts the pass and leaves the
/// database as it was before that unit started.
pub struct SchemaMigrator {
    pool: SqlitePool,
    ledger: MigrationLedger,
    migrations: Vec<Migration>,
}

impl SchemaMigrator {
    pub fn new(pool: SqlitePool, mut migrations: Vec<Migration>) -> Self {
        // Lexicographic name order is the authoritative application order,
        // regardless of registration order.
        migrations.sort_by(|a, b| a.name().cmp(b.name()));

        let ledger = MigrationLedger::new(pool.clone());

        SchemaMigrator {
            pool,
            ledger,
            migrations,
        }
    }

    pub async fn run(&self) -> Result<MigrationReport> {
        info!("Running schema migrator");

        let start_time = Instant::now();

        self.check_registry()?;
        self.ledger.ensure_table().await?;

        let applied_names = self.ledger.applied_names().await?;

        let mut report = MigrationReport {
            applied: Vec::new(),
            skipped: 0,
        };

        for migration in &self.migrations {
            if applied_names.contains(migration.name()) {
                debug!("Migration {} already applied, skipping", migration.name());
                report.skipped += 1;
                continue;
            }

            self.apply_migration(migration).await?;
            report.applied.push(migration.name().to_string());
        }

        let end_time = Instant::now();

        info!(
            "Migration pass finished, applied: {}, skipped: {}, total time took: {}s",
            report.applied.len(),
            report.skipped,
            end_time.saturating_duration_since(start_time).as_secs_f32()
        );

        Ok(report)
    }

    pub async fn status(&self) -> Result<MigrationStatus> {
        self.check_registry()?;
        self.ledger.ensure_table().await?;

        let applied_names = self.ledger.applied_names().await?;

        let pending = self
            .migrations
            .iter()
            .map(|migration| migration.name())
            .filter(|name| !applied_names.contains(*name))
            .map(|name| name.to_string())
            .collect();

        Ok(MigrationStatus {
            applied: self.ledger.entries().await?,
            pending,
        })
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<()> {
        info!("Applying migration: {}", migration.name());

        let start_time = Instant::now();

        let mut transaction = self.pool.begin().await.with_context(|| {
            format!(
                "Failed to begin transaction for migration {}",
                migration.name()
            )
        })?;

        if let Err(err) = apply_and_record(&mut transaction, migration).await {
            transaction
                .rollback()
                .await
                .context("Failed to roll back migration transaction")?;
            return Err(err.context(format!("Migration {} failed", migration.name())));
        }

        transaction
            .commit()
            .await
            .with_context(|| format!("Failed to commit migration {}", migration.name()))?;

        let end_time = Instant::now();

        info!(
            "Migration {} applied, took: {}s",
            migration.name(),
            end_time.saturating_duration_since(start_time).as_secs_f32()
        );

        Ok(())
    }

    fn check_registry(&self) -> Result<()> {
        for window in self.migrations.windows(2) {
            if window[0].name() == window[1].name() {
                bail!("Duplicate migration name in registry: {}", window[0].name());
            }
        }

        Ok(())
    }
}

async fn apply_and_record(
    transaction: &mut Transaction<'_, Sqlite>,
    migration: &Migration,
) -> Result<()> {
    migration.apply(transaction).await?;
    ledger::record(transaction, migration.name()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("open in-memory database")
    }

    async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("query sqlite_master");

        count > 0
    }

    async fn ledger_names(pool: &SqlitePool) -> Vec<String> {
        let ledger = MigrationLedger::new(pool.clone());
        ledger
            .entries()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect()
    }

    #[tokio::test]
    async fn fresh_database_applies_every_unit_in_name_order() {
        let pool = memory_pool().await;

        let migrator = SchemaMigrator::new(
            pool.clone(),
            vec![
                Migration::new("001-x").statement("CREATE TABLE x (id INTEGER PRIMARY KEY)"),
                Migration::new("002-y").statement("CREATE TABLE y (id INTEGER PRIMARY KEY)"),
                Migration::new("003-z").statement("CREATE TABLE z (id INTEGER PRIMARY KEY)"),
            ],
        );

        let report = migrator.run().await.unwrap();
        assert_eq!(report.applied, vec!["001-x", "002-y", "003-z"]);
        assert_eq!(report.skipped, 0);

        assert!(table_exists(&pool, "x").await);
        assert!(table_exists(&pool, "y").await);
        assert!(table_exists(&pool, "z").await);

        // Ledger rows were inserted in application order, with non-decreasing
        // timestamps along that order.
        let entries = MigrationLedger::new(pool.clone()).entries().await.unwrap();
        let names: Vec<_> = entries.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["001-x", "002-y", "003-z"]);
        for pair in entries.windows(2) {
            assert!(pair[0].applied_at <= pair[1].applied_at);
        }
    }

    #[tokio::test]
    async fn second_pass_applies_nothing() {
        let pool = memory_pool().await;

        let registry = || {
            vec![
                Migration::new("001-x").statement("CREATE TABLE x (id INTEGER PRIMARY KEY)"),
                Migration::new("002-y").statement("CREATE TABLE y (id INTEGER PRIMARY KEY)"),
            ]
        };

        SchemaMigrator::new(pool.clone(), registry())
            .run()
            .await
            .unwrap();

        let report = SchemaMigrator::new(pool.clone(), registry())
            .run()
            .await
            .unwrap();
        assert!(report.applied.is_empty());
        assert_eq!(report.skipped, 2);

        assert_eq!(ledger_names(&pool).await.len(), 2);
    }

    #[tokio::test]
    async fn recorded_unit_is_not_reinvoked() {
        let pool = memory_pool().await;

        // Seed the ledger as if 001 had run on an earlier deployment.
        sqlx::query("CREATE TABLE seeds (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        let ledger = MigrationLedger::new(pool.clone());
        ledger.ensure_table().await.unwrap();
        let mut transaction = pool.begin().await.unwrap();
        ledger::record(&mut transaction, "001-seeds").await.unwrap();
        transaction.commit().await.unwrap();

        let migrator = SchemaMigrator::new(
            pool.clone(),
            vec![
                // Would insert a row if its apply ran again.
                Migration::new("001-seeds").statement("INSERT INTO seeds (id) VALUES (1)"),
                Migration::new("002-extra")
                    .statement("CREATE TABLE extra (id INTEGER PRIMARY KEY)"),
            ],
        );

        let report = migrator.run().await.unwrap();
        assert_eq!(report.applied, vec!["002-extra"]);
        assert_eq!(report.skipped, 1);

        let seed_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seeds")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(seed_rows, 0);
    }

    #[tokio::test]
    async fn failing_unit_aborts_pass_and_rolls_back() {
        let pool = memory_pool().await;

        let migrator = SchemaMigrator::new(
            pool.clone(),
            vec![
                Migration::new("001-ok").statement("CREATE TABLE ok (id INTEGER PRIMARY KEY)"),
                Migration::new("002-broken")
                    .statement("CREATE TABLE partial (id INTEGER PRIMARY KEY)")
                    .statement("INSERT INTO missing (id) VALUES (1)"),
                Migration::new("003-never")
                    .statement("CREATE TABLE never (id INTEGER PRIMARY KEY)"),
            ],
        );

        let err = migrator.run().await.unwrap_err();
        assert!(err.to_string().contains("002-broken"));

        // The prior unit committed, the failing unit rolled back completely,
        // and the later unit was never attempted.
        assert_eq!(ledger_names(&pool).await, vec!["001-ok"]);
        assert!(table_exists(&pool, "ok").await);
        assert!(!table_exists(&pool, "partial").await);
        assert!(!table_exists(&pool, "never").await);
    }

    #[tokio::test]
    async fn failed_unit_is_retried_on_the_next_pass() {
        let pool = memory_pool().await;

        let broken = SchemaMigrator::new(
            pool.clone(),
            vec![Migration::new("001-x")
                .statement("CREATE TABLE x (id INTEGER PRIMARY KEY)")
                .statement("INSERT INTO missing (id) VALUES (1)")],
        );
        broken.run().await.unwrap_err();

        // A corrected registry picks the unit up again as pending.
        let fixed = SchemaMigrator::new(
            pool.clone(),
            vec![Migration::new("001-x").statement("CREATE TABLE x (id INTEGER PRIMARY KEY)")],
        );
        let report = fixed.run().await.unwrap();
        assert_eq!(report.applied, vec!["001-x"]);
        assert!(table_exists(&pool, "x").await);
    }

    #[tokio::test]
    async fn tolerant_unit_applies_over_pre_existing_schema() {
        let pool = memory_pool().await;

        // Schema state left behind by a deployment that predates the ledger.
        sqlx::query("CREATE TABLE articles (id INTEGER PRIMARY KEY, lat REAL)")
            .execute(&pool)
            .await
            .unwrap();

        let migrator = SchemaMigrator::new(
            pool.clone(),
            vec![Migration::new("002-locations")
                .statement_tolerating_existing("ALTER TABLE articles ADD COLUMN lat REAL")
                .statement_tolerating_existing("ALTER TABLE articles ADD COLUMN lng REAL")],
        );

        let report = migrator.run().await.unwrap();
        assert_eq!(report.applied, vec!["002-locations"]);
        assert_eq!(ledger_names(&pool).await, vec!["002-locations"]);
    }

    #[tokio::test]
    async fn registration_order_does_not_matter() {
        let pool = memory_pool().await;

        let migrator = SchemaMigrator::new(
            pool.clone(),
            vec![
                Migration::new("002-y").statement("CREATE TABLE y (id INTEGER PRIMARY KEY)"),
                Migration::new("001-x").statement("CREATE TABLE x (id INTEGER PRIMARY KEY)"),
            ],
        );

        let report = migrator.run().await.unwrap();
        assert_eq!(report.applied, vec!["001-x", "002-y"]);
    }

    #[tokio::test]
    async fn duplicate_registry_names_are_rejected() {
        let pool = memory_pool().await;

        let migrator = SchemaMigrator::new(
            pool.clone(),
            vec![
                Migration::new("001-x").statement("CREATE TABLE x (id INTEGER PRIMARY KEY)"),
                Migration::new("001-x").statement("CREATE TABLE x2 (id INTEGER PRIMARY KEY)"),
            ],
        );

        let err = migrator.run().await.unwrap_err();
        assert!(err.to_string().contains("Duplicate migration name"));
    }

    #[tokio::test]
    async fn status_reports_applied_and_pending_without_applying() {
        let pool = memory_pool().await;

        let registry = || {
            vec![
                Migration::new("001-x").statement("CREATE TABLE x (id INTEGER PRIMARY KEY)"),
                Migration::new("002-y").statement("CREATE TABLE y (id INTEGER PRIMARY KEY)"),
            ]
        };

        let migrator = SchemaMigrator::new(pool.clone(), registry());
        let status = migrator.status().await.unwrap();
        assert!(status.applied.is_empty());
        assert_eq!(status.pending, vec!["001-x", "002-y"]);
        assert!(!table_exists(&pool, "x").await);

        migrator.run().await.unwrap();

        let status = SchemaMigrator::new(pool.clone(), registry())
            .status()
            .await
            .unwrap();
        assert_eq!(status.applied.len(), 2);
        assert!(status.pending.is_empty());
    }
}
