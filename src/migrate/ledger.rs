use std::collections::HashSet;

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePool;
use sqlx::{Row, Sqlite, Transaction};

const CREATE_LEDGER_TABLE: &str = "CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// The persisted record of which migration units have been applied.
///
/// Entries are append-only: one row per successfully applied unit, inserted
/// in the same transaction as the unit's statements, never updated or
/// deleted afterwards.
#[derive(Clone)]
pub struct MigrationLedger {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: i64,
    pub name: String,
    pub applied_at: String,
}

impl MigrationLedger {
    pub fn new(pool: SqlitePool) -> Self {
        MigrationLedger { pool }
    }

    pub async fn ensure_table(&self) -> Result<()> {
        sqlx::query(CREATE_LEDGER_TABLE)
            .execute(&self.pool)
            .await
            .context("Failed to create migrations ledger table")?;

        Ok(())
    }

    pub async fn applied_names(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT name FROM migrations")
            .fetch_all(&self.pool)
            .await
            .context("Failed to read applied migrations from ledger")?;

        Ok(rows.iter().map(|row| row.get::<String, _>(0)).collect())
    }

    pub async fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query("SELECT id, name, applied_at FROM migrations ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to read ledger entries")?;

        let entries = rows
            .iter()
            .map(|row| LedgerEntry {
                id: row.get(0),
                name: row.get(1),
                applied_at: row.get(2),
            })
            .collect();

        Ok(entries)
    }
}

/// Appends a ledger entry inside the unit's own transaction, so the entry
/// and the unit's schema effects commit or roll back together.
pub async fn record(transaction: &mut Transaction<'_, Sqlite>, name: &str) -> Result<()> {
    sqlx::query("INSERT INTO migrations (name) VALUES (?)")
        .bind(name)
        .execute(&mut *transaction)
        .await
        .with_context(|| format!("Failed to record migration {} in ledger", name))?;

    Ok(())
}
