use anyhow::{Context, Result};
use sqlx::{Sqlite, Transaction};

/// A named schema-change unit, applied at most once.
///
/// The name is the unit's identity in the ledger and its sort key; statements
/// run strictly in registration order, each awaited before the next.
pub struct Migration {
    name: &'static str,
    statements: Vec<Statement>,
}

struct Statement {
    sql: &'static str,
    on_error: FailurePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailurePolicy {
    Fatal,
    TolerateExisting,
}

impl Migration {
    pub fn new(name: &'static str) -> Self {
        Migration {
            name,
            statements: Vec::new(),
        }
    }

    pub fn statement(mut self, sql: &'static str) -> Self {
        self.statements.push(Statement {
            sql,
            on_error: FailurePolicy::Fatal,
        });
        self
    }

    /// Like `statement`, but an "already exists" class failure is swallowed.
    /// Used for statements that may have reached the database before this
    /// unit was recorded, e.g. `ALTER TABLE ... ADD COLUMN`.
    pub fn statement_tolerating_existing(mut self, sql: &'static str) -> Self {
        self.statements.push(Statement {
            sql,
            on_error: FailurePolicy::TolerateExisting,
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn apply(&self, transaction: &mut Transaction<'_, Sqlite>) -> Result<()> {
        for statement in &self.statements {
            match sqlx::query(statement.sql).execute(&mut *transaction).await {
                Ok(_) => {}
                Err(err)
                    if statement.on_error == FailurePolicy::TolerateExisting
                        && is_already_existing(&err) =>
                {
                    debug!("Statement skipped, schema object already present: {}", err);
                }
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("Statement failed: {}", preview(statement.sql)));
                }
            }
        }

        Ok(())
    }
}

/// True for the SQLite error class produced by re-creating an existing schema
/// object ("table X already exists", "duplicate column name: Y").
pub(crate) fn is_already_existing(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            message.contains("already exists") || message.contains("duplicate column name")
        }
        _ => false,
    }
}

fn preview(sql: &str) -> String {
    let collapsed = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(100).collect()
}
