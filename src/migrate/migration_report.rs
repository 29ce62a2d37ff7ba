use crate::migrate::ledger::LedgerEntry;

/// Outcome of one migration pass.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: usize,
}

/// Snapshot of the ledger against the registry, without applying anything.
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub applied: Vec<LedgerEntry>,
    pub pending: Vec<String>,
}
