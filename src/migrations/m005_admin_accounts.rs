use crate::migrate::migration::Migration;

pub const NAME: &str = "005-admin-accounts";

pub fn migration() -> Migration {
    Migration::new(NAME).statement(
        "CREATE TABLE IF NOT EXISTS admins (
            id INTEGER PRIMARY KEY,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_login_at TIMESTAMP
        )",
    )
}
